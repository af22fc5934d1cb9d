use std::f64::consts::PI;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{GrayImage, Luma};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use pupilfit::conic::fit_ellipse;
use pupilfit::{detect, Aoi, DetectionParameters, DetectionVariables, Track};

fn make_ellipse_points(n: usize) -> Vec<[f64; 2]> {
    let (cx, cy, a, b, angle) = (64.0f64, 48.0f64, 30.0f64, 21.0f64, 0.35f64);
    let (sin_a, cos_a) = angle.sin_cos();
    let mut rng = StdRng::seed_from_u64(2024);
    (0..n)
        .map(|i| {
            let t = 2.0 * PI * i as f64 / n as f64;
            let (ex, ey) = (a * t.cos(), b * t.sin());
            [
                cx + cos_a * ex - sin_a * ey + rng.gen_range(-0.5f64..0.5f64),
                cy + sin_a * ex + cos_a * ey + rng.gen_range(-0.5f64..0.5f64),
            ]
        })
        .collect()
}

/// Dark ellipse on a bright noisy background, shifted by `dx` pixels.
fn make_eye_frame(w: u32, h: u32, dx: f64, seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let (cx, cy, a, b) = (w as f64 * 0.5 + dx, h as f64 * 0.5, 34.0, 26.0);
    GrayImage::from_fn(w, h, |x, y| {
        let u = (x as f64 - cx) / a;
        let v = (y as f64 - cy) / b;
        let base: i16 = if u * u + v * v <= 1.0 { 35 } else { 185 };
        Luma([(base + rng.gen_range(-6i16..=6)).clamp(0, 255) as u8])
    })
}

fn bench_ellipse_fit(c: &mut Criterion) {
    let points = make_ellipse_points(150);
    c.bench_function("ellipse_fit_150pts", |b| {
        b.iter(|| {
            let fit = fit_ellipse(black_box(&points)).expect("deterministic fixture should always fit");
            black_box(fit)
        })
    });
}

fn bench_detect(c: &mut Criterion) {
    let frame = make_eye_frame(320, 240, 0.0, 11);
    let aoi = Aoi::new(80, 40, 160, 160);
    let params = DetectionParameters::default();
    let seed = DetectionVariables::initial(&params, &aoi);
    let locked = detect(&frame, &aoi, &params, &seed)
        .expect("valid fixture")
        .state;

    c.bench_function("detect_160x160_searching", |b| {
        b.iter(|| black_box(detect(black_box(&frame), &aoi, &params, &seed)))
    });
    c.bench_function("detect_160x160_locked", |b| {
        b.iter(|| black_box(detect(black_box(&frame), &aoi, &params, &locked)))
    });
}

fn bench_track_sequence(c: &mut Criterion) {
    let frames: Vec<GrayImage> = (0..10)
        .map(|i| make_eye_frame(320, 240, i as f64, 100 + i))
        .collect();
    let aoi = Aoi::new(60, 20, 200, 200);
    c.bench_function("track_10_frames_200x200", |b| {
        b.iter(|| {
            let mut track =
                Track::new(DetectionParameters::default(), aoi).expect("default parameters");
            for f in &frames {
                black_box(track.step(f).expect("valid fixture"));
            }
            black_box(track.frames_processed())
        })
    });
}

criterion_group!(hotpaths, bench_ellipse_fit, bench_detect, bench_track_sequence);
criterion_main!(hotpaths);
