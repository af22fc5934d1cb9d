//! Synthetic frames for image-based unit tests.

use image::{GrayImage, Luma};
use rand::prelude::*;

/// Supersampling factor per axis for anti-aliased rendering.
const SUBSAMPLES: u32 = 4;

/// Render a filled ellipse with anti-aliased boundary.
///
/// Pixel `(x, y)` covers `[x − ½, x + ½] × [y − ½, y + ½]`, so `center` is in
/// pixel-index coordinates.
#[allow(clippy::too_many_arguments)]
pub(crate) fn render_ellipse(
    w: u32,
    h: u32,
    center: [f64; 2],
    a: f64,
    b: f64,
    angle: f64,
    inside: u8,
    outside: u8,
) -> GrayImage {
    let (s, c) = angle.sin_cos();
    let n = SUBSAMPLES;
    let step = 1.0 / n as f64;
    let mut img = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut hits = 0u32;
            for j in 0..n {
                for i in 0..n {
                    let px = x as f64 - 0.5 + (i as f64 + 0.5) * step - center[0];
                    let py = y as f64 - 0.5 + (j as f64 + 0.5) * step - center[1];
                    let u = c * px + s * py;
                    let v = -s * px + c * py;
                    if (u / a).powi(2) + (v / b).powi(2) <= 1.0 {
                        hits += 1;
                    }
                }
            }
            let t = hits as f64 / (n * n) as f64;
            let val = t * inside as f64 + (1.0 - t) * outside as f64;
            img.put_pixel(x, y, Luma([val.round() as u8]));
        }
    }
    img
}

/// Paint a hard-edged disk.
pub(crate) fn draw_disk(img: &mut GrayImage, center: [f64; 2], r: f64, value: u8) {
    let (w, h) = img.dimensions();
    for y in 0..h {
        for x in 0..w {
            let dx = x as f64 - center[0];
            let dy = y as f64 - center[1];
            if dx * dx + dy * dy <= r * r {
                img.put_pixel(x, y, Luma([value]));
            }
        }
    }
}

/// Add uniform noise in `[-amplitude, amplitude]` from a seeded generator.
pub(crate) fn add_noise(img: &mut GrayImage, amplitude: i16, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for p in img.pixels_mut() {
        let v = p[0] as i16 + rng.gen_range(-amplitude..=amplitude);
        p[0] = v.clamp(0, 255) as u8;
    }
}
