//! Per-frame orchestration: localize → edges → segments → filter → fit → select → update.

use image::GrayImage;

use crate::aoi::Aoi;
use crate::detector::candidate_filter::filter_segments;
use crate::detector::edges::{extract_edges, smooth};
use crate::detector::ellipse_fit::fit_candidates;
use crate::detector::localize::{localize, Window};
use crate::detector::segments::extract_segments;
use crate::detector::select::select_candidate;
use crate::detector::{DetectionParameters, EllipseCandidate, SegmentFlag};
use crate::diagnostics::DetectionMiscellaneous;
use crate::error::DetectError;
use crate::tracking::filter::{update_on_detection, update_on_miss};
use crate::tracking::DetectionVariables;

use super::result::{FrameDetection, MissReason, Outcome};

/// Detect and track one object in one frame.
///
/// Reads `frame` inside `aoi` only, never mutates `prior`, and returns the
/// state to pass as `prior` for the next frame. Identical inputs give
/// identical outputs.
///
/// Malformed input (empty frame, empty/undersized/out-of-bounds AOI,
/// out-of-range parameters) is reported as [`DetectError`] without any
/// state transition. Every other outcome, including frames with no edges,
/// is a well-formed [`FrameDetection`].
pub fn detect(
    frame: &GrayImage,
    aoi: &Aoi,
    params: &DetectionParameters,
    prior: &DetectionVariables,
) -> Result<FrameDetection, DetectError> {
    params.validate()?;
    aoi.validate(frame)?;

    let roi = aoi.crop(frame);
    let loc = localize(&roi, prior, params);
    let smoothed = smooth(&roi, params);
    let maps = extract_edges(&smoothed, &loc, params);
    let mut segments = extract_segments(&maps.edges, &maps.gradient);

    let mut diagnostics = DetectionMiscellaneous {
        error: None,
        aoi: Some(*aoi),
        edge_map: maps.edges,
        feature_crop: None,
        feature_window: None,
        localization: Some(loc),
        segments: Vec::new(),
        coefficients: None,
        fits_evaluated: 0,
        fits_degenerate: 0,
        fits_valid: 0,
    };

    if segments.is_empty() {
        return Ok(miss(MissReason::NoEdges, prior, params, aoi, diagnostics));
    }

    let reference = if prior.is_locked() {
        prior.predicted_position()
    } else {
        loc.pupil.center()
    };
    let ranked = filter_segments(&mut segments, prior, params, reference);
    if ranked.is_empty() {
        diagnostics.segments = segments;
        return Ok(miss(MissReason::NoCandidates, prior, params, aoi, diagnostics));
    }

    let mut summary = fit_candidates(&segments, &ranked, params, [aoi.width, aoi.height]);
    diagnostics.fits_evaluated = summary.evaluated;
    diagnostics.fits_degenerate = summary.degenerate;
    diagnostics.fits_valid = summary.candidates.len();

    let chosen = match select_candidate(&summary.candidates, prior) {
        Ok(i) => summary.candidates.swap_remove(i),
        Err(reason) => {
            diagnostics.segments = segments;
            return Ok(miss(reason, prior, params, aoi, diagnostics));
        }
    };

    for &i in &chosen.edge_indices {
        if let Some(seg) = segments.get_mut(i) {
            seg.flag = SegmentFlag::Fitted;
        }
    }
    let window = feature_window(&chosen, params, &roi);
    let crop = image::imageops::crop_imm(&roi, window.x, window.y, window.width, window.height);
    diagnostics.feature_crop = Some(crop.to_image());
    diagnostics.feature_window = Some(window);
    diagnostics.coefficients = Some(chosen.coefficients);
    diagnostics.segments = segments;

    let state = update_on_detection(prior, &chosen, params, aoi);
    tracing::debug!(
        segments = diagnostics.segments.len(),
        candidates = ranked.len(),
        fits = diagnostics.fits_evaluated,
        x = state.x_pos_absolute,
        y = state.y_pos_absolute,
        circumference = chosen.circumference,
        aspect_ratio = chosen.aspect_ratio,
        fit_error = chosen.fit_error,
        "detected"
    );

    Ok(FrameDetection {
        outcome: Outcome::Detected(chosen),
        state,
        diagnostics,
    })
}

fn miss(
    reason: MissReason,
    prior: &DetectionVariables,
    params: &DetectionParameters,
    aoi: &Aoi,
    mut diagnostics: DetectionMiscellaneous,
) -> FrameDetection {
    let state = update_on_miss(prior, params, aoi);
    tracing::debug!(
        %reason,
        segments = diagnostics.segments.len(),
        fits = diagnostics.fits_evaluated,
        miss_count = state.miss_count,
        search_radius = state.search_radius,
        "not detected"
    );
    diagnostics.error = Some(reason);
    FrameDetection {
        outcome: Outcome::NotDetected { reason },
        state,
        diagnostics,
    }
}

/// Bounding box of the ellipse grown by `window_offset`, clipped to the AOI.
fn feature_window(c: &EllipseCandidate, params: &DetectionParameters, roi: &GrayImage) -> Window {
    let [hx, hy] = c.ellipse.half_extents();
    let margin = params.window_offset as f64;
    let (w, h) = roi.dimensions();
    Window::around([c.x_pos, c.y_pos], [hx + margin, hy + margin], w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{add_noise, draw_disk, render_ellipse};
    use approx::assert_relative_eq;

    fn setup(frame: &GrayImage) -> (Aoi, DetectionParameters, DetectionVariables) {
        let aoi = Aoi::full(frame);
        let params = DetectionParameters::default();
        let seed = DetectionVariables::initial(&params, &aoi);
        (aoi, params, seed)
    }

    #[test]
    fn detects_synthetic_ellipse() {
        let frame = render_ellipse(100, 100, [50.0, 50.0], 30.0, 20.0, 0.0, 30, 200);
        let (aoi, params, seed) = setup(&frame);
        let out = detect(&frame, &aoi, &params, &seed).expect("valid input");

        let c = out.outcome.candidate().expect("ellipse detected");
        assert!((c.x_pos - 50.0).abs() < 1.0, "x = {}", c.x_pos);
        assert!((c.y_pos - 50.0).abs() < 1.0, "y = {}", c.y_pos);
        assert!((c.aspect_ratio - 20.0 / 30.0).abs() < 0.01, "ar = {}", c.aspect_ratio);
        assert!(c.aspect_ratio > 0.0 && c.aspect_ratio <= 1.0);
        assert!(c.circumference >= params.circumference_min);
        assert!(c.circumference <= params.circumference_max);
        assert!(c.fit_error <= params.ellipse_fit_error_maximum);

        assert!(out.state.detected);
        assert_eq!(out.state.detection_count, 1);
        assert_relative_eq!(out.state.x_pos_exact, c.x_pos);
        assert!(out.diagnostics.error.is_none());
        assert!(out.diagnostics.coefficients.is_some());
        assert!(out.diagnostics.feature_crop.is_some());
        assert!(out
            .diagnostics
            .segments
            .iter()
            .any(|s| s.flag == SegmentFlag::Fitted));
        assert!(out.diagnostics.fits_evaluated >= 1);
    }

    #[test]
    fn noisy_rotated_ellipse_is_detected() {
        let mut frame = render_ellipse(100, 100, [47.0, 52.0], 28.0, 19.0, 0.6, 40, 190);
        add_noise(&mut frame, 8, 7);
        let (aoi, params, seed) = setup(&frame);
        let out = detect(&frame, &aoi, &params, &seed).expect("valid input");
        let c = out.outcome.candidate().expect("ellipse detected");
        assert!((c.x_pos - 47.0).abs() < 1.0);
        assert!((c.y_pos - 52.0).abs() < 1.0);
        assert!((c.aspect_ratio - 19.0 / 28.0).abs() < 0.03);
        assert!((c.ellipse.angle - 0.6).abs() < 0.1);
    }

    #[test]
    fn absolute_position_includes_aoi_origin() {
        let frame = render_ellipse(160, 140, [80.0, 70.0], 30.0, 20.0, 0.0, 30, 200);
        let aoi = Aoi::new(30, 20, 100, 100);
        let params = DetectionParameters::default();
        let seed = DetectionVariables::initial(&params, &aoi);
        let out = detect(&frame, &aoi, &params, &seed).expect("valid input");
        assert!(out.outcome.is_detected());
        assert!((out.state.x_pos_exact - 50.0).abs() < 1.0);
        assert_relative_eq!(out.state.x_pos_absolute, out.state.x_pos_exact + 30.0);
        assert_relative_eq!(out.state.y_pos_absolute, out.state.y_pos_exact + 20.0);
    }

    #[test]
    fn black_frame_is_not_detected_and_freezes_state() {
        let frame = GrayImage::new(100, 100);
        let (aoi, params, seed) = setup(&frame);
        let out = detect(&frame, &aoi, &params, &seed).expect("valid input");
        assert_eq!(out.outcome.miss_reason(), Some(MissReason::NoEdges));
        assert!(!out.state.detected);
        assert_eq!(out.state.circumference_exact, seed.circumference_exact);
        assert_eq!(out.state.circumference_average, seed.circumference_average);
        assert_eq!(out.state.circumference_momentum, seed.circumference_momentum);
        assert_eq!(out.state.aspect_ratio_exact, seed.aspect_ratio_exact);
        assert_eq!(out.state.aspect_ratio_average, seed.aspect_ratio_average);
        assert_eq!(out.state.aspect_ratio_momentum, seed.aspect_ratio_momentum);
        assert_eq!(out.state.x_pos_exact, seed.x_pos_exact);
        assert_eq!(out.state.miss_count, 1);
        assert_eq!(out.diagnostics.error, Some(MissReason::NoEdges));
        assert_eq!(out.diagnostics.edge_pixel_count(), 0);
    }

    #[test]
    fn translation_yields_velocity_and_prediction() {
        let f1 = render_ellipse(100, 100, [50.0, 50.0], 30.0, 20.0, 0.0, 30, 200);
        let f2 = render_ellipse(100, 100, [55.0, 50.0], 30.0, 20.0, 0.0, 30, 200);
        let (aoi, params, seed) = setup(&f1);

        let s1 = detect(&f1, &aoi, &params, &seed).expect("frame 1").state;
        assert!(s1.detected);
        let out2 = detect(&f2, &aoi, &params, &s1).expect("frame 2");
        assert!(out2.outcome.is_detected());
        let s2 = out2.state;
        assert!((s2.x_velocity - 5.0).abs() < 0.5, "vx = {}", s2.x_velocity);
        assert!(s2.y_velocity.abs() < 0.5, "vy = {}", s2.y_velocity);
        assert!((s2.x_pos_predicted - 60.0).abs() < 1.0);
        assert!((s2.y_pos_predicted - 50.0).abs() < 1.0);
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let frame = render_ellipse(100, 100, [48.0, 53.0], 28.0, 21.0, 0.4, 40, 190);
        let (aoi, params, seed) = setup(&frame);
        let a = detect(&frame, &aoi, &params, &seed).expect("first");
        let b = detect(&frame, &aoi, &params, &seed).expect("second");
        assert_eq!(a.outcome, b.outcome);
        assert_eq!(a.state, b.state);
        assert_eq!(a.diagnostics.segments, b.diagnostics.segments);
    }

    #[test]
    fn glint_edges_are_erased() {
        let mut frame = render_ellipse(100, 100, [50.0, 50.0], 30.0, 20.0, 0.0, 30, 200);
        draw_disk(&mut frame, [55.0, 48.0], 5.0, 255);
        let (aoi, params, seed) = setup(&frame);
        let out = detect(&frame, &aoi, &params, &seed).expect("valid input");
        let glint = out
            .diagnostics
            .localization
            .and_then(|l| l.glint)
            .expect("glint located");
        let [gx, gy] = glint.center();
        let r = params.glint_radius as f64 + 2.0;
        for seg in &out.diagnostics.segments {
            for [x, y] in seg.points_f64() {
                assert!((x - gx).hypot(y - gy) > r, "edge point inside glint");
            }
        }
        let c = out.outcome.candidate().expect("pupil still detected");
        assert!((c.x_pos - 50.0).abs() < 1.0 && (c.y_pos - 50.0).abs() < 1.0);
    }

    #[test]
    fn contract_violations_leave_state_untouched() {
        let frame = GrayImage::new(100, 100);
        let (aoi, params, seed) = setup(&frame);
        assert_eq!(
            detect(&GrayImage::new(0, 0), &aoi, &params, &seed).err(),
            Some(DetectError::EmptyFrame)
        );
        assert!(matches!(
            detect(&frame, &Aoi::new(0, 0, 0, 50), &params, &seed),
            Err(DetectError::EmptyAoi(_))
        ));
        assert!(matches!(
            detect(&frame, &Aoi::new(95, 0, 50, 50), &params, &seed),
            Err(DetectError::AoiOutOfBounds { .. })
        ));
        let bad = DetectionParameters {
            aspect_ratio_min: 0.0,
            ..params
        };
        assert!(matches!(
            detect(&frame, &aoi, &bad, &seed),
            Err(DetectError::InvalidParameters(_))
        ));
    }
}
