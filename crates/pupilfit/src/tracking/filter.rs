//! Temporal filter: derives the next state from the prior state and one
//! frame's outcome.
//!
//! Locked (previous frame detected) and searching are the two logical
//! states; `detected` of the returned state records the transition.

use std::f64::consts::TAU;

use crate::aoi::Aoi;
use crate::detector::{DetectionParameters, EllipseCandidate};

use super::state::{DetectionVariables, CURVATURE_OFFSET_RELAXED_FACTOR};

/// Fraction of the excess over the floor kept per detection.
const SEARCH_RADIUS_SHRINK: f64 = 0.5;
/// Growth factor of the search radius per miss.
const SEARCH_RADIUS_GROWTH: f64 = 1.5;
/// Fraction of the excess over the floor kept by the curvature offset per detection.
const CURVATURE_OFFSET_SHRINK: f64 = 0.5;

#[inline]
fn blend(alpha: f64, new: f64, old: f64) -> f64 {
    alpha * new + (1.0 - alpha) * old
}

/// State after a frame where `candidate` was accepted.
pub(crate) fn update_on_detection(
    prior: &DetectionVariables,
    candidate: &EllipseCandidate,
    params: &DetectionParameters,
    aoi: &Aoi,
) -> DetectionVariables {
    // Running averages start from the first measurement, not the seed prior.
    let first = prior.detection_count == 0;
    let ema = |alpha: f64, new: f64, old: f64| if first { new } else { blend(alpha, new, old) };
    let (am, aa, ap, amisc) = (
        params.alpha_momentum,
        params.alpha_average,
        params.alpha_prediction,
        params.alpha_miscellaneous,
    );

    let circumference = candidate.circumference;
    let aspect_ratio = candidate.aspect_ratio;

    let circumference_momentum = ema(am, circumference, prior.circumference_momentum);
    let circumference_average = ema(aa, circumference, prior.circumference_average);
    let circumference_prediction = blend(ap, circumference_momentum, circumference_average);

    let aspect_ratio_momentum = ema(am, aspect_ratio, prior.aspect_ratio_momentum);
    let aspect_ratio_average = ema(aa, aspect_ratio, prior.aspect_ratio_average);
    let aspect_ratio_prediction = blend(ap, aspect_ratio_momentum, aspect_ratio_average);

    let (x, y) = (candidate.x_pos, candidate.y_pos);
    let (x_velocity, y_velocity) = if prior.detected {
        (x - prior.x_pos_exact, y - prior.y_pos_exact)
    } else {
        (0.0, 0.0)
    };

    let floor = params.search_radius_min;
    let search_radius =
        (floor + (prior.search_radius - floor) * SEARCH_RADIUS_SHRINK).min(prior.search_radius);

    let change_threshold = |base: f64, cap: f64, prior_thr: f64, exact: f64, prior_mom: f64| {
        let deviation = if first { 0.0 } else { (exact - prior_mom).abs() };
        (base + (1.0 - am) * (prior_thr - base).max(0.0) + am * deviation).min(cap.max(base))
    };
    let (c_cap, ar_cap) = threshold_caps(params);

    let cmin = params.curvature_offset_min;

    DetectionVariables {
        detected: true,
        miss_count: 0,
        detection_count: prior.detection_count.saturating_add(1),

        curvature_offset: cmin + (prior.curvature_offset - cmin).max(0.0) * CURVATURE_OFFSET_SHRINK,
        edge_curvature_prediction: ema(amisc, candidate.curvature, prior.edge_curvature_prediction),
        edge_curvature_average: ema(aa, candidate.curvature, prior.edge_curvature_average),
        edge_intensity_prediction: ema(amisc, candidate.intensity, prior.edge_intensity_prediction),
        edge_intensity_average: ema(aa, candidate.intensity, prior.edge_intensity_average),

        circumference_exact: circumference,
        circumference_average,
        circumference_momentum,
        circumference_prediction,

        aspect_ratio_exact: aspect_ratio,
        aspect_ratio_average,
        aspect_ratio_momentum,
        aspect_ratio_prediction,

        radius_exact: candidate.radius,
        radius_momentum: ema(am, candidate.radius, prior.radius_momentum),
        radius_prediction: circumference_prediction / TAU,

        search_radius,
        threshold_circumference_change: change_threshold(
            params.circumference_change_threshold,
            c_cap,
            prior.threshold_circumference_change,
            circumference,
            prior.circumference_momentum,
        ),
        threshold_aspect_ratio_change: change_threshold(
            params.aspect_ratio_change_threshold,
            ar_cap,
            prior.threshold_aspect_ratio_change,
            aspect_ratio,
            prior.aspect_ratio_momentum,
        ),

        x_pos_exact: x,
        y_pos_exact: y,
        x_pos_absolute: x + aoi.x as f64,
        y_pos_absolute: y + aoi.y as f64,
        x_pos_predicted: x + x_velocity,
        y_pos_predicted: y + y_velocity,
        x_velocity,
        y_velocity,
    }
}

/// State after a frame without an accepted candidate.
///
/// Measurements, averages and predictions are held; only the search
/// tolerances widen.
pub(crate) fn update_on_miss(
    prior: &DetectionVariables,
    params: &DetectionParameters,
    aoi: &Aoi,
) -> DetectionVariables {
    let limit = aoi.max_side();
    let grown = (prior.search_radius * SEARCH_RADIUS_GROWTH + 1.0).min(limit);
    let (c_cap, ar_cap) = threshold_caps(params);
    let relax = |prior_thr: f64, base: f64, cap: f64| prior_thr.max((prior_thr + base).min(cap));
    let offset_cap = CURVATURE_OFFSET_RELAXED_FACTOR * params.curvature_offset_min;

    DetectionVariables {
        detected: false,
        miss_count: prior.miss_count.saturating_add(1),
        search_radius: prior.search_radius.max(grown),
        threshold_circumference_change: relax(
            prior.threshold_circumference_change,
            params.circumference_change_threshold,
            c_cap,
        ),
        threshold_aspect_ratio_change: relax(
            prior.threshold_aspect_ratio_change,
            params.aspect_ratio_change_threshold,
            ar_cap,
        ),
        curvature_offset: prior
            .curvature_offset
            .max((prior.curvature_offset + params.curvature_offset_min).min(offset_cap)),
        ..prior.clone()
    }
}

/// Upper bounds of the adaptive change thresholds.
fn threshold_caps(params: &DetectionParameters) -> (f64, f64) {
    let span = params.circumference_max - params.circumference_min;
    (
        span.max(params.circumference_change_threshold),
        1.0f64.max(params.aspect_ratio_change_threshold),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conic::Ellipse;
    use approx::assert_relative_eq;

    fn candidate(cx: f64, cy: f64, a: f64, b: f64) -> EllipseCandidate {
        let e = Ellipse {
            cx,
            cy,
            a,
            b,
            angle: 0.0,
        };
        EllipseCandidate {
            coefficients: e.to_conic(),
            ellipse: e,
            x_pos: cx,
            y_pos: cy,
            width: 2.0 * a,
            height: 2.0 * b,
            radius: e.equivalent_radius(),
            circumference: e.circumference(),
            aspect_ratio: e.aspect_ratio(),
            intensity: 120.0,
            curvature: 0.04,
            edge_length: 150,
            edge_indices: vec![0, 1],
            fit_error: 0.25,
        }
    }

    fn setup() -> (DetectionParameters, Aoi, DetectionVariables) {
        let params = DetectionParameters::default();
        let aoi = Aoi::new(10, 20, 100, 100);
        let seed = DetectionVariables::initial(&params, &aoi);
        (params, aoi, seed)
    }

    #[test]
    fn first_detection_seeds_averages_from_measurement() {
        let (params, aoi, seed) = setup();
        let c = candidate(40.0, 45.0, 30.0, 20.0);
        let s = update_on_detection(&seed, &c, &params, &aoi);
        assert!(s.detected);
        assert_eq!(s.detection_count, 1);
        assert_eq!(s.circumference_momentum, c.circumference);
        assert_eq!(s.circumference_average, c.circumference);
        assert_relative_eq!(s.circumference_prediction, c.circumference, epsilon = 1e-9);
        assert_eq!(s.aspect_ratio_average, c.aspect_ratio);
        assert_relative_eq!(s.radius_prediction, c.radius, epsilon = 1e-9);
        assert_eq!(s.edge_intensity_prediction, 120.0);
        assert_eq!((s.x_velocity, s.y_velocity), (0.0, 0.0));
        assert_eq!((s.x_pos_absolute, s.y_pos_absolute), (50.0, 65.0));
        assert_eq!(s.threshold_circumference_change, params.circumference_change_threshold);
    }

    #[test]
    fn consecutive_detections_estimate_velocity() {
        let (params, aoi, seed) = setup();
        let s1 = update_on_detection(&seed, &candidate(40.0, 45.0, 30.0, 20.0), &params, &aoi);
        let s2 = update_on_detection(&s1, &candidate(45.0, 44.0, 30.0, 20.0), &params, &aoi);
        assert_relative_eq!(s2.x_velocity, 5.0);
        assert_relative_eq!(s2.y_velocity, -1.0);
        assert_relative_eq!(s2.x_pos_predicted, 50.0);
        assert_relative_eq!(s2.y_pos_predicted, 43.0);
    }

    #[test]
    fn momentum_blends_toward_new_measurement() {
        let (params, aoi, seed) = setup();
        let c1 = candidate(50.0, 50.0, 30.0, 20.0);
        let c2 = candidate(50.0, 50.0, 33.0, 22.0);
        let s1 = update_on_detection(&seed, &c1, &params, &aoi);
        let s2 = update_on_detection(&s1, &c2, &params, &aoi);
        let am = params.alpha_momentum;
        let expected = am * c2.circumference + (1.0 - am) * c1.circumference;
        assert_relative_eq!(s2.circumference_momentum, expected, epsilon = 1e-9);
        assert!(s2.circumference_average > c1.circumference);
        assert!(s2.circumference_average < s2.circumference_momentum);
        assert!(s2.threshold_circumference_change > params.circumference_change_threshold);
    }

    #[test]
    fn miss_freezes_measurements() {
        let (params, aoi, seed) = setup();
        let s1 = update_on_detection(&seed, &candidate(40.0, 45.0, 30.0, 20.0), &params, &aoi);
        let s2 = update_on_miss(&s1, &params, &aoi);
        assert!(!s2.detected);
        assert_eq!(s2.miss_count, 1);
        assert_eq!(s2.detection_count, 1);
        assert_eq!(s2.circumference_exact, s1.circumference_exact);
        assert_eq!(s2.circumference_average, s1.circumference_average);
        assert_eq!(s2.circumference_momentum, s1.circumference_momentum);
        assert_eq!(s2.aspect_ratio_exact, s1.aspect_ratio_exact);
        assert_eq!(s2.aspect_ratio_average, s1.aspect_ratio_average);
        assert_eq!(s2.aspect_ratio_momentum, s1.aspect_ratio_momentum);
        assert_eq!(s2.radius_momentum, s1.radius_momentum);
        assert_eq!(s2.x_pos_exact, s1.x_pos_exact);
        assert_eq!(s2.y_pos_predicted, s1.y_pos_predicted);
        assert!(s2.search_radius > s1.search_radius);
        assert!(s2.threshold_circumference_change > s1.threshold_circumference_change);
        assert!(s2.curvature_offset >= s1.curvature_offset);
    }

    #[test]
    fn search_radius_is_monotone_and_bounded() {
        let (params, aoi, seed) = setup();
        let c = candidate(50.0, 50.0, 30.0, 20.0);

        let mut s = seed.clone();
        let mut prev = s.search_radius;
        for _ in 0..20 {
            s = update_on_detection(&s, &c, &params, &aoi);
            assert!(s.search_radius <= prev);
            assert!(s.search_radius >= params.search_radius_min);
            prev = s.search_radius;
        }
        assert_relative_eq!(s.search_radius, params.search_radius_min, epsilon = 1e-3);

        for _ in 0..20 {
            s = update_on_miss(&s, &params, &aoi);
            assert!(s.search_radius >= prev);
            assert!(s.search_radius <= aoi.max_side());
            prev = s.search_radius;
        }
        assert_eq!(s.search_radius, aoi.max_side());
        assert_eq!(s.miss_count, 20);
        assert!(s.threshold_aspect_ratio_change <= 1.0);
        assert!(
            s.threshold_circumference_change <= params.circumference_max - params.circumference_min
        );
        assert_relative_eq!(
            s.curvature_offset,
            CURVATURE_OFFSET_RELAXED_FACTOR * params.curvature_offset_min
        );
    }
}
