use std::f64::consts::PI;

use crate::aoi::Aoi;
use crate::detector::DetectionParameters;

/// Multiple of `curvature_offset_min` used while searching, and the upper
/// bound the offset grows back to after misses.
pub(crate) const CURVATURE_OFFSET_RELAXED_FACTOR: f64 = 4.0;

/// Temporal tracking state of one object after one frame.
///
/// Positions are AOI-relative unless suffixed `_absolute`. Entry `i + 1`
/// of a track is derived only from entry `i` and frame `i`'s detection.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DetectionVariables {
    /// Whether the frame that produced this state was a detection.
    pub detected: bool,
    /// Consecutive non-detections up to and including this frame.
    pub miss_count: u32,
    /// Total detections so far.
    pub detection_count: u32,

    /// Allowed deviation of segment curvature from the prediction (rad/px).
    pub curvature_offset: f64,
    pub edge_curvature_prediction: f64,
    pub edge_curvature_average: f64,
    pub edge_intensity_prediction: f64,
    pub edge_intensity_average: f64,

    pub circumference_exact: f64,
    pub circumference_average: f64,
    pub circumference_momentum: f64,
    pub circumference_prediction: f64,

    pub aspect_ratio_exact: f64,
    pub aspect_ratio_average: f64,
    pub aspect_ratio_momentum: f64,
    pub aspect_ratio_prediction: f64,

    pub radius_exact: f64,
    pub radius_momentum: f64,
    pub radius_prediction: f64,

    /// Radius (px) around the predicted position searched next frame.
    pub search_radius: f64,
    pub threshold_circumference_change: f64,
    pub threshold_aspect_ratio_change: f64,

    pub x_pos_exact: f64,
    pub y_pos_exact: f64,
    /// Exact position plus AOI origin (frame coordinates).
    pub x_pos_absolute: f64,
    pub y_pos_absolute: f64,
    pub x_pos_predicted: f64,
    pub y_pos_predicted: f64,
    pub x_velocity: f64,
    pub y_velocity: f64,
}

impl DetectionVariables {
    /// Seed state for the first frame of a session.
    ///
    /// The object starts in the searching state at the AOI center with the
    /// whole AOI as search radius and the midpoint of the admissible
    /// circumference range as size prior.
    pub fn initial(params: &DetectionParameters, aoi: &Aoi) -> Self {
        let circumference = 0.5 * (params.circumference_min + params.circumference_max);
        let radius = circumference / (2.0 * PI);
        let [cx, cy] = aoi.local_center();
        Self {
            detected: false,
            miss_count: 0,
            detection_count: 0,
            curvature_offset: CURVATURE_OFFSET_RELAXED_FACTOR * params.curvature_offset_min,
            edge_curvature_prediction: 0.0,
            edge_curvature_average: 0.0,
            edge_intensity_prediction: 0.0,
            edge_intensity_average: 0.0,
            circumference_exact: circumference,
            circumference_average: circumference,
            circumference_momentum: circumference,
            circumference_prediction: circumference,
            aspect_ratio_exact: 1.0,
            aspect_ratio_average: 1.0,
            aspect_ratio_momentum: 1.0,
            aspect_ratio_prediction: 1.0,
            radius_exact: radius,
            radius_momentum: radius,
            radius_prediction: radius,
            search_radius: aoi.max_side(),
            threshold_circumference_change: params.circumference_change_threshold,
            threshold_aspect_ratio_change: params.aspect_ratio_change_threshold,
            x_pos_exact: cx,
            y_pos_exact: cy,
            x_pos_absolute: cx + aoi.x as f64,
            y_pos_absolute: cy + aoi.y as f64,
            x_pos_predicted: cx,
            y_pos_predicted: cy,
            x_velocity: 0.0,
            y_velocity: 0.0,
        }
    }

    /// Locked means the previous frame was a detection.
    pub fn is_locked(&self) -> bool {
        self.detected
    }

    pub fn predicted_position(&self) -> [f64; 2] {
        [self.x_pos_predicted, self.y_pos_predicted]
    }

    /// Predicted semi-axes `(a, b)` from the predicted radius and aspect ratio.
    ///
    /// While searching the major axis assumes the most elongated admissible
    /// shape so the edge window covers any re-acquisition.
    pub fn predicted_axes(&self, params: &DetectionParameters) -> (f64, f64) {
        let r = self.radius_prediction.max(0.0);
        let ar = self.aspect_ratio_prediction.clamp(params.aspect_ratio_min, 1.0);
        let a = 2.0 * r / (1.0 + ar);
        let b = ar * a;
        if self.is_locked() {
            (a, b)
        } else {
            let ar_min = params.aspect_ratio_min;
            (2.0 * r / (1.0 + ar_min), b)
        }
    }
}
