use std::path::Path;

use crate::error::DetectError;

/// Upper bound on `edge_maximum_fit_number`; the fitter evaluates
/// `2^n − 1` segment combinations.
pub const MAX_COMBINED_SEGMENTS: usize = 12;

/// Static per-object tunables for one tracking session.
///
/// One instance per tracked object (primary feature, reference marker).
/// The detector only ever reads it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DetectionParameters {
    /// Box-blur level applied before edge detection (`<= 1` disables it).
    pub canny_blur_level: u32,
    /// Aperture of the extra Gaussian pre-smoothing (3, 5 or 7; 3 adds none).
    pub canny_kernel_size: u32,
    /// Canny hysteresis low threshold (gradient magnitude).
    pub canny_threshold_low: f32,
    /// Canny hysteresis high threshold (gradient magnitude).
    pub canny_threshold_high: f32,
    /// Floor of the adaptive curvature tolerance (rad/px).
    pub curvature_offset_min: f64,
    /// Allowed drop of segment intensity below the predicted edge intensity.
    pub edge_intensity_offset: f64,
    /// Maximum RMS Sampson distance (px) of an accepted fit.
    pub ellipse_fit_error_maximum: f64,
    /// Smallest admissible circumference (px).
    pub circumference_min: f64,
    /// Largest admissible circumference (px).
    pub circumference_max: f64,
    /// Smallest admissible minor/major ratio.
    pub aspect_ratio_min: f64,
    /// Base of the adaptive circumference change threshold (px).
    pub circumference_change_threshold: f64,
    /// Base of the adaptive aspect-ratio change threshold.
    pub aspect_ratio_change_threshold: f64,
    /// Maximum number of segments combined in one fit.
    pub edge_maximum_fit_number: usize,
    /// Side of the glint search window (px); `0` disables glint removal.
    pub glint_radius: u32,
    /// Margin (px) added around the predicted ellipse for edge extraction.
    pub window_offset: u32,
    /// Floor of the adaptive search radius (px).
    pub search_radius_min: f64,
    /// Blend weight of the newest measurement in the momentum average.
    pub alpha_momentum: f64,
    /// Blend weight of the newest measurement in the long-run average.
    pub alpha_average: f64,
    /// Weight of momentum (vs. long-run average) in the prediction.
    pub alpha_prediction: f64,
    /// Blend weight for edge curvature/intensity predictions.
    pub alpha_miscellaneous: f64,
}

impl Default for DetectionParameters {
    fn default() -> Self {
        Self {
            canny_blur_level: 3,
            canny_kernel_size: 3,
            canny_threshold_low: 30.0,
            canny_threshold_high: 60.0,
            curvature_offset_min: 0.05,
            edge_intensity_offset: 40.0,
            ellipse_fit_error_maximum: 2.0,
            circumference_min: 60.0,
            circumference_max: 320.0,
            aspect_ratio_min: 0.4,
            circumference_change_threshold: 30.0,
            aspect_ratio_change_threshold: 0.15,
            edge_maximum_fit_number: 3,
            glint_radius: 5,
            window_offset: 20,
            search_radius_min: 10.0,
            alpha_momentum: 0.5,
            alpha_average: 0.05,
            alpha_prediction: 0.75,
            alpha_miscellaneous: 0.75,
        }
    }
}

impl DetectionParameters {
    /// Defaults for a small, near-circular reference marker.
    pub fn marker() -> Self {
        Self {
            circumference_min: 20.0,
            circumference_max: 120.0,
            aspect_ratio_min: 0.6,
            circumference_change_threshold: 15.0,
            aspect_ratio_change_threshold: 0.1,
            glint_radius: 0,
            window_offset: 10,
            search_radius_min: 5.0,
            ..Self::default()
        }
    }

    /// Load parameters from a JSON file. Missing fields take default values.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&data)?;
        params.validate()?;
        Ok(params)
    }

    /// Check every field against its admissible range.
    pub fn validate(&self) -> Result<(), DetectError> {
        fn invalid(msg: String) -> Result<(), DetectError> {
            Err(DetectError::InvalidParameters(msg))
        }

        if !matches!(self.canny_kernel_size, 3 | 5 | 7) {
            return invalid(format!(
                "canny_kernel_size must be 3, 5 or 7 (got {})",
                self.canny_kernel_size
            ));
        }
        let (lo, hi) = (self.canny_threshold_low, self.canny_threshold_high);
        if !(lo.is_finite() && hi.is_finite() && lo >= 0.0 && lo <= hi) {
            return invalid(format!(
                "canny thresholds must satisfy 0 <= low <= high (got {} / {})",
                lo, hi
            ));
        }
        if !(self.circumference_min > 0.0 && self.circumference_min < self.circumference_max) {
            return invalid(format!(
                "circumference range [{}, {}] is empty",
                self.circumference_min, self.circumference_max
            ));
        }
        if !(self.aspect_ratio_min > 0.0 && self.aspect_ratio_min <= 1.0) {
            return invalid(format!(
                "aspect_ratio_min must lie in (0, 1] (got {})",
                self.aspect_ratio_min
            ));
        }
        let positive = [
            ("curvature_offset_min", self.curvature_offset_min),
            ("ellipse_fit_error_maximum", self.ellipse_fit_error_maximum),
            (
                "circumference_change_threshold",
                self.circumference_change_threshold,
            ),
            (
                "aspect_ratio_change_threshold",
                self.aspect_ratio_change_threshold,
            ),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return invalid(format!("{} must be positive (got {})", name, v));
            }
        }
        let non_negative = [
            ("edge_intensity_offset", self.edge_intensity_offset),
            ("search_radius_min", self.search_radius_min),
        ];
        for (name, v) in non_negative {
            if !(v.is_finite() && v >= 0.0) {
                return invalid(format!("{} must be non-negative (got {})", name, v));
            }
        }
        let alphas = [
            ("alpha_momentum", self.alpha_momentum),
            ("alpha_average", self.alpha_average),
            ("alpha_prediction", self.alpha_prediction),
            ("alpha_miscellaneous", self.alpha_miscellaneous),
        ];
        for (name, v) in alphas {
            if !(0.0..=1.0).contains(&v) {
                return invalid(format!("{} must lie in [0, 1] (got {})", name, v));
            }
        }
        if !(1..=MAX_COMBINED_SEGMENTS).contains(&self.edge_maximum_fit_number) {
            return invalid(format!(
                "edge_maximum_fit_number must lie in [1, {}] (got {})",
                MAX_COMBINED_SEGMENTS, self.edge_maximum_fit_number
            ));
        }
        Ok(())
    }
}
