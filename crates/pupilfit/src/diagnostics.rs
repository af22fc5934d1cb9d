//! Per-frame diagnostic bundle.
//!
//! Nothing here feeds back into tracking; it exists for overlays and export.

use image::GrayImage;

use crate::aoi::Aoi;
use crate::conic::ConicCoeffs;
use crate::detector::{EdgeSegment, Localization, Window};
use crate::pipeline::MissReason;

#[derive(Debug, Clone, serde::Serialize)]
pub struct DetectionMiscellaneous {
    /// Miss reason of a frame without detection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MissReason>,
    /// AOI the frame was searched in.
    pub aoi: Option<Aoi>,
    /// Binary edge map of the AOI after window and glint masking.
    #[serde(skip)]
    pub edge_map: GrayImage,
    /// AOI pixels around the accepted ellipse.
    #[serde(skip)]
    pub feature_crop: Option<GrayImage>,
    /// Window of `feature_crop` in AOI coordinates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_window: Option<Window>,
    /// Rough-localization windows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub localization: Option<Localization>,
    /// All traced segments with their final flags.
    pub segments: Vec<EdgeSegment>,
    /// Conic of the accepted ellipse (AOI coordinates).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coefficients: Option<ConicCoeffs>,
    /// Segment combinations fitted.
    pub fits_evaluated: usize,
    /// Combinations with a degenerate conic.
    pub fits_degenerate: usize,
    /// Fits that passed the error, size and shape gates.
    pub fits_valid: usize,
}

impl DetectionMiscellaneous {
    /// Number of edge pixels in the edge map.
    pub fn edge_pixel_count(&self) -> usize {
        self.edge_map.pixels().filter(|p| p[0] > 0).count()
    }
}
