//! Caller-contract errors.
//!
//! Only malformed input is reported as an error. Frames where nothing is
//! found resolve to a not-detected outcome instead (see
//! [`MissReason`](crate::MissReason)).

use crate::aoi::Aoi;

/// Errors surfaced by [`detect`](crate::detect) without touching tracking state.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectError {
    /// The frame has zero width or height.
    EmptyFrame,
    /// The AOI has zero width or height.
    EmptyAoi(Aoi),
    /// The AOI is smaller than the minimum searchable side length.
    AoiTooSmall {
        /// Offending AOI.
        aoi: Aoi,
        /// Minimum side length in pixels.
        min_side: u32,
    },
    /// The AOI extends beyond the frame.
    AoiOutOfBounds {
        /// Offending AOI.
        aoi: Aoi,
        /// Frame dimensions [width, height].
        frame_size: [u32; 2],
    },
    /// A detection parameter is outside its admissible range.
    InvalidParameters(String),
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyFrame => write!(f, "frame has zero area"),
            Self::EmptyAoi(aoi) => write!(f, "area of interest has zero area: {}", aoi),
            Self::AoiTooSmall { aoi, min_side } => write!(
                f,
                "area of interest too small: {} (minimum side {} px)",
                aoi, min_side
            ),
            Self::AoiOutOfBounds { aoi, frame_size } => write!(
                f,
                "area of interest {} exceeds frame {}x{}",
                aoi, frame_size[0], frame_size[1]
            ),
            Self::InvalidParameters(msg) => write!(f, "invalid detection parameters: {}", msg),
        }
    }
}

impl std::error::Error for DetectError {}
