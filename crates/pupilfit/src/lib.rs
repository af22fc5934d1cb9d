//! pupilfit: per-frame pupil (and reference marker) detection and tracking.
//!
//! Locates an elliptical feature inside an area of interest of a grayscale
//! frame and carries a temporal state from frame to frame. The stages are:
//!
//! 1. **Localize** – darkest window near the prediction, edge window, glint.
//! 2. **Edges** – smoothing + Canny, masked to the edge window.
//! 3. **Segments** – boundary tracing, corner splitting, curvature/intensity.
//! 4. **Candidate filter** – consistency with the predicted curvature,
//!    intensity and size.
//! 5. **Ellipse fit** – direct conic fits over combinations of candidates.
//! 6. **Select** – closest fit to the prediction within adaptive thresholds.
//! 7. **Temporal filter** – exact/momentum/average/prediction update, or
//!    freeze on a miss.
//!
//! # Public API
//! - [`detect`] is the single per-frame operation.
//! - [`Track`] owns one object's append-only state sequence.
//! - [`Tracker`] runs a primary feature and an optional marker together.

mod aoi;
mod api;
pub mod conic;
mod detector;
mod diagnostics;
mod error;
mod pipeline;
mod tracking;

#[cfg(test)]
pub(crate) mod test_utils;

pub use aoi::{Aoi, MIN_AOI_SIDE};
pub use api::{Tracker, TrackerOutput};
pub use detector::{
    DetectionParameters, EdgeSegment, EllipseCandidate, Localization, SegmentFlag, Window,
    COMPARABLE_FIT_ERROR_PX, GLINT_INTENSITY_MIN, MAX_COMBINED_SEGMENTS, MIN_SEGMENT_LENGTH,
};
pub use diagnostics::DetectionMiscellaneous;
pub use error::DetectError;
pub use pipeline::{detect, FrameDetection, MissReason, Outcome};
pub use tracking::{DetectionVariables, Track};
