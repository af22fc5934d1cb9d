//! Per-frame detection stages, independent of orchestration.
//!
//! The `pipeline` module owns the call order: localize → edges → segments →
//! candidate filter → ellipse fit → select. Each stage here is a function of
//! its inputs and the read-only prior state.

pub(crate) mod candidate_filter;
pub(crate) mod edges;
pub(crate) mod ellipse_fit;
pub(crate) mod localize;
pub(crate) mod segments;
pub(crate) mod select;

mod config;

pub use config::{DetectionParameters, MAX_COMBINED_SEGMENTS};
pub use ellipse_fit::{EllipseCandidate, COMPARABLE_FIT_ERROR_PX};
pub use localize::{Localization, Window, GLINT_INTENSITY_MIN};
pub use segments::{EdgeSegment, SegmentFlag, MIN_SEGMENT_LENGTH};
