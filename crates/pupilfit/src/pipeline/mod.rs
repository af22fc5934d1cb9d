//! Per-frame pipeline.
//!
//! Wires the detector stages together and applies the temporal filter:
//! localize → edges → segments → candidate filter → ellipse fit → select →
//! state update. Algorithmic building blocks live in `crate::detector`.

mod result;
mod run;

pub use result::{FrameDetection, MissReason, Outcome};
pub use run::detect;
