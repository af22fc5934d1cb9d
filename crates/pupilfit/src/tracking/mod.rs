//! Temporal tracking state and its per-object sequence.

pub(crate) mod filter;
mod state;
mod track;

pub use state::DetectionVariables;
pub use track::Track;
