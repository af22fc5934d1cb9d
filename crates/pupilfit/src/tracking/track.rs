use image::GrayImage;

use crate::aoi::Aoi;
use crate::detector::DetectionParameters;
use crate::error::DetectError;
use crate::pipeline::{detect, FrameDetection};

use super::state::DetectionVariables;

/// Append-only state sequence of one tracked object.
///
/// Entry 0 is the seed; processing frame `i` appends entry `i + 1`.
/// Entries are addressed by position and never modified once written.
#[derive(Debug, Clone)]
pub struct Track {
    params: DetectionParameters,
    aoi: Aoi,
    states: Vec<DetectionVariables>,
}

impl Track {
    /// Start a track from the default seed state for `aoi`.
    pub fn new(params: DetectionParameters, aoi: Aoi) -> Result<Self, DetectError> {
        let seed = DetectionVariables::initial(&params, &aoi);
        Self::with_seed(params, aoi, seed)
    }

    /// Default parameters are always valid.
    pub(crate) fn with_defaults(aoi: Aoi) -> Self {
        let params = DetectionParameters::default();
        let seed = DetectionVariables::initial(&params, &aoi);
        Self {
            params,
            aoi,
            states: vec![seed],
        }
    }

    /// Start a track from a caller-provided seed, e.g. a previous session's last state.
    pub fn with_seed(
        params: DetectionParameters,
        aoi: Aoi,
        seed: DetectionVariables,
    ) -> Result<Self, DetectError> {
        params.validate()?;
        Ok(Self {
            params,
            aoi,
            states: vec![seed],
        })
    }

    pub fn params(&self) -> &DetectionParameters {
        &self.params
    }

    pub fn aoi(&self) -> &Aoi {
        &self.aoi
    }

    /// All states, seed first.
    pub fn states(&self) -> &[DetectionVariables] {
        &self.states
    }

    /// State the next frame is detected from.
    pub fn current(&self) -> &DetectionVariables {
        &self.states[self.states.len() - 1]
    }

    pub fn frames_processed(&self) -> usize {
        self.states.len() - 1
    }

    /// Check that the next frame can be processed without a contract error.
    pub fn check(&self, frame: &GrayImage) -> Result<(), DetectError> {
        self.aoi.validate(frame)
    }

    /// Detect in the next frame and append the resulting state.
    ///
    /// On error nothing is appended.
    pub fn step(&mut self, frame: &GrayImage) -> Result<FrameDetection, DetectError> {
        let out = detect(frame, &self.aoi, &self.params, self.current())?;
        self.states.push(out.state.clone());
        Ok(out)
    }

    /// Drop every state after the one frame `frame_index` is detected from,
    /// so processing resumes at that frame.
    pub fn rewind(&mut self, frame_index: usize) {
        self.states.truncate(frame_index + 1);
    }
}
