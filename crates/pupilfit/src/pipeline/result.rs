use crate::detector::EllipseCandidate;
use crate::diagnostics::DetectionMiscellaneous;
use crate::tracking::DetectionVariables;

/// Why a frame ended without a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    /// No edge segment long enough to fit.
    NoEdges,
    /// Every segment was rejected by the prediction gate.
    NoCandidates,
    /// No fit passed the error, size and shape bounds.
    NoValidFit,
    /// Fits exist but none is within the change thresholds of the prediction.
    OutsideThresholds,
}

impl std::fmt::Display for MissReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoEdges => "no edges found",
            Self::NoCandidates => "no candidate segments",
            Self::NoValidFit => "no valid ellipse fit",
            Self::OutsideThresholds => "fits outside change thresholds",
        };
        f.write_str(s)
    }
}

/// Per-frame outcome for one object.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Detected(EllipseCandidate),
    NotDetected { reason: MissReason },
}

impl Outcome {
    pub fn is_detected(&self) -> bool {
        matches!(self, Self::Detected(_))
    }

    pub fn candidate(&self) -> Option<&EllipseCandidate> {
        match self {
            Self::Detected(c) => Some(c),
            Self::NotDetected { .. } => None,
        }
    }

    pub fn miss_reason(&self) -> Option<MissReason> {
        match self {
            Self::Detected(_) => None,
            Self::NotDetected { reason } => Some(*reason),
        }
    }
}

/// Everything [`detect`](crate::detect) produces for one frame.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FrameDetection {
    /// Accepted ellipse or the reason for the miss.
    pub outcome: Outcome,
    /// Tracking state to feed into the next frame.
    pub state: DetectionVariables,
    /// Intermediate artifacts for visualization and export.
    pub diagnostics: DetectionMiscellaneous,
}
