//! High-level tracking API.
//!
//! [`Tracker`] follows a primary feature and, optionally, a reference
//! marker through a sequence of frames. The two objects have independent
//! state chains and are processed in parallel for each frame.

use image::GrayImage;

use crate::aoi::Aoi;
use crate::detector::DetectionParameters;
use crate::error::DetectError;
use crate::pipeline::FrameDetection;
use crate::tracking::Track;

/// Detections of both objects for one frame.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrackerOutput {
    pub primary: FrameDetection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<FrameDetection>,
}

/// Primary tracking interface.
///
/// Create once per session, then feed frames in order.
///
/// # Examples
///
/// ```no_run
/// use pupilfit::{Aoi, Tracker};
/// use image::GrayImage;
///
/// let mut tracker = Tracker::new(Aoi::new(100, 80, 160, 120));
/// let frame = GrayImage::new(640, 480);
/// let out = tracker.process(&frame).unwrap();
/// println!("detected: {}", out.primary.outcome.is_detected());
/// ```
#[derive(Debug, Clone)]
pub struct Tracker {
    primary: Track,
    marker: Option<Track>,
}

impl Tracker {
    /// Track the primary feature only, with default parameters.
    pub fn new(aoi: Aoi) -> Self {
        Self {
            primary: Track::with_defaults(aoi),
            marker: None,
        }
    }

    /// Track the primary feature with explicit parameters.
    pub fn with_params(params: DetectionParameters, aoi: Aoi) -> Result<Self, DetectError> {
        Ok(Self {
            primary: Track::new(params, aoi)?,
            marker: None,
        })
    }

    /// Also track a reference marker in its own AOI.
    pub fn with_marker(
        mut self,
        params: DetectionParameters,
        aoi: Aoi,
    ) -> Result<Self, DetectError> {
        self.marker = Some(Track::new(params, aoi)?);
        Ok(self)
    }

    pub fn primary(&self) -> &Track {
        &self.primary
    }

    pub fn marker(&self) -> Option<&Track> {
        self.marker.as_ref()
    }

    /// Process the next frame for every tracked object.
    ///
    /// Both AOIs are checked first, so a contract error leaves every track
    /// unchanged.
    pub fn process(&mut self, frame: &GrayImage) -> Result<TrackerOutput, DetectError> {
        self.primary.check(frame)?;
        if let Some(marker) = &self.marker {
            marker.check(frame)?;
        }

        let Self { primary, marker } = self;
        let (primary, marker) = rayon::join(
            || primary.step(frame),
            || marker.as_mut().map(|m| m.step(frame)),
        );
        Ok(TrackerOutput {
            primary: primary?,
            marker: marker.transpose()?,
        })
    }

    /// Resume processing at `frame_index` for every object.
    pub fn rewind(&mut self, frame_index: usize) {
        self.primary.rewind(frame_index);
        if let Some(marker) = &mut self.marker {
            marker.rewind(frame_index);
        }
    }
}
