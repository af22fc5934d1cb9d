//! Rectangular area of interest inside a frame.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::error::DetectError;

/// Smallest AOI side the detector will search.
pub const MIN_AOI_SIDE: u32 = 8;

/// Area of interest in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aoi {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Aoi {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// AOI covering a whole frame.
    pub fn full(frame: &GrayImage) -> Self {
        let (width, height) = frame.dimensions();
        Self::new(0, 0, width, height)
    }

    /// AOI-relative center.
    pub fn local_center(&self) -> [f64; 2] {
        [self.width as f64 * 0.5, self.height as f64 * 0.5]
    }

    /// Longer side in pixels.
    pub fn max_side(&self) -> f64 {
        self.width.max(self.height) as f64
    }

    /// Check the AOI against a frame.
    pub fn validate(&self, frame: &GrayImage) -> Result<(), DetectError> {
        let (fw, fh) = frame.dimensions();
        if fw == 0 || fh == 0 {
            return Err(DetectError::EmptyFrame);
        }
        if self.width == 0 || self.height == 0 {
            return Err(DetectError::EmptyAoi(*self));
        }
        if self.width < MIN_AOI_SIDE || self.height < MIN_AOI_SIDE {
            return Err(DetectError::AoiTooSmall {
                aoi: *self,
                min_side: MIN_AOI_SIDE,
            });
        }
        let fits_x = self.x.checked_add(self.width).is_some_and(|r| r <= fw);
        let fits_y = self.y.checked_add(self.height).is_some_and(|b| b <= fh);
        if !fits_x || !fits_y {
            return Err(DetectError::AoiOutOfBounds {
                aoi: *self,
                frame_size: [fw, fh],
            });
        }
        Ok(())
    }

    /// Copy the AOI pixels out of the frame. Call [`Aoi::validate`] first.
    pub fn crop(&self, frame: &GrayImage) -> GrayImage {
        image::imageops::crop_imm(frame, self.x, self.y, self.width, self.height).to_image()
    }
}

impl std::fmt::Display for Aoi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.x, self.y
        )
    }
}

impl std::str::FromStr for Aoi {
    type Err = String;

    /// Parse `x,y,width,height`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(format!("expected x,y,width,height, got '{}'", s));
        }
        let mut vals = [0u32; 4];
        for (v, p) in vals.iter_mut().zip(&parts) {
            *v = p
                .parse()
                .map_err(|e| format!("invalid AOI component '{}': {}", p, e))?;
        }
        Ok(Self::new(vals[0], vals[1], vals[2], vals[3]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_malformed_aois() {
        let frame = GrayImage::new(64, 48);
        assert!(Aoi::new(0, 0, 64, 48).validate(&frame).is_ok());
        assert_eq!(
            Aoi::new(0, 0, 0, 10).validate(&frame),
            Err(DetectError::EmptyAoi(Aoi::new(0, 0, 0, 10)))
        );
        assert!(matches!(
            Aoi::new(0, 0, 4, 40).validate(&frame),
            Err(DetectError::AoiTooSmall { .. })
        ));
        assert!(matches!(
            Aoi::new(40, 0, 30, 20).validate(&frame),
            Err(DetectError::AoiOutOfBounds { .. })
        ));
        assert!(matches!(
            Aoi::new(u32::MAX, 0, 10, 10).validate(&frame),
            Err(DetectError::AoiOutOfBounds { .. })
        ));
        assert_eq!(
            Aoi::new(0, 0, 10, 10).validate(&GrayImage::new(0, 0)),
            Err(DetectError::EmptyFrame)
        );
    }

    #[test]
    fn crop_copies_the_region() {
        let mut frame = GrayImage::new(20, 20);
        frame.put_pixel(12, 7, image::Luma([99]));
        let roi = Aoi::new(10, 5, 8, 8).crop(&frame);
        assert_eq!(roi.dimensions(), (8, 8));
        assert_eq!(roi.get_pixel(2, 2)[0], 99);
    }

    #[test]
    fn parses_from_string() {
        let aoi: Aoi = "4, 5,60,40".parse().expect("valid AOI");
        assert_eq!(aoi, Aoi::new(4, 5, 60, 40));
        assert!("1,2,3".parse::<Aoi>().is_err());
        assert!("a,2,3,4".parse::<Aoi>().is_err());
    }
}
