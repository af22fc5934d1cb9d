//! Rough localization with box sums over an integral image.
//!
//! Finds the darkest square window near the predicted position (the pupil),
//! derives the edge-extraction window around it, and looks for a saturated
//! corneal reflection (glint) inside the pupil window.

use std::f64::consts::SQRT_2;

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::integral_image;

use crate::tracking::DetectionVariables;

use super::config::DetectionParameters;

/// Minimum mean intensity of a glint window.
pub const GLINT_INTENSITY_MIN: u32 = 230;

type Integral = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Axis-aligned window in AOI pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Window {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Window {
    /// Center in pixel-index coordinates.
    pub fn center(&self) -> [f64; 2] {
        [
            self.x as f64 + (self.width as f64 - 1.0) * 0.5,
            self.y as f64 + (self.height as f64 - 1.0) * 0.5,
        ]
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }

    /// Window spanning `center ± reach` per axis, clipped to a `w × h` image.
    pub(crate) fn around(center: [f64; 2], reach: [f64; 2], w: u32, h: u32) -> Self {
        let span = |c: f64, reach: f64, limit: u32| -> (u32, u32) {
            let max = (limit - 1) as f64;
            let lo = (c - reach).floor().clamp(0.0, max) as u32;
            let hi = (c + reach).ceil().clamp(0.0, max) as u32;
            (lo, hi - lo + 1)
        };
        let (x, width) = span(center[0], reach[0], w);
        let (y, height) = span(center[1], reach[1], h);
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Window geometry found by rough localization.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Localization {
    /// Darkest square near the prediction.
    pub pupil: Window,
    /// Region edges are extracted from.
    pub offset: Window,
    /// Accepted glint window, if any.
    pub glint: Option<Window>,
}

/// Locate the pupil, edge and glint windows in an AOI image.
pub(crate) fn localize(
    roi: &GrayImage,
    state: &DetectionVariables,
    params: &DetectionParameters,
) -> Localization {
    let (w, h) = roi.dimensions();
    let integral: Integral = integral_image::<_, u32>(roi);

    let (a_hat, b_hat) = state.predicted_axes(params);
    let side = ((SQRT_2 * b_hat).round() as u32).clamp(1, w.min(h));
    let pupil = darkest_window(
        &integral,
        [w, h],
        side,
        state.predicted_position(),
        state.search_radius,
    );

    let reach = a_hat + params.window_offset as f64;
    let offset = Window::around(pupil.center(), [reach, reach], w, h);

    let glint = if params.glint_radius > 0 {
        brightest_window(&integral, &pupil, params.glint_radius.min(side))
    } else {
        None
    };

    Localization {
        pupil,
        offset,
        glint,
    }
}

#[inline]
fn box_sum(integral: &Integral, x: u32, y: u32, side_x: u32, side_y: u32) -> u32 {
    let at = |px: u32, py: u32| integral.get_pixel(px, py)[0];
    let x1 = x + side_x;
    let y1 = y + side_y;
    at(x1, y1)
        .wrapping_add(at(x, y))
        .wrapping_sub(at(x, y1))
        .wrapping_sub(at(x1, y))
}

/// Darkest `side × side` window whose center lies within `radius` of `pred`.
///
/// Ties go to the window closest to `pred`. When no center qualifies, the
/// window nearest to `pred` is returned.
fn darkest_window(
    integral: &Integral,
    [w, h]: [u32; 2],
    side: u32,
    pred: [f64; 2],
    radius: f64,
) -> Window {
    let half = (side as f64 - 1.0) * 0.5;
    let radius_sq = radius * radius;
    let mut best: Option<(u32, f64, u32, u32)> = None;

    for y in 0..=(h - side) {
        let dy = y as f64 + half - pred[1];
        for x in 0..=(w - side) {
            let dx = x as f64 + half - pred[0];
            let d2 = dx * dx + dy * dy;
            if d2 > radius_sq {
                continue;
            }
            let sum = box_sum(integral, x, y, side, side);
            let better = match best {
                None => true,
                Some((s, bd2, _, _)) => sum < s || (sum == s && d2 < bd2),
            };
            if better {
                best = Some((sum, d2, x, y));
            }
        }
    }

    let (x, y) = match best {
        Some((_, _, x, y)) => (x, y),
        None => {
            let clamp =
                |p: f64, limit: u32| (p - half).round().clamp(0.0, (limit - side) as f64) as u32;
            (clamp(pred[0], w), clamp(pred[1], h))
        }
    };
    Window {
        x,
        y,
        width: side,
        height: side,
    }
}

/// Brightest `side × side` window inside `region`, if saturated enough.
///
/// Equally bright windows are merged into their mean position.
fn brightest_window(integral: &Integral, region: &Window, side: u32) -> Option<Window> {
    if side == 0 || side > region.width || side > region.height {
        return None;
    }
    let mut best_sum = 0u32;
    let mut tied = (0u64, 0u64, 0u64);
    for y in region.y..=(region.y + region.height - side) {
        for x in region.x..=(region.x + region.width - side) {
            let sum = box_sum(integral, x, y, side, side);
            if sum > best_sum || tied.2 == 0 {
                best_sum = sum;
                tied = (0, 0, 0);
            }
            if sum == best_sum {
                tied = (tied.0 + x as u64, tied.1 + y as u64, tied.2 + 1);
            }
        }
    }
    if tied.2 == 0 || best_sum < GLINT_INTENSITY_MIN * side * side {
        return None;
    }
    let mean = |total: u64| (total as f64 / tied.2 as f64).round() as u32;
    Some(Window {
        x: mean(tied.0),
        y: mean(tied.1),
        width: side,
        height: side,
    })
}
