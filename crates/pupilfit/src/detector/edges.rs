//! Edge map extraction for one AOI.

use image::{GrayImage, ImageBuffer, Luma};

use super::config::DetectionParameters;
use super::localize::Localization;

/// Gradient magnitude image (Sobel magnitude / 4, grey levels of contrast).
pub(crate) type GradientImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Edge map plus the gradient image segments sample intensity from.
pub(crate) struct EdgeMaps {
    /// Binary edge map (255 = edge) of the whole AOI.
    pub edges: GrayImage,
    pub gradient: GradientImage,
}

/// Pre-smoothing requested by the blur level and kernel size.
pub(crate) fn smooth(roi: &GrayImage, params: &DetectionParameters) -> GrayImage {
    let mut out = if params.canny_blur_level > 1 {
        let r = params.canny_blur_level / 2;
        imageproc::filter::box_filter(roi, r, r)
    } else {
        roi.clone()
    };
    if params.canny_kernel_size > 3 {
        out = imageproc::filter::gaussian_blur_f32(&out, kernel_sigma(params.canny_kernel_size));
    }
    out
}

/// Gaussian sigma matching an aperture of `ksize` pixels.
fn kernel_sigma(ksize: u32) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Canny edges restricted to the offset window, with the glint neighbourhood erased.
pub(crate) fn extract_edges(
    smoothed: &GrayImage,
    loc: &Localization,
    params: &DetectionParameters,
) -> EdgeMaps {
    let mut edges = imageproc::edges::canny(
        smoothed,
        params.canny_threshold_low,
        params.canny_threshold_high,
    );

    let glint_mask = loc.glint.map(|g| {
        let r = (params.glint_radius + 2) as f64;
        (g.center(), r * r)
    });
    for (x, y, px) in edges.enumerate_pixels_mut() {
        if px[0] == 0 {
            continue;
        }
        let outside = !loc.offset.contains(x, y);
        let in_glint = glint_mask.is_some_and(|([gx, gy], r2)| {
            let dx = x as f64 - gx;
            let dy = y as f64 - gy;
            dx * dx + dy * dy <= r2
        });
        if outside || in_glint {
            px[0] = 0;
        }
    }

    EdgeMaps {
        edges,
        gradient: gradient_magnitude(smoothed),
    }
}

fn gradient_magnitude(img: &GrayImage) -> GradientImage {
    let gx = imageproc::gradients::horizontal_sobel(img);
    let gy = imageproc::gradients::vertical_sobel(img);
    let (w, h) = img.dimensions();
    let data = gx
        .as_raw()
        .iter()
        .zip(gy.as_raw())
        .map(|(&a, &b)| {
            let (a, b) = (a as f32, b as f32);
            (a * a + b * b).sqrt() * 0.25
        })
        .collect();
    GradientImage::from_raw(w, h, data).unwrap_or_else(|| GradientImage::new(w, h))
}
