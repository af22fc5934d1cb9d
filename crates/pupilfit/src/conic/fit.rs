//! Direct least-squares ellipse fitting (Fitzgibbon et al., 1999).

use nalgebra::{DMatrix, Matrix3, Vector6};

use super::eigen::ellipse_eigenvector;
use super::types::{ConicCoeffs, Ellipse, FitFailure};

/// A successful conic fit together with its residual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConicFit {
    /// Conic coefficients in input coordinates.
    pub coeffs: ConicCoeffs,
    /// Geometric form of `coeffs`.
    pub ellipse: Ellipse,
    /// RMS Sampson distance (pixels) of the input points to the conic.
    pub rms_residual: f64,
}

/// Fit an ellipse to 2D points with the ellipse-specific direct method.
///
/// Points are normalized to their centroid with mean radius √2 before the
/// scatter matrix is formed. Requires at least six points.
pub fn fit_ellipse(points: &[[f64; 2]]) -> Result<ConicFit, FitFailure> {
    let coeffs = fit_conic_direct(points)?;
    let ellipse = coeffs.to_ellipse().ok_or(FitFailure::NotAnEllipse)?;
    if !ellipse.is_valid() {
        return Err(FitFailure::NotAnEllipse);
    }
    Ok(ConicFit {
        coeffs,
        ellipse,
        rms_residual: rms_sampson_distance(&coeffs, points),
    })
}

/// Solve for raw conic coefficients. See [`fit_ellipse`].
pub fn fit_conic_direct(points: &[[f64; 2]]) -> Result<ConicCoeffs, FitFailure> {
    let n = points.len();
    if n < 6 {
        return Err(FitFailure::TooFewPoints { got: n });
    }

    let (mean_x, mean_y, scale) = normalization_params(points);

    let mut design = DMatrix::<f64>::zeros(n, 6);
    for (i, &[px, py]) in points.iter().enumerate() {
        let x = (px - mean_x) * scale;
        let y = (py - mean_y) * scale;
        design[(i, 0)] = x * x;
        design[(i, 1)] = x * y;
        design[(i, 2)] = y * y;
        design[(i, 3)] = x;
        design[(i, 4)] = y;
        design[(i, 5)] = 1.0;
    }

    let scatter = design.transpose() * &design;
    let s11 = scatter.fixed_view::<3, 3>(0, 0).into_owned();
    let s12 = scatter.fixed_view::<3, 3>(0, 3).into_owned();
    let s22 = scatter.fixed_view::<3, 3>(3, 3).into_owned();

    // Ellipse constraint 4AC − B² = 1 as aᵀ C₁ a.
    let c1 = Matrix3::new(0.0, 0.0, 2.0, 0.0, -1.0, 0.0, 2.0, 0.0, 0.0);

    let s22_inv = s22.try_inverse().ok_or(FitFailure::Singular)?;
    let reduced = s11 - s12 * s22_inv * s12.transpose();
    let c1_inv = c1.try_inverse().ok_or(FitFailure::Singular)?;

    let quad = ellipse_eigenvector(&(c1_inv * reduced)).ok_or(FitFailure::Singular)?;
    let linear = -s22_inv * s12.transpose() * quad;

    let normalized = Vector6::new(quad[0], quad[1], quad[2], linear[0], linear[1], linear[2]);
    let coeffs = ConicCoeffs(denormalize_conic(&normalized, mean_x, mean_y, scale));
    if coeffs.0.iter().any(|c| !c.is_finite()) {
        return Err(FitFailure::Singular);
    }
    if !coeffs.is_ellipse() {
        return Err(FitFailure::NotAnEllipse);
    }
    Ok(coeffs)
}

/// Centroid and isotropic scale taking the mean centroid distance to √2.
fn normalization_params(points: &[[f64; 2]]) -> (f64, f64, f64) {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| (p[0] - mean_x).hypot(p[1] - mean_y))
        .sum::<f64>()
        / n;
    let scale = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    (mean_x, mean_y, scale)
}

/// Map coefficients fitted on x' = s(x − mx), y' = s(y − my) back to (x, y).
fn denormalize_conic(c: &Vector6<f64>, mx: f64, my: f64, s: f64) -> [f64; 6] {
    let [a_, b_, c_, d_, e_, f_] = [c[0], c[1], c[2], c[3], c[4], c[5]];
    let s2 = s * s;
    [
        a_ * s2,
        b_ * s2,
        c_ * s2,
        -2.0 * a_ * s2 * mx - b_ * s2 * my + d_ * s,
        -b_ * s2 * mx - 2.0 * c_ * s2 * my + e_ * s,
        a_ * s2 * mx * mx + b_ * s2 * mx * my + c_ * s2 * my * my - d_ * s * mx - e_ * s * my
            + f_,
    ]
}

/// RMS Sampson distance of points to a conic.
pub fn rms_sampson_distance(conic: &ConicCoeffs, points: &[[f64; 2]]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = points
        .iter()
        .map(|&[x, y]| conic.sampson_distance(x, y).powi(2))
        .sum();
    (sum_sq / points.len() as f64).sqrt()
}
