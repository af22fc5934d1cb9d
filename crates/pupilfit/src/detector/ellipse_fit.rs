//! Combinatorial ellipse fitting over candidate edge segments.

use crate::conic::{fit_ellipse, ConicCoeffs, ConicFit, Ellipse};

use super::config::DetectionParameters;
use super::segments::EdgeSegment;

/// Fits whose error is within this margin (px) of the best fit count as
/// equally good; among them more edge support wins.
pub const COMPARABLE_FIT_ERROR_PX: f64 = 0.2;

/// A fitted ellipse hypothesis built from one combination of segments.
///
/// Every derived field is computed from the fit and the contributing
/// segments in [`EllipseCandidate::from_fit`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EllipseCandidate {
    /// Conic coefficients in AOI coordinates.
    pub coefficients: ConicCoeffs,
    pub ellipse: Ellipse,
    /// Center (AOI coordinates).
    pub x_pos: f64,
    pub y_pos: f64,
    /// Major axis length (px).
    pub width: f64,
    /// Minor axis length (px).
    pub height: f64,
    /// Equivalent radius `circumference / 2π`.
    pub radius: f64,
    pub circumference: f64,
    /// Minor/major ratio in (0, 1].
    pub aspect_ratio: f64,
    /// Length-weighted mean intensity of the contributing segments.
    pub intensity: f64,
    /// Length-weighted mean curvature of the contributing segments.
    pub curvature: f64,
    /// Summed length of the contributing segments.
    pub edge_length: usize,
    /// Contributing segment indices, ascending.
    pub edge_indices: Vec<usize>,
    /// RMS Sampson distance (px) of the contributing points.
    pub fit_error: f64,
}

impl EllipseCandidate {
    pub(crate) fn from_fit(fit: &ConicFit, contributing: &[&EdgeSegment]) -> Self {
        let e = fit.ellipse;
        let edge_length: usize = contributing.iter().map(|s| s.length).sum();
        let weight = edge_length.max(1) as f64;
        let intensity = contributing
            .iter()
            .map(|s| s.intensity * s.length as f64)
            .sum::<f64>()
            / weight;
        let curvature = contributing
            .iter()
            .map(|s| s.curvature_avg * s.length as f64)
            .sum::<f64>()
            / weight;
        let mut edge_indices: Vec<usize> = contributing.iter().map(|s| s.index).collect();
        edge_indices.sort_unstable();

        Self {
            coefficients: fit.coeffs,
            ellipse: e,
            x_pos: e.cx,
            y_pos: e.cy,
            width: 2.0 * e.a,
            height: 2.0 * e.b,
            radius: e.equivalent_radius(),
            circumference: e.circumference(),
            aspect_ratio: e.aspect_ratio(),
            intensity,
            curvature,
            edge_length,
            edge_indices,
            fit_error: fit.rms_residual,
        }
    }
}

/// Fitting outcome for one frame.
#[derive(Debug, Clone, Default)]
pub(crate) struct FitSummary {
    /// Surviving candidates, best first.
    pub candidates: Vec<EllipseCandidate>,
    /// Number of combinations fitted.
    pub evaluated: usize,
    /// Combinations whose conic fit was degenerate.
    pub degenerate: usize,
}

/// Fit every non-empty combination of the top-ranked candidate segments.
///
/// Only the first `edge_maximum_fit_number` entries of `ranked` take part.
/// Fits are gated on error, circumference range, aspect ratio and on the
/// center lying inside the `aoi_size` AOI.
pub(crate) fn fit_candidates(
    segments: &[EdgeSegment],
    ranked: &[usize],
    params: &DetectionParameters,
    aoi_size: [u32; 2],
) -> FitSummary {
    let pool = &ranked[..ranked.len().min(params.edge_maximum_fit_number)];
    let mut summary = FitSummary::default();
    let mut points: Vec<[f64; 2]> = Vec::new();
    let mut contributing: Vec<&EdgeSegment> = Vec::with_capacity(pool.len());

    for mask in 1u32..(1u32 << pool.len()) {
        contributing.clear();
        points.clear();
        for (bit, &idx) in pool.iter().enumerate() {
            if mask & (1 << bit) != 0 {
                let seg = &segments[idx];
                contributing.push(seg);
                points.extend(seg.points_f64());
            }
        }

        summary.evaluated += 1;
        let fit = match fit_ellipse(&points) {
            Ok(fit) => fit,
            Err(err) => {
                summary.degenerate += 1;
                tracing::trace!(mask, %err, "degenerate segment combination");
                continue;
            }
        };

        let candidate = EllipseCandidate::from_fit(&fit, &contributing);
        if let Some(reason) = gate(&candidate, params, aoi_size) {
            tracing::trace!(
                mask,
                fit_error = candidate.fit_error,
                circumference = candidate.circumference,
                aspect_ratio = candidate.aspect_ratio,
                reason,
                "fit rejected"
            );
            continue;
        }
        summary.candidates.push(candidate);
    }

    rank_fits(&mut summary.candidates);
    summary
}

fn gate(c: &EllipseCandidate, params: &DetectionParameters, [w, h]: [u32; 2]) -> Option<&'static str> {
    if !(c.fit_error <= params.ellipse_fit_error_maximum) {
        return Some("fit error");
    }
    if c.circumference < params.circumference_min || c.circumference > params.circumference_max {
        return Some("circumference");
    }
    if c.aspect_ratio < params.aspect_ratio_min {
        return Some("aspect ratio");
    }
    if c.x_pos < 0.0 || c.y_pos < 0.0 || c.x_pos >= w as f64 || c.y_pos >= h as f64 {
        return Some("center outside aoi");
    }
    None
}

/// Order fits best first: comparable errors prefer longer edge support,
/// the rest go by error.
fn rank_fits(candidates: &mut [EllipseCandidate]) {
    let best = candidates
        .iter()
        .map(|c| c.fit_error)
        .fold(f64::INFINITY, f64::min);
    let outside = |c: &EllipseCandidate| c.fit_error > best + COMPARABLE_FIT_ERROR_PX;
    candidates.sort_by(|a, b| {
        let tier = outside(a).cmp(&outside(b));
        let within = if outside(a) {
            a.fit_error
                .total_cmp(&b.fit_error)
                .then(b.edge_length.cmp(&a.edge_length))
        } else {
            b.edge_length
                .cmp(&a.edge_length)
                .then(a.fit_error.total_cmp(&b.fit_error))
        };
        tier.then(within)
            .then_with(|| a.edge_indices.cmp(&b.edge_indices))
    });
}
