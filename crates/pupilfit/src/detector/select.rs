//! Final per-frame choice among surviving fits.

use crate::pipeline::MissReason;
use crate::tracking::DetectionVariables;

use super::ellipse_fit::EllipseCandidate;

/// Pick the accepted candidate, returning its index in `candidates`.
///
/// While searching the best-ranked fit is taken as is. When locked, only
/// fits within the adaptive change thresholds of the prediction qualify and
/// the one closest to the prediction (in threshold units) wins.
pub(crate) fn select_candidate(
    candidates: &[EllipseCandidate],
    state: &DetectionVariables,
) -> Result<usize, MissReason> {
    if candidates.is_empty() {
        return Err(MissReason::NoValidFit);
    }
    if !state.is_locked() {
        return Ok(0);
    }

    let thr_c = state.threshold_circumference_change;
    let thr_ar = state.threshold_aspect_ratio_change;
    let mut best: Option<(usize, f64)> = None;
    for (i, c) in candidates.iter().enumerate() {
        let dc = (c.circumference - state.circumference_prediction).abs();
        let dar = (c.aspect_ratio - state.aspect_ratio_prediction).abs();
        if dc > thr_c || dar > thr_ar {
            continue;
        }
        let score = dc / thr_c + dar / thr_ar;
        if best.map_or(true, |(_, s)| score < s) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i).ok_or(MissReason::OutsideThresholds)
}
