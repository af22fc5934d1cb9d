//! Prediction-consistency gate applied to edge segments before fitting.

use crate::tracking::DetectionVariables;

use super::config::DetectionParameters;
use super::segments::{EdgeSegment, SegmentFlag};

/// Mark segments inconsistent with the running prediction as rejected.
///
/// `reference` is the center distances are measured from (predicted
/// position when locked, pupil window center while searching). Returns the
/// indices of surviving candidates ranked by `size`, largest first.
///
/// The intensity and curvature gates only apply while locked; a lost track
/// is filtered by distance alone so it can re-acquire a feature whose edge
/// contrast changed.
pub(crate) fn filter_segments(
    segments: &mut [EdgeSegment],
    state: &DetectionVariables,
    params: &DetectionParameters,
    reference: [f64; 2],
) -> Vec<usize> {
    let (a_est, b_est) = state.predicted_axes(params);
    let sr = state.search_radius;
    let intensity_floor = state.edge_intensity_prediction - params.edge_intensity_offset;
    let locked = state.is_locked();

    for seg in segments.iter_mut() {
        seg.distance = mean_distance(seg, reference);

        let dim = locked && seg.intensity < intensity_floor;
        let off_curve = locked
            && (seg.curvature_avg - state.edge_curvature_prediction).abs() > state.curvature_offset;
        let too_far = seg.distance > a_est + sr;
        let too_close = seg.distance < b_est - sr;

        seg.flag = if dim || off_curve || too_far || too_close {
            tracing::trace!(
                index = seg.index,
                dim,
                off_curve,
                too_far,
                too_close,
                "segment rejected"
            );
            SegmentFlag::Rejected
        } else {
            SegmentFlag::Candidate
        };
    }

    let mut ranked: Vec<usize> = segments
        .iter()
        .enumerate()
        .filter(|(_, s)| s.flag == SegmentFlag::Candidate)
        .map(|(i, _)| i)
        .collect();
    ranked.sort_by(|&i, &j| {
        segments[j]
            .size
            .total_cmp(&segments[i].size)
            .then(i.cmp(&j))
    });
    ranked
}

fn mean_distance(seg: &EdgeSegment, [cx, cy]: [f64; 2]) -> f64 {
    if seg.points.is_empty() {
        return 0.0;
    }
    seg.points_f64()
        .map(|[x, y]| (x - cx).hypot(y - cy))
        .sum::<f64>()
        / seg.points.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aoi::Aoi;

    fn arc_segment(
        index: usize,
        center: [f64; 2],
        r: f64,
        intensity: f64,
        curvature: f64,
    ) -> EdgeSegment {
        let points: Vec<[u32; 2]> = (0..20)
            .map(|i| {
                let t = i as f64 * 0.05;
                [
                    (center[0] + r * t.cos()).round() as u32,
                    (center[1] + r * t.sin()).round() as u32,
                ]
            })
            .collect();
        EdgeSegment {
            index,
            length: points.len(),
            size: points.len() as f64 * intensity / 255.0,
            points,
            curvature_max: curvature,
            curvature_min: curvature,
            curvature_avg: curvature,
            intensity,
            distance: 0.0,
            flag: SegmentFlag::Candidate,
        }
    }

    fn locked_state(params: &DetectionParameters) -> DetectionVariables {
        let mut s = DetectionVariables::initial(params, &Aoi::new(0, 0, 100, 100));
        s.detected = true;
        s.radius_prediction = 20.0;
        s.aspect_ratio_prediction = 1.0;
        s.search_radius = 5.0;
        s.edge_curvature_prediction = 0.05;
        s.edge_intensity_prediction = 100.0;
        s.curvature_offset = 0.05;
        s
    }

    #[test]
    fn searching_accepts_everything_bright_enough() {
        let params = DetectionParameters::default();
        let state = DetectionVariables::initial(&params, &Aoi::new(0, 0, 100, 100));
        let mut segs = vec![
            arc_segment(0, [50.0, 50.0], 20.0, 100.0, 0.0),
            arc_segment(1, [50.0, 50.0], 30.0, 5.0, 0.9),
        ];
        let kept = filter_segments(&mut segs, &state, &params, [50.0, 50.0]);
        assert_eq!(kept, vec![0, 1]);
        assert!((segs[0].distance - 20.0).abs() < 0.7);
    }

    #[test]
    fn locked_filter_rejects_inconsistent_segments() {
        let params = DetectionParameters::default();
        let state = locked_state(&params);
        let mut segs = vec![
            arc_segment(0, [50.0, 50.0], 20.0, 100.0, 0.05),
            arc_segment(1, [50.0, 50.0], 20.0, 40.0, 0.05),
            arc_segment(2, [50.0, 50.0], 20.0, 100.0, 0.3),
            arc_segment(3, [50.0, 50.0], 40.0, 100.0, 0.05),
            arc_segment(4, [50.0, 50.0], 8.0, 100.0, 0.05),
            arc_segment(5, [50.0, 50.0], 21.0, 120.0, 0.06),
        ];
        let kept = filter_segments(&mut segs, &state, &params, [50.0, 50.0]);
        assert_eq!(kept, vec![5, 0]);
        let flags: Vec<_> = segs.iter().map(|s| s.flag).collect();
        assert_eq!(
            flags,
            vec![
                SegmentFlag::Candidate,
                SegmentFlag::Rejected,
                SegmentFlag::Rejected,
                SegmentFlag::Rejected,
                SegmentFlag::Rejected,
                SegmentFlag::Candidate,
            ]
        );
    }

    #[test]
    fn lost_track_ignores_stale_intensity_prediction() {
        let params = DetectionParameters::default();
        let mut state = locked_state(&params);
        state.detected = false;
        state.miss_count = 3;
        state.edge_intensity_prediction = 180.0;
        state.search_radius = 15.0;
        let mut segs = vec![arc_segment(0, [50.0, 50.0], 20.0, 60.0, 0.05)];
        let kept = filter_segments(&mut segs, &state, &params, [50.0, 50.0]);
        assert_eq!(kept, vec![0]);

        state.detected = true;
        let kept = filter_segments(&mut segs, &state, &params, [50.0, 50.0]);
        assert!(kept.is_empty());
        assert_eq!(segs[0].flag, SegmentFlag::Rejected);
    }
}
