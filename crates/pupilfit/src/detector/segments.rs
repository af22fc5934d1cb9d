//! Edge segment tracing and per-segment measurements.
//!
//! Edge pixels are walked into ordered chains, chains are cut at sharp
//! corners, and each surviving chain is annotated with curvature and
//! gradient statistics.

use image::GrayImage;

use super::edges::GradientImage;

/// Chains with fewer points than this are not worth fitting.
pub const MIN_SEGMENT_LENGTH: usize = 12;
/// Half-window (points) of the corner detector.
const SPLIT_WINDOW: usize = 5;
/// Turning angle above which a chain is cut.
const SPLIT_ANGLE_RAD: f64 = std::f64::consts::FRAC_PI_3;
/// Half-window (points) of the curvature estimate.
const CURVATURE_WINDOW: usize = 4;

/// 4-neighbours first so staircases are walked pixel by pixel.
const NEIGHBOURS: [(i64, i64); 8] = [
    (1, 0),
    (0, 1),
    (-1, 0),
    (0, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
    (1, -1),
];

/// Role of a segment after filtering and fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentFlag {
    Rejected,
    Candidate,
    /// Contributed to the accepted ellipse.
    Fitted,
}

/// One connected boundary component of the edge map.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EdgeSegment {
    /// Stable identity within the frame.
    pub index: usize,
    /// Ordered AOI pixel coordinates.
    pub points: Vec<[u32; 2]>,
    /// Point count.
    pub length: usize,
    /// Intensity-weighted span: `length · intensity / 255`.
    pub size: f64,
    /// Curvature statistics (rad/px), signed so the dominant bend is positive.
    pub curvature_max: f64,
    pub curvature_min: f64,
    pub curvature_avg: f64,
    /// Mean gradient contrast along the segment (grey levels).
    pub intensity: f64,
    /// Mean distance of the points from the reference center (px).
    pub distance: f64,
    pub flag: SegmentFlag,
}

impl EdgeSegment {
    /// Points as floating-point coordinates for fitting.
    pub fn points_f64(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        self.points.iter().map(|&[x, y]| [x as f64, y as f64])
    }
}

/// Trace, split and measure all segments of an edge map.
pub(crate) fn extract_segments(edges: &GrayImage, gradient: &GradientImage) -> Vec<EdgeSegment> {
    trace_chains(edges)
        .into_iter()
        .flat_map(split_at_corners)
        .filter(|c| c.len() >= MIN_SEGMENT_LENGTH)
        .enumerate()
        .map(|(index, points)| measure(index, points, gradient))
        .collect()
}

fn trace_chains(edges: &GrayImage) -> Vec<Vec<[u32; 2]>> {
    let (w, h) = edges.dimensions();
    let mut visited = vec![false; w as usize * h as usize];
    let mut chains = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = y as usize * w as usize + x as usize;
            if visited[idx] || edges.get_pixel(x, y)[0] == 0 {
                continue;
            }
            visited[idx] = true;
            let forward = walk(edges, &mut visited, [x, y]);
            let backward = walk(edges, &mut visited, [x, y]);

            let mut chain: Vec<[u32; 2]> = backward.into_iter().rev().collect();
            chain.push([x, y]);
            chain.extend(forward);
            chains.push(chain);
        }
    }
    chains
}

fn walk(edges: &GrayImage, visited: &mut [bool], start: [u32; 2]) -> Vec<[u32; 2]> {
    let (w, h) = edges.dimensions();
    let mut path = Vec::new();
    let mut cur = start;
    loop {
        let next = NEIGHBOURS.iter().find_map(|&(dx, dy)| {
            let nx = cur[0] as i64 + dx;
            let ny = cur[1] as i64 + dy;
            if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                return None;
            }
            let (nx, ny) = (nx as u32, ny as u32);
            let idx = ny as usize * w as usize + nx as usize;
            (!visited[idx] && edges.get_pixel(nx, ny)[0] > 0).then_some((idx, [nx, ny]))
        });
        match next {
            Some((idx, p)) => {
                visited[idx] = true;
                path.push(p);
                cur = p;
            }
            None => break,
        }
    }
    path
}

/// Signed angle between the chords `a→b` and `b→c`, with the mean chord length.
fn turning(a: [u32; 2], b: [u32; 2], c: [u32; 2]) -> (f64, f64) {
    let d1 = [b[0] as f64 - a[0] as f64, b[1] as f64 - a[1] as f64];
    let d2 = [c[0] as f64 - b[0] as f64, c[1] as f64 - b[1] as f64];
    let cross = d1[0] * d2[1] - d1[1] * d2[0];
    let dot = d1[0] * d2[0] + d1[1] * d2[1];
    let chord = 0.5 * (d1[0].hypot(d1[1]) + d2[0].hypot(d2[1]));
    (cross.atan2(dot), chord)
}

fn split_at_corners(chain: Vec<[u32; 2]>) -> Vec<Vec<[u32; 2]>> {
    let k = SPLIT_WINDOW;
    let n = chain.len();
    if n < 2 * k + 1 {
        return vec![chain];
    }

    let mut cuts = Vec::new();
    let mut run_best: Option<(usize, f64)> = None;
    for i in k..n - k {
        let angle = turning(chain[i - k], chain[i], chain[i + k]).0.abs();
        if angle > SPLIT_ANGLE_RAD {
            if run_best.map_or(true, |(_, a)| angle > a) {
                run_best = Some((i, angle));
            }
        } else if let Some((idx, _)) = run_best.take() {
            cuts.push(idx);
        }
    }
    if let Some((idx, _)) = run_best {
        cuts.push(idx);
    }
    if cuts.is_empty() {
        return vec![chain];
    }

    let mut pieces = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        pieces.push(chain[start..cut].to_vec());
        start = cut;
    }
    pieces.push(chain[start..].to_vec());
    pieces
}

fn measure(index: usize, points: Vec<[u32; 2]>, gradient: &GradientImage) -> EdgeSegment {
    let k = CURVATURE_WINDOW;
    let n = points.len();

    let mut curvatures: Vec<f64> = (k..n.saturating_sub(k))
        .map(|i| {
            let (angle, chord) = turning(points[i - k], points[i], points[i + k]);
            if chord > 0.0 {
                angle / chord
            } else {
                0.0
            }
        })
        .collect();
    if curvatures.iter().sum::<f64>() < 0.0 {
        curvatures.iter_mut().for_each(|c| *c = -*c);
    }
    let (curvature_min, curvature_max, curvature_avg) = if curvatures.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let min = curvatures.iter().copied().fold(f64::INFINITY, f64::min);
        let max = curvatures.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = curvatures.iter().sum::<f64>() / curvatures.len() as f64;
        (min, max, avg)
    };

    let intensity = if n == 0 {
        0.0
    } else {
        points
            .iter()
            .map(|&[x, y]| gradient.get_pixel(x, y)[0] as f64)
            .sum::<f64>()
            / n as f64
    };

    EdgeSegment {
        index,
        length: n,
        size: n as f64 * intensity / 255.0,
        points,
        curvature_max,
        curvature_min,
        curvature_avg,
        intensity,
        distance: 0.0,
        flag: SegmentFlag::Candidate,
    }
}
