//! Conic and ellipse types with conversions and derived geometry.

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

// ── Fit failures ───────────────────────────────────────────────────────────

/// Reasons a direct conic fit produced no usable ellipse.
///
/// These are expected per-combination outcomes, not caller errors: the
/// fitter skips the combination and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitFailure {
    /// Fewer than six points were supplied.
    TooFewPoints {
        /// Number of points provided.
        got: usize,
    },
    /// The scatter or constraint system is numerically singular
    /// (collinear or coincident points).
    Singular,
    /// The solution is a parabola, hyperbola or imaginary ellipse.
    NotAnEllipse,
}

impl std::fmt::Display for FitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewPoints { got } => write!(f, "too few points: need 6, got {}", got),
            Self::Singular => write!(f, "singular conic system"),
            Self::NotAnEllipse => write!(f, "fitted conic is not an ellipse"),
        }
    }
}

impl std::error::Error for FitFailure {}

// ── Types ──────────────────────────────────────────────────────────────────

/// General conic: A x² + B xy + C y² + D x + E y + F = 0
/// Stored as [A, B, C, D, E, F].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConicCoeffs(pub [f64; 6]);

/// Geometric ellipse parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    /// Center x.
    pub cx: f64,
    /// Center y.
    pub cy: f64,
    /// Semi-major axis length.
    pub a: f64,
    /// Semi-minor axis length.
    pub b: f64,
    /// Rotation angle of the major axis from +x, in radians (−π/2, π/2].
    pub angle: f64,
}

impl ConicCoeffs {
    /// Algebraic distance of a point (x, y) to this conic.
    pub fn algebraic_distance(&self, x: f64, y: f64) -> f64 {
        let [a, b, c, d, e, f] = self.0;
        a * x * x + b * x * y + c * y * y + d * x + e * y + f
    }

    /// Discriminant test B² − 4AC < 0.
    pub fn is_ellipse(&self) -> bool {
        let [a, b, c, ..] = self.0;
        b * b - 4.0 * a * c < 0.0
    }

    /// Geometric parameters, or `None` for anything but a real,
    /// non-degenerate ellipse.
    ///
    /// The quadratic part `Q` is diagonalized; the center solves
    /// `Q·c = −[D, E]/2` and each semi-axis is `√(−F(c)/λ)`.
    pub fn to_ellipse(self) -> Option<Ellipse> {
        if !self.is_ellipse() {
            return None;
        }
        let [a, b, c, d, e, _] = self.0;
        let quad = Matrix2::new(a, b / 2.0, b / 2.0, c);
        let center = quad.try_inverse()? * Vector2::new(-d / 2.0, -e / 2.0);
        let value_at_center = self.algebraic_distance(center.x, center.y);
        if value_at_center.abs() < 1e-15 {
            return None;
        }

        let eig = quad.symmetric_eigen();
        let axes_sq = eig.eigenvalues.map(|lambda| -value_at_center / lambda);
        if axes_sq.iter().any(|&s| s.is_nan() || s <= 0.0) {
            return None;
        }
        let major = if axes_sq[0] >= axes_sq[1] { 0 } else { 1 };
        let minor = 1 - major;
        let dir = eig.eigenvectors.column(major);

        Some(Ellipse {
            cx: center.x,
            cy: center.y,
            a: axes_sq[major].sqrt(),
            b: axes_sq[minor].sqrt(),
            angle: wrap_half_turn(dir[1].atan2(dir[0])),
        })
    }

    /// Sampson (first-order geometric) distance of a point to the conic.
    pub fn sampson_distance(&self, x: f64, y: f64) -> f64 {
        let [ca, cb, cc, cd, ce, _] = self.0;
        let alg = self.algebraic_distance(x, y);
        let gx = 2.0 * ca * x + cb * y + cd;
        let gy = cb * x + 2.0 * cc * y + ce;
        let grad_sq = gx * gx + gy * gy;
        if grad_sq < 1e-30 {
            return alg.abs();
        }
        alg.abs() / grad_sq.sqrt()
    }
}

impl Ellipse {
    /// Positive, finite semi-axes and finite pose.
    pub fn is_valid(&self) -> bool {
        self.a > 0.0
            && self.b > 0.0
            && self.a.is_finite()
            && self.b.is_finite()
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.angle.is_finite()
    }

    /// Minor over major axis, in (0, 1].
    pub fn aspect_ratio(&self) -> f64 {
        let (major, minor) = if self.a >= self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        };
        minor / major
    }

    /// Perimeter via Ramanujan's second approximation.
    pub fn circumference(&self) -> f64 {
        let sum = self.a + self.b;
        if sum <= 0.0 {
            return 0.0;
        }
        let h = ((self.a - self.b) / sum).powi(2);
        std::f64::consts::PI * sum * (1.0 + 3.0 * h / (10.0 + (4.0 - 3.0 * h).sqrt()))
    }

    /// Radius of the circle with the same circumference.
    pub fn equivalent_radius(&self) -> f64 {
        self.circumference() / (2.0 * std::f64::consts::PI)
    }

    /// Half-extents of the axis-aligned bounding box.
    pub fn half_extents(&self) -> [f64; 2] {
        let (s, c) = self.angle.sin_cos();
        let hx = ((self.a * c).powi(2) + (self.b * s).powi(2)).sqrt();
        let hy = ((self.a * s).powi(2) + (self.b * c).powi(2)).sqrt();
        [hx, hy]
    }

    /// Conic coefficients scaled so the quadratic form is 1 on the boundary.
    pub fn to_conic(self) -> ConicCoeffs {
        let (s, c) = self.angle.sin_cos();
        let (ia2, ib2) = (self.a.powi(-2), self.b.powi(-2));
        let qa = c * c * ia2 + s * s * ib2;
        let qb = 2.0 * s * c * (ia2 - ib2);
        let qc = s * s * ia2 + c * c * ib2;
        let (x0, y0) = (self.cx, self.cy);
        ConicCoeffs([
            qa,
            qb,
            qc,
            -(2.0 * qa * x0 + qb * y0),
            -(qb * x0 + 2.0 * qc * y0),
            qa * x0 * x0 + qb * x0 * y0 + qc * y0 * y0 - 1.0,
        ])
    }

    /// Sample `n` points on the ellipse boundary.
    pub fn sample_points(&self, n: usize) -> Vec<[f64; 2]> {
        let (sin_a, cos_a) = self.angle.sin_cos();
        (0..n)
            .map(|i| {
                let t = 2.0 * std::f64::consts::PI * (i as f64) / (n as f64);
                let px = self.a * t.cos();
                let py = self.b * t.sin();
                [
                    self.cx + cos_a * px - sin_a * py,
                    self.cy + sin_a * px + cos_a * py,
                ]
            })
            .collect()
    }

    /// Sampson distance from a point to the ellipse boundary.
    pub fn sampson_distance(&self, x: f64, y: f64) -> f64 {
        self.to_conic().sampson_distance(x, y)
    }
}

/// Fold an axis direction into (−π/2, π/2].
fn wrap_half_turn(angle: f64) -> f64 {
    use std::f64::consts::{FRAC_PI_2, PI};
    let wrapped = angle.rem_euclid(PI);
    if wrapped > FRAC_PI_2 {
        wrapped - PI
    } else {
        wrapped
    }
}
