//! Ellipse / conic fitting primitives.
//!
//! - Direct least-squares conic fit (Fitzgibbon et al., "Direct Least Square
//!   Fitting of Ellipses", 1999).
//! - Conversion between general conic coefficients and geometric ellipse
//!   parameters, plus the derived measurements the tracker reports
//!   (circumference, aspect ratio, equivalent radius).
//! - Sampson residuals used as the fit error.

mod eigen;
mod fit;
mod types;

pub use fit::{fit_conic_direct, fit_ellipse, rms_sampson_distance, ConicFit};
pub use types::{ConicCoeffs, Ellipse, FitFailure};
