pub mod akima;
pub mod integration;
pub mod legendre;
pub mod linalg;
pub mod polynomial;
pub mod savgol;

pub use akima::{InterpolationError, PiecewiseCubic, akima_interpolant};
pub use integration::{IntegrationError, integrate_simpson};
pub use legendre::{
    GaussLegendreError, GaussLegendreRule, gauss_legendre, legendre_and_derivative,
    legendre_basis, node_count_for_degree,
};
pub use linalg::{DenseMatrix, LeastSquaresError, LeastSquaresSolution, solve_least_squares};
pub use polynomial::{LegendreSeries, PolynomialFit, PolynomialFitError, fit_polynomial};
pub use savgol::{SavgolError, savgol_filter};

/// Smallest gap between neighbours of an ascending sequence.
pub fn min_spacing(sorted: &[f64]) -> Option<f64> {
    sorted
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .min_by(f64::total_cmp)
}

/// Relative difference `|a - b| / |reference|`, infinite for a zero reference
/// unless both values agree.
pub fn relative_difference(a: f64, b: f64, reference: f64) -> f64 {
    let delta = (a - b).abs();
    if delta == 0.0 {
        0.0
    } else if reference == 0.0 {
        f64::INFINITY
    } else {
        delta / reference.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::{min_spacing, relative_difference};

    #[test]
    fn spacing_and_relative_difference_helpers() {
        assert_eq!(min_spacing(&[1.0, 4.0, 4.5, 7.0]), Some(0.5));
        assert_eq!(min_spacing(&[1.0]), None);
        assert!((relative_difference(1.01, 1.0, 2.0) - 0.005).abs() <= 1.0e-15);
        assert_eq!(relative_difference(0.0, 0.0, 0.0), 0.0);
        assert!(relative_difference(1.0, 0.0, 0.0).is_infinite());
    }
}
