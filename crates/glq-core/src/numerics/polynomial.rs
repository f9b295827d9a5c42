use super::legendre::legendre_basis;
use super::linalg::{DenseMatrix, LeastSquaresError, solve_least_squares};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolynomialFitError {
    #[error("polynomial fit requires at least 1 sample, got {actual}")]
    InsufficientPoints { actual: usize },
    #[error("polynomial fit length mismatch: x={x}, y={y}")]
    LengthMismatch { x: usize, y: usize },
    #[error("polynomial fit domain [{lo}, {hi}] is empty or non-finite")]
    InvalidDomain { lo: f64, hi: f64 },
    #[error(transparent)]
    Solve(#[from] LeastSquaresError),
}

/// Polynomial stored as a Legendre series over its fitting domain, which keeps
/// high-degree fits well conditioned.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendreSeries {
    coefficients: Vec<f64>,
    lo: f64,
    hi: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialFit {
    pub series: LegendreSeries,
    /// Residual sum of squares as reported by the solver, absent when the
    /// system was square, underdetermined or rank deficient.
    pub residual: Option<f64>,
    pub rank: usize,
}

impl PolynomialFit {
    /// Solver residual, recomputed from the samples when the solver had none.
    pub fn residual_or_recompute(&self, x: &[f64], y: &[f64]) -> f64 {
        self.residual
            .unwrap_or_else(|| self.series.sum_squared_error(x, y))
    }
}

impl LegendreSeries {
    pub fn new(coefficients: Vec<f64>, lo: f64, hi: f64) -> Self {
        Self {
            coefficients,
            lo,
            hi,
        }
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.lo, self.hi)
    }

    fn to_unit(&self, x: f64) -> f64 {
        if self.hi == self.lo {
            0.0
        } else {
            (2.0 * x - self.lo - self.hi) / (self.hi - self.lo)
        }
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let t = self.to_unit(x);
        legendre_basis(self.degree(), t)
            .iter()
            .zip(&self.coefficients)
            .map(|(basis, coefficient)| basis * coefficient)
            .sum()
    }

    /// Exact integral over the fitting domain; only `P_0` survives.
    pub fn domain_integral(&self) -> f64 {
        self.coefficients.first().copied().unwrap_or(0.0) * (self.hi - self.lo)
    }

    pub fn sum_squared_error(&self, x: &[f64], y: &[f64]) -> f64 {
        x.iter()
            .zip(y)
            .map(|(xi, yi)| {
                let delta = self.evaluate(*xi) - yi;
                delta * delta
            })
            .sum()
    }
}

/// Least-squares fit of a degree-`degree` polynomial over the samples' span.
pub fn fit_polynomial(x: &[f64], y: &[f64], degree: usize) -> Result<PolynomialFit, PolynomialFitError> {
    if x.len() != y.len() {
        return Err(PolynomialFitError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    let Some((&lo, &hi)) = x.first().zip(x.last()) else {
        return Err(PolynomialFitError::InsufficientPoints { actual: 0 });
    };
    if !lo.is_finite() || !hi.is_finite() || hi < lo {
        return Err(PolynomialFitError::InvalidDomain { lo, hi });
    }

    let mut series = LegendreSeries::new(Vec::new(), lo, hi);
    let basis_rows: Vec<Vec<f64>> = x
        .iter()
        .map(|value| legendre_basis(degree, series.to_unit(*value)))
        .collect();
    let design = DenseMatrix::from_fn(x.len(), degree + 1, |row, col| basis_rows[row][col]);
    let solution = solve_least_squares(&design, y)?;
    series.coefficients = solution.coefficients;

    Ok(PolynomialFit {
        series,
        residual: solution.residual,
        rank: solution.rank,
    })
}
