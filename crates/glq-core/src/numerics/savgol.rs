use super::legendre::legendre_basis;
use super::linalg::{DenseMatrix, LeastSquaresError, solve_least_squares};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SavgolError {
    #[error("savitzky-golay window must be odd and >= 1, got {window}")]
    InvalidWindow { window: usize },
    #[error("savitzky-golay polynomial degree {degree} must be smaller than the window {window}")]
    DegreeTooLarge { degree: usize, window: usize },
    #[error("savitzky-golay input must be finite, index {index} got {value}")]
    NonFiniteValue { index: usize, value: f64 },
    #[error(transparent)]
    Solve(#[from] LeastSquaresError),
}

/// Savitzky-Golay smoothing with `interp` edge handling: the first and last
/// half-window are evaluated from the polynomial fitted to the first and last
/// full window. A window longer than the data shrinks to the longest odd
/// length that still exceeds `degree`; data too short for that is returned
/// unchanged.
pub fn savgol_filter(values: &[f64], window: usize, degree: usize) -> Result<Vec<f64>, SavgolError> {
    if window == 0 || window % 2 == 0 {
        return Err(SavgolError::InvalidWindow { window });
    }
    if degree >= window {
        return Err(SavgolError::DegreeTooLarge { degree, window });
    }
    for (index, value) in values.iter().copied().enumerate() {
        if !value.is_finite() {
            return Err(SavgolError::NonFiniteValue { index, value });
        }
    }

    if values.is_empty() {
        return Ok(Vec::new());
    }
    let mut window = window.min(values.len());
    if window % 2 == 0 {
        window -= 1;
    }
    if window <= degree || window < 3 {
        return Ok(values.to_vec());
    }

    let kernel = SavgolKernel::new(window, degree)?;
    let half = window / 2;
    let count = values.len();
    let center = kernel.weights_at(0);
    let mut smoothed = vec![0.0; count];

    for index in half..(count - half) {
        smoothed[index] = dot(&center, &values[index - half..index + half + 1]);
    }

    let head = &values[..window];
    let tail = &values[count - window..];
    for offset in 0..half {
        let weights = kernel.weights_at(offset as isize - half as isize);
        smoothed[offset] = dot(&weights, head);

        let weights = kernel.weights_at((1 + offset) as isize);
        smoothed[count - half + offset] = dot(&weights, tail);
    }

    Ok(smoothed)
}

/// Per-sample least-squares coefficients of a window: row `j` holds the
/// Legendre coefficients of the fit to the `j`-th unit impulse.
struct SavgolKernel {
    half: usize,
    degree: usize,
    impulse_coefficients: Vec<Vec<f64>>,
}

impl SavgolKernel {
    fn new(window: usize, degree: usize) -> Result<Self, SavgolError> {
        let half = window / 2;
        let basis_rows: Vec<Vec<f64>> = (0..window)
            .map(|row| legendre_basis(degree, unit_offset(row as isize - half as isize, half)))
            .collect();
        let design = DenseMatrix::from_fn(window, degree + 1, |row, col| basis_rows[row][col]);

        let mut impulse = vec![0.0; window];
        let mut impulse_coefficients = Vec::with_capacity(window);
        for sample in 0..window {
            impulse.fill(0.0);
            impulse[sample] = 1.0;
            impulse_coefficients.push(solve_least_squares(&design, &impulse)?.coefficients);
        }

        Ok(Self {
            half,
            degree,
            impulse_coefficients,
        })
    }

    /// Weights evaluating the window fit at `offset` samples from its center.
    fn weights_at(&self, offset: isize) -> Vec<f64> {
        let basis = legendre_basis(self.degree, unit_offset(offset, self.half));
        self.impulse_coefficients
            .iter()
            .map(|coefficients| dot(coefficients, &basis))
            .collect()
    }
}

fn unit_offset(offset: isize, half: usize) -> f64 {
    offset as f64 / half as f64
}

fn dot(left: &[f64], right: &[f64]) -> f64 {
    left.iter().zip(right).map(|(a, b)| a * b).sum()
}
