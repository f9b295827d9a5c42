use faer::Mat;

pub type DenseMatrix = Mat<f64>;

const RANK_RELATIVE_EPSILON: f64 = 1.0e-13;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeastSquaresError {
    #[error("least-squares solve requires a non-empty matrix")]
    EmptyMatrix,
    #[error("right-hand side length mismatch: expected {expected}, got {actual}")]
    RhsLengthMismatch { expected: usize, actual: usize },
    #[error("least-squares input contains a non-finite value at row {row}")]
    NonFiniteInput { row: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresSolution {
    pub coefficients: Vec<f64>,
    /// Sum of squared residuals; only reported for full-rank, strictly
    /// overdetermined systems.
    pub residual: Option<f64>,
    pub rank: usize,
}

/// Minimizes `|A x - b|_2` with Householder QR. Columns whose pivot falls
/// below the rank tolerance get a zero coefficient.
pub fn solve_least_squares(
    design: &DenseMatrix,
    rhs: &[f64],
) -> Result<LeastSquaresSolution, LeastSquaresError> {
    let rows = design.nrows();
    let cols = design.ncols();
    if rows == 0 || cols == 0 {
        return Err(LeastSquaresError::EmptyMatrix);
    }
    if rhs.len() != rows {
        return Err(LeastSquaresError::RhsLengthMismatch {
            expected: rows,
            actual: rhs.len(),
        });
    }
    for row in 0..rows {
        let finite_row = (0..cols).all(|col| design[(row, col)].is_finite());
        if !finite_row || !rhs[row].is_finite() {
            return Err(LeastSquaresError::NonFiniteInput { row });
        }
    }

    let mut r = design.clone();
    let mut qtb = rhs.to_vec();
    let steps = rows.min(cols);
    let mut reflector = vec![0.0; rows];

    for k in 0..steps {
        let column_norm = (k..rows).map(|row| r[(row, k)] * r[(row, k)]).sum::<f64>().sqrt();
        if column_norm == 0.0 {
            continue;
        }

        let alpha = if r[(k, k)] > 0.0 {
            -column_norm
        } else {
            column_norm
        };
        for row in k..rows {
            reflector[row] = r[(row, k)];
        }
        reflector[k] -= alpha;
        let reflector_norm_sq: f64 = (k..rows).map(|row| reflector[row] * reflector[row]).sum();
        if reflector_norm_sq == 0.0 {
            continue;
        }

        for col in k..cols {
            let projection: f64 = (k..rows).map(|row| reflector[row] * r[(row, col)]).sum();
            let scale = 2.0 * projection / reflector_norm_sq;
            for row in k..rows {
                let updated = r[(row, col)] - scale * reflector[row];
                r[(row, col)] = updated;
            }
        }
        let projection: f64 = (k..rows).map(|row| reflector[row] * qtb[row]).sum();
        let scale = 2.0 * projection / reflector_norm_sq;
        for row in k..rows {
            qtb[row] -= scale * reflector[row];
        }
    }

    let max_pivot = (0..steps).map(|k| r[(k, k)].abs()).fold(0.0_f64, f64::max);
    let pivot_floor = max_pivot * RANK_RELATIVE_EPSILON * rows.max(cols) as f64;

    let mut coefficients = vec![0.0; cols];
    let mut rank = 0;
    for k in (0..steps).rev() {
        let pivot = r[(k, k)];
        if pivot.abs() <= pivot_floor || pivot == 0.0 {
            continue;
        }
        rank += 1;
        let mut value = qtb[k];
        for col in (k + 1)..cols {
            value -= r[(k, col)] * coefficients[col];
        }
        coefficients[k] = value / pivot;
    }

    let residual = (rank == cols && rows > cols)
        .then(|| qtb[cols..].iter().map(|value| value * value).sum::<f64>());

    Ok(LeastSquaresSolution {
        coefficients,
        residual,
        rank,
    })
}

#[cfg(test)]
mod tests {
    use super::{DenseMatrix, LeastSquaresError, solve_least_squares};

    fn design_from_rows(rows: &[&[f64]]) -> DenseMatrix {
        DenseMatrix::from_fn(rows.len(), rows[0].len(), |row, col| rows[row][col])
    }

    #[test]
    fn exact_linear_data_has_zero_residual() {
        let xs: [f64; 5] = [0.0, 1.0, 2.0, 3.0, 4.0];
        let design = DenseMatrix::from_fn(xs.len(), 2, |row, col| xs[row].powi(col as i32));
        let rhs: Vec<f64> = xs.iter().map(|x| 1.5 - 0.25 * x).collect();

        let solution = solve_least_squares(&design, &rhs).expect("solve");
        assert_eq!(solution.rank, 2);
        assert!((solution.coefficients[0] - 1.5).abs() <= 1.0e-12);
        assert!((solution.coefficients[1] + 0.25).abs() <= 1.0e-12);
        assert!(solution.residual.expect("residual") <= 1.0e-24);
    }

    #[test]
    fn noisy_data_reports_residual_sum_of_squares() {
        let design = design_from_rows(&[&[1.0, 0.0], &[1.0, 1.0], &[1.0, 2.0]]);
        let rhs = [0.0, 2.0, 1.0];

        let solution = solve_least_squares(&design, &rhs).expect("solve");
        // Best fit line through (0,0), (1,2), (2,1) is y = 0.5 + 0.5 x.
        assert!((solution.coefficients[0] - 0.5).abs() <= 1.0e-12);
        assert!((solution.coefficients[1] - 0.5).abs() <= 1.0e-12);
        let expected_residual = 0.25 + 1.0 + 0.25;
        assert!((solution.residual.expect("residual") - expected_residual).abs() <= 1.0e-12);
    }

    #[test]
    fn square_and_rank_deficient_systems_report_no_residual() {
        let square = design_from_rows(&[&[2.0, 0.0], &[0.0, 4.0]]);
        let solution = solve_least_squares(&square, &[2.0, 2.0]).expect("solve");
        assert_eq!(solution.residual, None);
        assert!((solution.coefficients[1] - 0.5).abs() <= 1.0e-15);

        let deficient = design_from_rows(&[&[1.0, 2.0], &[2.0, 4.0], &[3.0, 6.0]]);
        let solution = solve_least_squares(&deficient, &[1.0, 2.0, 3.0]).expect("solve");
        assert_eq!(solution.rank, 1);
        assert_eq!(solution.residual, None);
    }

    #[test]
    fn rejects_mismatched_rhs() {
        let design = design_from_rows(&[&[1.0], &[1.0]]);
        let error = solve_least_squares(&design, &[1.0]).expect_err("length mismatch");
        assert_eq!(
            error,
            LeastSquaresError::RhsLengthMismatch {
                expected: 2,
                actual: 1,
            }
        );
    }
}
