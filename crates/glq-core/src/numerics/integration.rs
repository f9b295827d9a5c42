#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntegrationError {
    #[error("simpson integration requires at least 2 points, got {actual}")]
    InsufficientPoints { actual: usize },
    #[error("simpson input length mismatch: x={x}, y={y}")]
    LengthMismatch { x: usize, y: usize },
    #[error("abscissa must be strictly increasing, index {index} has {current} after {previous}")]
    NonIncreasingAbscissa {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("integrand must be finite at index {index}, got {value}")]
    NonFiniteValue { index: usize, value: f64 },
}

/// Composite Simpson rule on an irregular grid.
///
/// An odd point count is integrated pairwise, exact for quadratics. An even
/// point count integrates the leading odd run and closes the last interval
/// with the Cartwright correction, so quadratics stay exact. Two points fall
/// back to the trapezoid rule.
pub fn integrate_simpson(x: &[f64], y: &[f64]) -> Result<f64, IntegrationError> {
    validate_samples(x, y)?;

    let count = x.len();
    if count == 2 {
        return Ok(0.5 * (x[1] - x[0]) * (y[0] + y[1]));
    }

    let odd_end = if count % 2 == 1 { count } else { count - 1 };
    let mut integral = 0.0;
    let mut index = 0;
    while index + 2 < odd_end {
        integral += simpson_panel(
            [x[index], x[index + 1], x[index + 2]],
            [y[index], y[index + 1], y[index + 2]],
        );
        index += 2;
    }

    if odd_end != count {
        let h0 = x[count - 2] - x[count - 3];
        let h1 = x[count - 1] - x[count - 2];
        let alpha = (2.0 * h1 * h1 + 3.0 * h0 * h1) / (6.0 * (h0 + h1));
        let beta = (h1 * h1 + 3.0 * h0 * h1) / (6.0 * h0);
        let eta = h1 * h1 * h1 / (6.0 * h0 * (h0 + h1));
        integral += alpha * y[count - 1] + beta * y[count - 2] - eta * y[count - 3];
    }

    Ok(integral)
}

fn simpson_panel(x: [f64; 3], y: [f64; 3]) -> f64 {
    let h0 = x[1] - x[0];
    let h1 = x[2] - x[1];
    let h_sum = h0 + h1;
    let ratio = h0 / h1;
    h_sum / 6.0 * (y[0] * (2.0 - 1.0 / ratio) + y[1] * h_sum * h_sum / (h0 * h1) + y[2] * (2.0 - ratio))
}

fn validate_samples(x: &[f64], y: &[f64]) -> Result<(), IntegrationError> {
    if x.len() != y.len() {
        return Err(IntegrationError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(IntegrationError::InsufficientPoints { actual: x.len() });
    }

    for index in 1..x.len() {
        if x[index] <= x[index - 1] {
            return Err(IntegrationError::NonIncreasingAbscissa {
                index,
                previous: x[index - 1],
                current: x[index],
            });
        }
    }
    for (index, value) in y.iter().copied().enumerate() {
        if !value.is_finite() {
            return Err(IntegrationError::NonFiniteValue { index, value });
        }
    }

    Ok(())
}
