const BISECTION_ITERATIONS: usize = 200;
const ROOT_MERGE_RELATIVE: f64 = 1.0e-12;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpolationError {
    #[error("interpolation requires at least 2 points, got {actual}")]
    InsufficientPoints { actual: usize },
    #[error("interpolation input length mismatch: x={x}, y={y}")]
    LengthMismatch { x: usize, y: usize },
    #[error("interpolation knots must be strictly increasing, index {index} has {current} after {previous}")]
    NonIncreasingKnots {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("interpolation value must be finite at index {index}, got {value}")]
    NonFiniteValue { index: usize, value: f64 },
}

/// Piecewise cubic in local form: on `[x_i, x_{i+1}]` the value is
/// `c0 + c1 s + c2 s^2 + c3 s^3` with `s = x - x_i`.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseCubic {
    breakpoints: Vec<f64>,
    coefficients: Vec<[f64; 4]>,
}

impl PiecewiseCubic {
    pub fn breakpoints(&self) -> &[f64] {
        &self.breakpoints
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.breakpoints[0], self.breakpoints[self.breakpoints.len() - 1])
    }

    fn interval_index(&self, x: f64) -> usize {
        let last_interval = self.coefficients.len() - 1;
        self.breakpoints
            .partition_point(|knot| *knot <= x)
            .saturating_sub(1)
            .min(last_interval)
    }

    /// Evaluates the curve; points outside the knots use the end pieces.
    pub fn evaluate(&self, x: f64) -> f64 {
        let index = self.interval_index(x);
        horner(&self.coefficients[index], x - self.breakpoints[index])
    }

    pub fn evaluate_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|x| self.evaluate(*x)).collect()
    }

    pub fn derivative(&self) -> PiecewiseCubic {
        let coefficients = self
            .coefficients
            .iter()
            .map(|c| [c[1], 2.0 * c[2], 3.0 * c[3], 0.0])
            .collect();
        PiecewiseCubic {
            breakpoints: self.breakpoints.clone(),
            coefficients,
        }
    }

    pub fn nth_derivative(&self, order: usize) -> PiecewiseCubic {
        (0..order).fold(self.clone(), |curve, _| curve.derivative())
    }

    /// Definite integral over `[a, b]`; beyond the knots the end pieces are
    /// integrated, consistent with [`PiecewiseCubic::evaluate`].
    pub fn integrate(&self, a: f64, b: f64) -> f64 {
        if a > b {
            return -self.integrate(b, a);
        }

        let last_interval = self.coefficients.len() - 1;
        let mut total = 0.0;
        for (index, c) in self.coefficients.iter().enumerate() {
            let left = self.breakpoints[index];
            let lower = if index == 0 { f64::NEG_INFINITY } else { left };
            let upper = if index == last_interval {
                f64::INFINITY
            } else {
                self.breakpoints[index + 1]
            };
            let from = a.max(lower);
            let to = b.min(upper);
            if from < to {
                total += antiderivative(c, to - left) - antiderivative(c, from - left);
            }
        }
        total
    }

    /// Real roots inside the knot range, ascending. Intervals on which the
    /// curve vanishes identically contribute nothing.
    pub fn roots(&self) -> Vec<f64> {
        let mut roots: Vec<f64> = Vec::new();
        for (index, c) in self.coefficients.iter().enumerate() {
            let left = self.breakpoints[index];
            let width = self.breakpoints[index + 1] - left;
            if c.iter().all(|value| *value == 0.0) {
                continue;
            }
            for root in interval_roots(c, width) {
                roots.push(left + root);
            }
        }

        roots.sort_by(f64::total_cmp);
        let (lo, hi) = self.domain();
        let merge_distance = ROOT_MERGE_RELATIVE * (hi - lo).abs().max(f64::MIN_POSITIVE);
        roots.dedup_by(|next, kept| (*next - *kept).abs() <= merge_distance);
        roots
    }
}

/// Akima (1970) interpolant: slopes at each knot are weighted averages of
/// neighbouring secant slopes, which suppresses overshoot near outliers.
pub fn akima_interpolant(x: &[f64], y: &[f64]) -> Result<PiecewiseCubic, InterpolationError> {
    validate_knots(x, y)?;

    let count = x.len();
    let secants: Vec<f64> = (0..count - 1)
        .map(|i| (y[i + 1] - y[i]) / (x[i + 1] - x[i]))
        .collect();

    let slopes = if count == 2 {
        vec![secants[0]; 2]
    } else {
        knot_slopes(&secants)
    };

    let coefficients = (0..count - 1)
        .map(|i| {
            let dx = x[i + 1] - x[i];
            let m = secants[i];
            let c2 = (3.0 * m - 2.0 * slopes[i] - slopes[i + 1]) / dx;
            let c3 = (slopes[i] + slopes[i + 1] - 2.0 * m) / (dx * dx);
            [y[i], slopes[i], c2, c3]
        })
        .collect();

    Ok(PiecewiseCubic {
        breakpoints: x.to_vec(),
        coefficients,
    })
}

fn knot_slopes(secants: &[f64]) -> Vec<f64> {
    let n = secants.len();
    // Two ghost secants on each side by linear extrapolation.
    let mut m = Vec::with_capacity(n + 4);
    let first_ghost = 2.0 * secants[0] - secants[1];
    m.push(2.0 * first_ghost - secants[0]);
    m.push(first_ghost);
    m.extend_from_slice(secants);
    let last_ghost = 2.0 * secants[n - 1] - secants[n - 2];
    m.push(last_ghost);
    m.push(2.0 * last_ghost - secants[n - 1]);

    let dm: Vec<f64> = m.windows(2).map(|pair| (pair[1] - pair[0]).abs()).collect();
    let weight_floor = 1.0e-9 * dm.iter().copied().fold(0.0_f64, f64::max);

    (0..=n)
        .map(|knot| {
            let f1 = dm[knot + 2];
            let f2 = dm[knot];
            let before = m[knot + 1];
            let after = m[knot + 2];
            if f1 + f2 > weight_floor && f1 + f2 > 0.0 {
                (f1 * before + f2 * after) / (f1 + f2)
            } else {
                0.5 * (before + after)
            }
        })
        .collect()
}

fn validate_knots(x: &[f64], y: &[f64]) -> Result<(), InterpolationError> {
    if x.len() != y.len() {
        return Err(InterpolationError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(InterpolationError::InsufficientPoints { actual: x.len() });
    }
    for index in 1..x.len() {
        if x[index] <= x[index - 1] {
            return Err(InterpolationError::NonIncreasingKnots {
                index,
                previous: x[index - 1],
                current: x[index],
            });
        }
    }
    for (index, value) in y.iter().copied().enumerate() {
        if !value.is_finite() {
            return Err(InterpolationError::NonFiniteValue { index, value });
        }
    }
    Ok(())
}

fn horner(c: &[f64; 4], s: f64) -> f64 {
    ((c[3] * s + c[2]) * s + c[1]) * s + c[0]
}

fn antiderivative(c: &[f64; 4], s: f64) -> f64 {
    (((c[3] / 4.0 * s + c[2] / 3.0) * s + c[1] / 2.0) * s + c[0]) * s
}

/// Roots of one cubic piece on `[0, width]`: split at the stationary points
/// so every sub-interval is monotone, then bisect each sign change.
fn interval_roots(c: &[f64; 4], width: f64) -> Vec<f64> {
    let mut cuts = vec![0.0];
    let mut stationary = quadratic_roots(3.0 * c[3], 2.0 * c[2], c[1]);
    stationary.retain(|s| *s > 0.0 && *s < width);
    stationary.sort_by(f64::total_cmp);
    cuts.extend(stationary);
    cuts.push(width);

    let mut roots = Vec::new();
    for pair in cuts.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let fa = horner(c, a);
        let fb = horner(c, b);
        if fa == 0.0 {
            roots.push(a);
        } else if fa * fb < 0.0 {
            roots.push(bisect(c, a, b, fa));
        }
    }
    if horner(c, width) == 0.0 {
        roots.push(width);
    }
    roots
}

fn bisect(c: &[f64; 4], mut a: f64, mut b: f64, mut fa: f64) -> f64 {
    for _ in 0..BISECTION_ITERATIONS {
        let mid = 0.5 * (a + b);
        if mid <= a || mid >= b {
            break;
        }
        let fm = horner(c, mid);
        if fm == 0.0 {
            return mid;
        }
        if fa * fm < 0.0 {
            b = mid;
        } else {
            a = mid;
            fa = fm;
        }
    }
    0.5 * (a + b)
}

fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a == 0.0 {
        if b == 0.0 {
            return Vec::new();
        }
        return vec![-c / b];
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return Vec::new();
    }
    let sqrt_disc = discriminant.sqrt();
    let q = -0.5 * (b + b.signum() * sqrt_disc);
    if q == 0.0 {
        return vec![0.0];
    }
    vec![q / a, c / q]
}
