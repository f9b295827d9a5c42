use std::f64::consts::PI;

const NEWTON_TOLERANCE: f64 = 1.0e-15;
const NEWTON_MAX_ITERATIONS: usize = 100;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GaussLegendreError {
    #[error("gauss-legendre rule requires at least 1 node, got {actual}")]
    InvalidNodeCount { actual: usize },
    #[error("newton iteration for node {index} of a {count}-point rule did not converge")]
    NodeDidNotConverge { index: usize, count: usize },
}

/// Canonical Gauss-Legendre rule on `[-1, 1]`, nodes ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussLegendreRule {
    pub nodes: Vec<f64>,
    pub weights: Vec<f64>,
}

impl GaussLegendreRule {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Affine map of the rule onto `[lo, hi]`.
    pub fn mapped(&self, lo: f64, hi: f64) -> (Vec<f64>, Vec<f64>) {
        let half_width = 0.5 * (hi - lo);
        let midpoint = 0.5 * (hi + lo);
        let nodes = self
            .nodes
            .iter()
            .map(|node| half_width * node + midpoint)
            .collect();
        let weights = self.weights.iter().map(|weight| half_width * weight).collect();
        (nodes, weights)
    }
}

/// Node count of a Gauss-Legendre rule used to integrate a polynomial of
/// `degree` exactly: `ceil((degree + 2) / 2)`.
pub fn node_count_for_degree(degree: usize) -> usize {
    (degree + 2).div_ceil(2)
}

pub fn gauss_legendre(count: usize) -> Result<GaussLegendreRule, GaussLegendreError> {
    if count == 0 {
        return Err(GaussLegendreError::InvalidNodeCount { actual: count });
    }

    let mut nodes = Vec::with_capacity(count);
    let mut weights = Vec::with_capacity(count);
    let order = count as f64;

    for index in 0..count {
        let mut x = (PI * (index as f64 + 0.75) / (order + 0.5)).cos();
        let mut converged = false;
        for _ in 0..NEWTON_MAX_ITERATIONS {
            let (value, derivative) = legendre_and_derivative(count, x);
            let step = value / derivative;
            x -= step;
            if step.abs() <= NEWTON_TOLERANCE {
                converged = true;
                break;
            }
        }
        if !converged {
            return Err(GaussLegendreError::NodeDidNotConverge { index, count });
        }

        let (_, derivative) = legendre_and_derivative(count, x);
        nodes.push(x);
        weights.push(2.0 / ((1.0 - x * x) * derivative * derivative));
    }

    nodes.reverse();
    weights.reverse();
    Ok(GaussLegendreRule { nodes, weights })
}

/// `P_n(x)` and `P_n'(x)` from the three-term recurrence.
pub fn legendre_and_derivative(degree: usize, x: f64) -> (f64, f64) {
    if degree == 0 {
        return (1.0, 0.0);
    }

    let mut previous = 1.0;
    let mut current = x;
    for n in 2..=degree {
        let n = n as f64;
        let next = ((2.0 * n - 1.0) * x * current - (n - 1.0) * previous) / n;
        previous = current;
        current = next;
    }

    let n = degree as f64;
    let derivative = if (1.0 - x * x).abs() <= f64::EPSILON {
        let sign = if x > 0.0 || degree % 2 == 1 { 1.0 } else { -1.0 };
        sign * n * (n + 1.0) / 2.0
    } else {
        n * (x * current - previous) / (x * x - 1.0)
    };

    (current, derivative)
}

/// `P_0(x) .. P_degree(x)`.
pub fn legendre_basis(degree: usize, x: f64) -> Vec<f64> {
    let mut basis = Vec::with_capacity(degree + 1);
    basis.push(1.0);
    if degree == 0 {
        return basis;
    }
    basis.push(x);
    for n in 2..=degree {
        let order = n as f64;
        let next = ((2.0 * order - 1.0) * x * basis[n - 1] - (order - 1.0) * basis[n - 2]) / order;
        basis.push(next);
    }
    basis
}

#[cfg(test)]
mod tests {
    use super::{gauss_legendre, legendre_and_derivative, legendre_basis, node_count_for_degree};

    #[test]
    fn two_point_rule_matches_closed_form() {
        let rule = gauss_legendre(2).expect("rule");
        let expected = 1.0 / 3.0_f64.sqrt();
        assert!((rule.nodes[0] + expected).abs() <= 1.0e-15);
        assert!((rule.nodes[1] - expected).abs() <= 1.0e-15);
        assert!((rule.weights[0] - 1.0).abs() <= 1.0e-14);
        assert!((rule.weights[1] - 1.0).abs() <= 1.0e-14);
    }

    #[test]
    fn rules_integrate_monomials_up_to_their_exactness_degree() {
        for count in 1..=12 {
            let rule = gauss_legendre(count).expect("rule");
            assert!(rule.nodes.windows(2).all(|pair| pair[0] < pair[1]));
            for power in 0..(2 * count) {
                let actual: f64 = rule
                    .nodes
                    .iter()
                    .zip(&rule.weights)
                    .map(|(node, weight)| weight * node.powi(power as i32))
                    .sum();
                let expected = if power % 2 == 0 {
                    2.0 / (power as f64 + 1.0)
                } else {
                    0.0
                };
                assert!(
                    (actual - expected).abs() <= 1.0e-12,
                    "count={count} power={power} actual={actual} expected={expected}"
                );
            }
        }
    }

    #[test]
    fn mapped_rule_integrates_over_physical_interval() {
        let rule = gauss_legendre(3).expect("rule");
        let (nodes, weights) = rule.mapped(2.0, 5.0);
        let integral: f64 = nodes
            .iter()
            .zip(&weights)
            .map(|(x, w)| w * x * x * x * x)
            .sum();
        let expected = (5.0_f64.powi(5) - 2.0_f64.powi(5)) / 5.0;
        assert!((integral - expected).abs() <= 1.0e-10 * expected);
        assert!(nodes.iter().all(|x| *x > 2.0 && *x < 5.0));
    }

    #[test]
    fn node_count_rounds_exactness_requirement_up() {
        assert_eq!(node_count_for_degree(0), 1);
        assert_eq!(node_count_for_degree(5), 4);
        assert_eq!(node_count_for_degree(6), 4);
        assert_eq!(node_count_for_degree(7), 5);
    }

    #[test]
    fn basis_agrees_with_recurrence_helper() {
        let x = 0.37;
        let basis = legendre_basis(6, x);
        for (degree, value) in basis.iter().enumerate() {
            let (expected, _) = legendre_and_derivative(degree, x);
            assert!((value - expected).abs() <= 1.0e-15);
        }
        assert!(gauss_legendre(0).is_err());
    }
}
