//! Bin-break bookkeeping. Every function here is pure: it takes the current
//! breaks and returns new ones, leaving rebinning to the pipeline.

use crate::domain::{GlqError, GlqResult, Span};
use tracing::warn;

/// Breaks within this distance (in nm) of a species edge duplicate it.
const EDGE_TOLERANCE_NM: f64 = 0.1;
/// Neighbouring end breaks closer than this relative gap are collapsed.
const END_COLLAPSE_RELATIVE: f64 = 1.0e-5;

#[derive(Debug, Clone, PartialEq)]
pub enum Binning {
    /// A single wavelength; no bins are built.
    Monochromatic { wavelength: f64 },
    Bins { breaks: Vec<f64> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinReport {
    pub binning: Binning,
    pub warnings: Vec<String>,
}

impl BinReport {
    pub fn n_bins(&self) -> usize {
        match &self.binning {
            Binning::Monochromatic { .. } => 0,
            Binning::Bins { breaks } => breaks.len() - 1,
        }
    }
}

/// Sorts and deduplicates `requested`, then fits the bins to `domain`:
/// bins wholly outside are dropped and bins straddling a domain edge are
/// clamped to it.
pub fn sanitize_breaks(requested: &[f64], domain: Span) -> GlqResult<BinReport> {
    if let Some(bad) = requested.iter().find(|value| !value.is_finite()) {
        return Err(GlqError::configuration(
            "CONFIG.BREAKS",
            format!("bin breaks must be finite, got {bad}"),
        ));
    }

    let mut breaks = requested.to_vec();
    breaks.sort_by(f64::total_cmp);
    breaks.dedup();

    match breaks.as_slice() {
        [] => {
            return Err(GlqError::configuration(
                "CONFIG.BREAKS",
                "binning needs at least one wavelength",
            ));
        }
        [wavelength] => {
            return Ok(BinReport {
                binning: Binning::Monochromatic {
                    wavelength: *wavelength,
                },
                warnings: Vec::new(),
            });
        }
        _ => {}
    }

    let mut warnings = Vec::new();
    let first = breaks[0];
    let last = breaks[breaks.len() - 1];
    if first < domain.lo || last > domain.hi {
        let message = format!(
            "requested bins [{first}, {last}] exceed the spectrum domain [{}, {}]; truncating bins to fit",
            domain.lo, domain.hi
        );
        warn!("{message}");
        warnings.push(message);

        let mut clipped: Vec<f64> = Vec::with_capacity(breaks.len() + 2);
        if first < domain.lo && last > domain.lo {
            clipped.push(domain.lo);
        }
        clipped.extend(breaks.iter().copied().filter(|value| domain.contains(*value)));
        if last > domain.hi && first < domain.hi {
            clipped.push(domain.hi);
        }
        clipped.dedup();
        breaks = clipped;
    }

    if breaks.len() < 2 {
        return Err(GlqError::configuration(
            "CONFIG.BINS_OUTSIDE_DOMAIN",
            format!(
                "no requested bin overlaps the spectrum domain [{}, {}]",
                domain.lo, domain.hi
            ),
        ));
    }

    Ok(BinReport {
        binning: Binning::Bins { breaks },
        warnings,
    })
}

/// `current` with `edge` added, sorted; unchanged if already present.
pub fn with_edge(current: &[f64], edge: f64) -> Vec<f64> {
    let mut breaks = current.to_vec();
    if !breaks.contains(&edge) {
        breaks.push(edge);
    }
    breaks.sort_by(f64::total_cmp);
    breaks
}

/// `current` with a species threshold `edge` added. Breaks that are not in
/// `species_edges` but lie within the edge tolerance of one are dropped, so
/// no bin narrower than the tolerance is left beside a species edge.
pub fn with_species_edge(current: &[f64], edge: f64, species_edges: &[f64], wl_norm: f64) -> Vec<f64> {
    let mut edges = species_edges.to_vec();
    if !edges.contains(&edge) {
        edges.push(edge);
    }
    let mut breaks = with_edge(current, edge);
    drop_near_species_edges(&mut breaks, &edges, edge_tolerance(wl_norm));
    breaks
}

/// `current` without `edge`; unchanged if absent.
pub fn without_edge(current: &[f64], edge: f64) -> Vec<f64> {
    current
        .iter()
        .copied()
        .filter(|value| *value != edge)
        .collect()
}

/// Breaks restricted to `[wl_min, wl_max]`.
///
/// Species edges are re-included first. Truncation bounds within the edge
/// tolerance of a species edge snap onto that edge, other breaks that close
/// to a species edge are dropped, and a near-duplicate pair at either end is
/// collapsed keeping the species edge.
pub fn truncated_breaks(
    current: &[f64],
    species_edges: &[f64],
    wl_min: Option<f64>,
    wl_max: f64,
    wl_norm: f64,
) -> GlqResult<Vec<f64>> {
    let tolerance = edge_tolerance(wl_norm);
    let is_species_edge = |value: f64| species_edges.contains(&value);
    let snap = |bound: f64| {
        species_edges
            .iter()
            .copied()
            .find(|edge| (bound - edge).abs() < tolerance)
            .unwrap_or(bound)
    };

    let wl_max = snap(wl_max);
    let wl_min = wl_min.map(snap);
    if let Some(lo) = wl_min.filter(|lo| *lo >= wl_max) {
        return Err(GlqError::configuration(
            "CONFIG.TRUNCATION",
            format!("truncation lower bound {lo} must be below upper bound {wl_max}"),
        ));
    }

    let mut breaks: Vec<f64> = current.iter().chain(species_edges).copied().collect();
    breaks.push(wl_max);
    breaks.extend(wl_min);
    breaks.sort_by(f64::total_cmp);
    breaks.dedup();
    breaks.retain(|value| *value <= wl_max && wl_min.is_none_or(|lo| *value >= lo));

    drop_near_species_edges(&mut breaks, species_edges, tolerance);

    let len = breaks.len();
    if len > 1 && relative_gap(breaks[0], breaks[1], breaks[0]) < END_COLLAPSE_RELATIVE {
        let drop = if is_species_edge(breaks[0]) && !is_species_edge(breaks[1]) { 1 } else { 0 };
        breaks.remove(drop);
    }
    let len = breaks.len();
    if len > 1
        && relative_gap(breaks[len - 1], breaks[len - 2], breaks[len - 1]) < END_COLLAPSE_RELATIVE
    {
        let drop = if is_species_edge(breaks[len - 1]) && !is_species_edge(breaks[len - 2]) {
            len - 2
        } else {
            len - 1
        };
        breaks.remove(drop);
    }

    Ok(breaks)
}

fn edge_tolerance(wl_norm: f64) -> f64 {
    EDGE_TOLERANCE_NM * (1.0e-7 / wl_norm)
}

fn drop_near_species_edges(breaks: &mut Vec<f64>, species_edges: &[f64], tolerance: f64) {
    breaks.retain(|value| {
        let keep = species_edges.contains(value)
            || species_edges
                .iter()
                .all(|edge| (value - edge).abs() >= tolerance);
        if !keep {
            warn!(wavelength = *value, "dropping break within the edge tolerance of a species edge");
        }
        keep
    });
}

fn relative_gap(a: f64, b: f64, reference: f64) -> f64 {
    (a - b).abs() / reference.abs()
}

#[cfg(test)]
mod tests {
    use super::{
        Binning, sanitize_breaks, truncated_breaks, with_edge, with_species_edge, without_edge,
    };
    use crate::domain::Span;

    fn domain() -> Span {
        Span::new(10.0, 130.0).expect("domain")
    }

    fn breaks_of(binning: &Binning) -> &[f64] {
        match binning {
            Binning::Bins { breaks } => breaks,
            Binning::Monochromatic { .. } => panic!("expected bins"),
        }
    }

    #[test]
    fn unsorted_duplicated_breaks_are_normalized() {
        let report = sanitize_breaks(&[90.0, 20.0, 50.0, 20.0], domain()).expect("bins");
        assert_eq!(breaks_of(&report.binning), [20.0, 50.0, 90.0]);
        assert_eq!(report.n_bins(), 2);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn single_value_is_monochromatic() {
        let report = sanitize_breaks(&[30.4], domain()).expect("mono");
        assert_eq!(report.binning, Binning::Monochromatic { wavelength: 30.4 });
        assert_eq!(report.n_bins(), 0);
        assert!(sanitize_breaks(&[], domain()).is_err());
    }

    #[test]
    fn bins_outside_domain_are_dropped_or_clamped_with_a_warning() {
        let report = sanitize_breaks(&[1.0, 5.0, 40.0, 120.0, 150.0, 200.0], domain()).expect("bins");
        assert_eq!(breaks_of(&report.binning), [10.0, 40.0, 120.0, 130.0]);
        assert_eq!(report.warnings.len(), 1);

        let error = sanitize_breaks(&[140.0, 150.0], domain()).expect_err("outside");
        assert_eq!(error.placeholder(), "CONFIG.BINS_OUTSIDE_DOMAIN");
    }

    #[test]
    fn edges_are_added_and_removed_idempotently() {
        let breaks = [20.0, 60.0, 120.0];
        assert_eq!(with_edge(&breaks, 91.0), [20.0, 60.0, 91.0, 120.0]);
        assert_eq!(with_edge(&breaks, 60.0), breaks);
        assert_eq!(without_edge(&breaks, 60.0), [20.0, 120.0]);
        assert_eq!(without_edge(&breaks, 61.0), breaks);
    }

    #[test]
    fn truncation_keeps_species_edges_and_drops_near_duplicates() {
        let species = [50.4, 91.2];
        let current = [10.0, 50.45, 70.0, 130.0];
        let breaks = truncated_breaks(&current, &species, None, 91.2, 1.0e-7).expect("truncate");
        assert_eq!(breaks, [10.0, 50.4, 70.0, 91.2]);
    }

    #[test]
    fn truncation_bounds_snap_to_nearby_species_edges() {
        let species = [91.2];
        let current = [10.0, 130.0];
        let breaks =
            truncated_breaks(&current, &species, Some(20.0), 91.15, 1.0e-7).expect("truncate");
        assert_eq!(breaks, [20.0, 91.2]);

        let error = truncated_breaks(&current, &species, Some(95.0), 91.2, 1.0e-7)
            .expect_err("inverted bounds");
        assert_eq!(error.placeholder(), "CONFIG.TRUNCATION");
    }

    #[test]
    fn near_equal_end_breaks_collapse_onto_the_species_edge() {
        let species = [91.2];
        let current = [10.0, 10.00001, 50.0];
        let breaks = truncated_breaks(&current, &species, None, 91.2, 1.0e-7).expect("truncate");
        assert_eq!(breaks, [10.00001, 50.0, 91.2]);

        let species = [10.0];
        let breaks = truncated_breaks(&current, &species, None, 91.2, 1.0e-7).expect("truncate");
        assert_eq!(breaks, [10.0, 50.0, 91.2]);
    }

    #[test]
    fn species_edge_replaces_breaks_inside_its_tolerance() {
        let breaks = with_species_edge(&[20.0, 91.2, 140.0], 91.16, &[], 1.0e-7);
        assert_eq!(breaks, vec![20.0, 91.16, 140.0]);

        let shared = with_species_edge(&[20.0, 50.4, 140.0], 50.45, &[50.4], 1.0e-7);
        assert_eq!(shared, vec![20.0, 50.4, 50.45, 140.0]);

        let far = with_species_edge(&[20.0, 91.5, 140.0], 91.16, &[], 1.0e-7);
        assert_eq!(far, vec![20.0, 91.16, 91.5, 140.0]);
    }
}
