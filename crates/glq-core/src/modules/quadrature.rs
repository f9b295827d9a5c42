//! Gauss-Legendre nodes and weights per sub-bin.

use super::fitter::FittedBin;
use crate::domain::{GlqError, GlqResult, Span};
use crate::numerics::{PiecewiseCubic, gauss_legendre, integrate_simpson, node_count_for_degree};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadratureParams {
    /// Active window in normalized units; `None` spans every bin.
    pub window: Option<Span>,
    /// Polynomial degree assumed for the cross sections.
    pub sigma_degree: usize,
    /// Polynomial degree assumed for the transmission.
    pub transmission_degree: usize,
}

impl Default for QuadratureParams {
    fn default() -> Self {
        Self {
            window: None,
            sigma_degree: 3,
            transmission_degree: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureNodes {
    /// Normalized wavelengths, ascending.
    pub abscissas: Vec<f64>,
    /// Photon flux fraction `w_i φ(λ_i)` carried by each node.
    pub weights: Vec<f64>,
    /// Polynomial degree the rule integrates exactly.
    pub exactness_degree: usize,
    /// Part of the sub-bin inside the window.
    pub span: Span,
}

impl QuadratureNodes {
    pub fn len(&self) -> usize {
        self.abscissas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abscissas.is_empty()
    }
}

/// Nodes of one bin, one entry per sub-bin; `None` where the sub-bin lies
/// outside the window.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BinQuadrature {
    /// Factor converting the interpolant integral to photons over the
    /// windowed part of the bin.
    pub photon_scale: Option<f64>,
    pub nodes: Vec<Option<QuadratureNodes>>,
}

impl BinQuadrature {
    pub fn empty(n_subbins: usize) -> Self {
        Self {
            photon_scale: None,
            nodes: vec![None; n_subbins],
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().map(QuadratureNodes::len).sum()
    }
}

/// Samples of one bin in the two unit systems the quadrature needs.
#[derive(Debug, Clone, Copy)]
pub struct BinSamples<'a> {
    /// Normalized wavelengths.
    pub wavelength: &'a [f64],
    /// Wavelengths in cm.
    pub wavelength_cm: &'a [f64],
    /// Photon flux density (cgs).
    pub photon_flux: &'a [f64],
}

/// Builds the quadrature of one fitted bin over `window`. Weights are scaled
/// so that they sum to the photon flux in the windowed part of the bin
/// divided by `photon_resolved`.
pub fn bin_abscissas(
    fitted: &FittedBin,
    interpolant: &PiecewiseCubic,
    samples: BinSamples<'_>,
    window: Span,
    params: &QuadratureParams,
    photon_resolved: f64,
) -> GlqResult<BinQuadrature> {
    let n_subbins = fitted.subbins.len();
    if window.is_degenerate() {
        return Ok(BinQuadrature::empty(n_subbins));
    }
    let photon_scale = match windowed_photon_scale(interpolant, samples, window)? {
        Some(scale) => scale,
        None => match sparse_window_scale(fitted, interpolant, samples, window)? {
            Some(scale) => scale,
            None => return Ok(BinQuadrature::empty(n_subbins)),
        },
    };

    let mut nodes = Vec::with_capacity(n_subbins);
    for subbin in &fitted.subbins {
        let Some(span) = subbin.span.intersect(&window).filter(|span| !span.is_degenerate()) else {
            nodes.push(None);
            continue;
        };
        let exactness_degree = subbin.degree() + params.sigma_degree + params.transmission_degree;
        let rule = gauss_legendre(node_count_for_degree(exactness_degree))
            .map_err(|error| GlqError::computation("COMPUTE.GAUSS_LEGENDRE", error.to_string()))?;
        let (abscissas, canonical) = rule.mapped(span.lo, span.hi);
        let weights = abscissas
            .iter()
            .zip(&canonical)
            .map(|(x, w)| w * interpolant.evaluate(*x) * photon_scale / photon_resolved)
            .collect();
        debug!(lo = span.lo, hi = span.hi, exactness_degree, nodes = rule.len(), "placed nodes");
        nodes.push(Some(QuadratureNodes {
            abscissas,
            weights,
            exactness_degree,
            span,
        }));
    }

    Ok(BinQuadrature {
        photon_scale: Some(photon_scale),
        nodes,
    })
}

/// Scale for a window that overlaps the bin but holds fewer than two of its
/// samples: the whole bin calibrates the interpolant. `None` when the window
/// misses the bin.
fn sparse_window_scale(
    fitted: &FittedBin,
    interpolant: &PiecewiseCubic,
    samples: BinSamples<'_>,
    window: Span,
) -> GlqResult<Option<f64>> {
    let (Some(first), Some(last)) = (fitted.subbins.first(), fitted.subbins.last()) else {
        return Ok(None);
    };
    let bin_span = Span {
        lo: first.span.lo,
        hi: last.span.hi,
    };
    let Some(overlap) = bin_span.intersect(&window).filter(|span| !span.is_degenerate()) else {
        return Ok(None);
    };
    let (Some(&lo), Some(&hi)) = (samples.wavelength.first(), samples.wavelength.last()) else {
        return Ok(None);
    };

    let scale = windowed_photon_scale(interpolant, samples, Span { lo, hi })?;
    warn!(
        lo = overlap.lo,
        hi = overlap.hi,
        width = overlap.width(),
        modelled = interpolant.integrate(overlap.lo, overlap.hi),
        "window holds fewer than two bin samples, calibrating nodes on the whole bin"
    );
    Ok(scale)
}

/// `∫Φ dλ / ∫interp dλ` over the bin samples inside `window`; `None` when
/// fewer than two samples fall inside.
fn windowed_photon_scale(
    interpolant: &PiecewiseCubic,
    samples: BinSamples<'_>,
    window: Span,
) -> GlqResult<Option<f64>> {
    let start = samples.wavelength.partition_point(|wl| *wl < window.lo);
    let end = samples.wavelength.partition_point(|wl| *wl <= window.hi).max(start);
    if end - start < 2 {
        return Ok(None);
    }

    let wl = &samples.wavelength[start..end];
    let simpson = |x: &[f64], y: &[f64]| {
        integrate_simpson(x, y)
            .map_err(|error| GlqError::computation("COMPUTE.INTEGRATION", error.to_string()))
    };
    let photons = simpson(&samples.wavelength_cm[start..end], &samples.photon_flux[start..end])?;
    let modelled = simpson(wl, &interpolant.evaluate_many(wl))?;
    if modelled == 0.0 || !modelled.is_finite() {
        return Err(GlqError::computation(
            "COMPUTE.RENORMALIZE",
            format!("interpolant integrates to {modelled} over [{}, {}]", wl[0], wl[wl.len() - 1]),
        ));
    }
    Ok(Some(photons / modelled))
}
