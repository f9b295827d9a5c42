//! Multi-pass Savitzky-Golay smoothing of one bin, conserving the bin's
//! integrated flux.

use crate::domain::{GlqError, GlqResult, Span};
use crate::numerics::{
    LegendreSeries, PiecewiseCubic, akima_interpolant, fit_polynomial, integrate_simpson,
    min_spacing, relative_difference, savgol_filter,
};
use crate::spectrum::FluxTotals;
use std::ops::Range;
use tracing::{debug, warn};

/// Window of the filter applied to the sampled second derivative.
const SECOND_DERIVATIVE_WINDOW: usize = 11;
/// Second-derivative roots must lie 1% inside the outermost ones.
const SECOND_DERIVATIVE_LOWER_MARGIN: f64 = 1.01;
const SECOND_DERIVATIVE_UPPER_MARGIN: f64 = 0.99;
/// Allowed relative mismatch between a target-degree fit's integral and the
/// bin's true integral.
const FIT_INTEGRAL_TOLERANCE: f64 = 1.0e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConservedQuantity {
    #[default]
    PhotonFlux,
    EnergyFlux,
}

/// When to stop filtering. The variants are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoppingRule {
    /// Exactly this many passes.
    FixedPasses(usize),
    /// Until fewer than two critical points remain or all are further apart
    /// than `min_distance`.
    CriticalSeparation {
        min_distance: f64,
        second_derivative: bool,
    },
    /// Until one polynomial of `degree` fits the whole bin within
    /// `lsq_tolerance` and conserves its integral.
    TargetDegree { degree: usize, lsq_tolerance: f64 },
}

impl StoppingRule {
    pub fn critical_separation(min_distance: f64) -> Self {
        Self::CriticalSeparation {
            min_distance,
            second_derivative: true,
        }
    }

    pub fn target_degree(degree: usize) -> Self {
        Self::TargetDegree {
            degree,
            lsq_tolerance: 1.0e-3,
        }
    }
}

impl Default for StoppingRule {
    fn default() -> Self {
        Self::FixedPasses(10)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingParams {
    pub window: usize,
    pub filter_degree: usize,
    pub stopping: StoppingRule,
    pub conserve: ConservedQuantity,
    /// Ceiling on passes for the adaptive stopping rules.
    pub max_passes: usize,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            window: 21,
            filter_degree: 1,
            stopping: StoppingRule::default(),
            conserve: ConservedQuantity::default(),
            max_passes: 10_000,
        }
    }
}

impl SmoothingParams {
    pub fn validate(&self) -> GlqResult<()> {
        if self.window % 2 == 0 || self.window <= self.filter_degree {
            return Err(GlqError::configuration(
                "CONFIG.SMOOTHING",
                format!(
                    "filter window must be odd and exceed the filter degree, got window {} degree {}",
                    self.window, self.filter_degree
                ),
            ));
        }
        if self.max_passes == 0 {
            return Err(GlqError::configuration(
                "CONFIG.SMOOTHING",
                "pass ceiling must be at least 1",
            ));
        }
        match self.stopping {
            StoppingRule::FixedPasses(0) => Err(GlqError::configuration(
                "CONFIG.SMOOTHING",
                "fixed pass count must be at least 1",
            )),
            StoppingRule::CriticalSeparation { min_distance, .. }
                if !min_distance.is_finite() || min_distance <= 0.0 =>
            {
                Err(GlqError::configuration(
                    "CONFIG.SMOOTHING",
                    format!("critical point separation must be positive, got {min_distance}"),
                ))
            }
            StoppingRule::TargetDegree { lsq_tolerance, .. }
                if !lsq_tolerance.is_finite() || lsq_tolerance <= 0.0 =>
            {
                Err(GlqError::configuration(
                    "CONFIG.SMOOTHING",
                    format!("least-squares tolerance must be positive, got {lsq_tolerance}"),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Smoothed conserved column of one bin and what was derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedCurve {
    pub smoothed: Vec<f64>,
    pub interpolant: PiecewiseCubic,
    /// Bin edges with the interior extrema between them.
    pub critical_points: Vec<f64>,
    pub n_passes: usize,
    /// False when an adaptive rule hit the pass ceiling.
    pub converged: bool,
    /// Integral of the unsmoothed column over the bin.
    pub integral: f64,
    /// Polynomial accepted by [`StoppingRule::TargetDegree`].
    pub target_fit: Option<LegendreSeries>,
}

impl SmoothedCurve {
    pub fn n_crits(&self) -> usize {
        self.critical_points.len().saturating_sub(2)
    }
}

/// Per-bin smoothing record kept by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedBin {
    /// Spectrum sample indices inside the bin.
    pub samples: Range<usize>,
    pub conserved: ConservedQuantity,
    /// Mean photon energy `∫F / ∫Φ` over the bin (erg).
    pub mean_energy: f64,
    pub curve: SmoothedCurve,
}

/// Smooths `values` sampled at `wavelength` (the samples of one bin with
/// bounds `edges`).
pub fn smooth_bin(
    wavelength: &[f64],
    values: &[f64],
    edges: Span,
    params: &SmoothingParams,
) -> GlqResult<SmoothedCurve> {
    params.validate()?;
    if wavelength.len() < 2 || wavelength.len() != values.len() {
        return Err(GlqError::computation(
            "COMPUTE.BIN_SAMPLES",
            format!(
                "bin [{}, {}] holds {} samples, smoothing needs at least 2",
                edges.lo,
                edges.hi,
                wavelength.len()
            ),
        ));
    }

    let integral = simpson(wavelength, values)?;
    if !integral.is_finite() || integral <= 0.0 {
        return Err(GlqError::computation(
            "COMPUTE.BIN_INTEGRAL",
            format!("bin [{}, {}] has non-positive integrated flux {integral}", edges.lo, edges.hi),
        ));
    }

    let filter = |input: &[f64]| {
        savgol_filter(input, params.window, params.filter_degree)
            .map_err(|error| GlqError::computation("COMPUTE.SAVGOL", error.to_string()))
    };

    let mut smoothed = filter(values)?;
    let mut n_passes = 1;
    let mut converged = true;
    let mut target_fit = None;

    match params.stopping {
        StoppingRule::FixedPasses(passes) => {
            while n_passes < passes {
                smoothed = filter(&smoothed)?;
                n_passes += 1;
            }
        }
        StoppingRule::CriticalSeparation {
            min_distance,
            second_derivative,
        } => loop {
            let crits = candidate_critical_points(wavelength, &smoothed, second_derivative)?;
            let separated = crits.len() < 2
                || min_spacing(&crits).is_some_and(|spacing| spacing > min_distance);
            if separated {
                break;
            }
            if n_passes >= params.max_passes {
                converged = false;
                break;
            }
            smoothed = filter(&smoothed)?;
            n_passes += 1;
        },
        StoppingRule::TargetDegree {
            degree,
            lsq_tolerance,
        } => loop {
            renormalize(wavelength, &mut smoothed, integral)?;
            let fit = fit_polynomial(wavelength, &smoothed, degree)
                .map_err(|error| GlqError::computation("COMPUTE.POLYFIT", error.to_string()))?;
            let fit_integral = fit.series.domain_integral();
            let conserves = relative_difference(integral, fit_integral, integral) <= FIT_INTEGRAL_TOLERANCE;
            if conserves && fit.residual_or_recompute(wavelength, &smoothed) < lsq_tolerance {
                target_fit = Some(fit.series);
                break;
            }
            if n_passes >= params.max_passes {
                converged = false;
                break;
            }
            smoothed = filter(&smoothed)?;
            n_passes += 1;
        },
    }

    if !converged {
        warn!(
            lo = edges.lo,
            hi = edges.hi,
            n_passes,
            "smoothing reached its pass ceiling before the stopping rule was met"
        );
    }

    renormalize(wavelength, &mut smoothed, integral)?;
    let interpolant = interpolate(wavelength, &smoothed)?;
    let mut critical_points = vec![edges.lo];
    critical_points.extend(
        interpolant
            .derivative()
            .roots()
            .into_iter()
            .filter(|root| *root > edges.lo && *root < edges.hi),
    );
    critical_points.push(edges.hi);

    debug!(
        lo = edges.lo,
        hi = edges.hi,
        n_passes,
        n_crits = critical_points.len() - 2,
        "smoothed bin"
    );

    Ok(SmoothedCurve {
        smoothed,
        interpolant,
        critical_points,
        n_passes,
        converged,
        integral,
        target_fit,
    })
}

/// Factor turning the smoothed conserved column into its companion: photon
/// flux to flux when conserving photons, and the inverse otherwise.
pub fn companion_factor(conserved: ConservedQuantity, mean_energy: f64, totals: &FluxTotals) -> f64 {
    let photons_to_flux = mean_energy * totals.photon_resolved / totals.flux_resolved;
    match conserved {
        ConservedQuantity::PhotonFlux => photons_to_flux,
        ConservedQuantity::EnergyFlux => 1.0 / photons_to_flux,
    }
}

fn candidate_critical_points(
    wavelength: &[f64],
    smoothed: &[f64],
    second_derivative: bool,
) -> GlqResult<Vec<f64>> {
    let interpolant = interpolate(wavelength, smoothed)?;
    let mut crits = interpolant.derivative().roots();

    if second_derivative {
        let curvature = interpolant.nth_derivative(2).evaluate_many(wavelength);
        let curvature = savgol_filter(&curvature, SECOND_DERIVATIVE_WINDOW, 1)
            .map_err(|error| GlqError::computation("COMPUTE.SAVGOL", error.to_string()))?;
        let inflections = interpolate(wavelength, &curvature)?.roots();
        if let (Some(first), Some(last)) = (inflections.first().copied(), inflections.last().copied()) {
            crits.extend(inflections.iter().copied().filter(|root| {
                root / first > SECOND_DERIVATIVE_LOWER_MARGIN && root / last < SECOND_DERIVATIVE_UPPER_MARGIN
            }));
        }
        crits.sort_by(f64::total_cmp);
    }

    Ok(crits)
}

fn interpolate(wavelength: &[f64], values: &[f64]) -> GlqResult<PiecewiseCubic> {
    akima_interpolant(wavelength, values)
        .map_err(|error| GlqError::computation("COMPUTE.INTERPOLATION", error.to_string()))
}

fn simpson(wavelength: &[f64], values: &[f64]) -> GlqResult<f64> {
    integrate_simpson(wavelength, values)
        .map_err(|error| GlqError::computation("COMPUTE.INTEGRATION", error.to_string()))
}

fn renormalize(wavelength: &[f64], values: &mut [f64], target: f64) -> GlqResult<()> {
    let current = simpson(wavelength, values)?;
    if current == 0.0 || !current.is_finite() {
        return Err(GlqError::computation(
            "COMPUTE.RENORMALIZE",
            format!("smoothed bin integral {current} cannot be renormalized"),
        ));
    }
    let factor = target / current;
    values.iter_mut().for_each(|value| *value *= factor);
    Ok(())
}
