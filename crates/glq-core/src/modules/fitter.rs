//! Sub-binning at critical points and least-squares polynomial fits of the
//! smoothed interpolant.

use crate::domain::{GlqError, GlqResult, Span};
use crate::numerics::{LegendreSeries, PiecewiseCubic, fit_polynomial};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitParams {
    /// Residual sum of squares accepted by the degree search, on the nm scale.
    pub lsq_tolerance: f64,
    pub max_degree: usize,
    /// Skips the degree search.
    pub fixed_degree: Option<usize>,
    /// Interior critical points per sub-bin; `None` fits the whole bin.
    pub crits_enclosed: Option<usize>,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            lsq_tolerance: 1.0e-2,
            max_degree: 50,
            fixed_degree: None,
            crits_enclosed: None,
        }
    }
}

impl FitParams {
    pub fn validate(&self) -> GlqResult<()> {
        if !self.lsq_tolerance.is_finite() || self.lsq_tolerance <= 0.0 {
            return Err(GlqError::configuration(
                "CONFIG.FIT",
                format!("least-squares tolerance must be positive, got {}", self.lsq_tolerance),
            ));
        }
        if self.max_degree == 0 || self.fixed_degree == Some(0) {
            return Err(GlqError::configuration(
                "CONFIG.FIT",
                "polynomial degrees must be at least 1",
            ));
        }
        if self.crits_enclosed == Some(0) {
            return Err(GlqError::configuration(
                "CONFIG.FIT",
                "crits_enclosed must be at least 1 when given",
            ));
        }
        Ok(())
    }

    /// Tolerance rescaled from the nm scale to a `wl_norm` wavelength unit.
    pub fn scaled_tolerance(&self, wl_norm: f64) -> f64 {
        let ratio = wl_norm / 1.0e-7;
        self.lsq_tolerance * ratio * ratio
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubBin {
    pub span: Span,
    pub polynomial: LegendreSeries,
    pub residual: f64,
    /// The degree search stopped at its ceiling without meeting tolerance.
    pub at_ceiling: bool,
}

impl SubBin {
    pub fn degree(&self) -> usize {
        self.polynomial.degree()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FittedBin {
    pub subbins: Vec<SubBin>,
}

impl FittedBin {
    pub fn breaks(&self) -> Vec<f64> {
        let mut breaks: Vec<f64> = self.subbins.iter().map(|subbin| subbin.span.lo).collect();
        breaks.extend(self.subbins.last().map(|subbin| subbin.span.hi));
        breaks
    }

    pub fn degrees(&self) -> Vec<usize> {
        self.subbins.iter().map(SubBin::degree).collect()
    }
}

/// Sub-bin boundaries taken from `critical_points` (bin edges included),
/// enclosing `crits_enclosed` interior points per sub-bin. The last sub-bin
/// takes the remainder. Bins with too few critical points stay whole.
pub fn subbin_breaks(critical_points: &[f64], crits_enclosed: Option<usize>) -> Vec<f64> {
    let (Some(&lo), Some(&hi)) = (critical_points.first(), critical_points.last()) else {
        return Vec::new();
    };
    let n_crits = critical_points.len().saturating_sub(2);
    match crits_enclosed {
        Some(per_subbin) if per_subbin > 0 && n_crits >= per_subbin => {
            let mut breaks: Vec<f64> = critical_points[..critical_points.len() - 1]
                .iter()
                .copied()
                .step_by(per_subbin + 1)
                .collect();
            breaks.push(hi);
            breaks
        }
        _ => vec![lo, hi],
    }
}

/// Fits every sub-bin of one bin. `wavelength` holds the bin's samples; each
/// sub-bin is fitted on its samples plus its two boundaries, with values
/// taken from `interpolant`.
pub fn fit_bin(
    wavelength: &[f64],
    interpolant: &PiecewiseCubic,
    critical_points: &[f64],
    params: &FitParams,
    lsq_tolerance: f64,
) -> GlqResult<FittedBin> {
    params.validate()?;
    let breaks = subbin_breaks(critical_points, params.crits_enclosed);
    let mut subbins = Vec::with_capacity(breaks.len().saturating_sub(1));

    for pair in breaks.windows(2) {
        let span = Span::new(pair[0], pair[1])?;
        let mut grid = vec![span.lo];
        grid.extend(
            wavelength
                .iter()
                .copied()
                .filter(|wl| *wl > span.lo && *wl < span.hi),
        );
        grid.push(span.hi);
        grid.dedup();
        let values = interpolant.evaluate_many(&grid);

        let subbin = match params.fixed_degree {
            Some(degree) => fit_degree(&grid, &values, degree, span, false)?,
            None => search_degree(&grid, &values, span, params.max_degree, lsq_tolerance)?,
        };
        debug!(
            lo = span.lo,
            hi = span.hi,
            degree = subbin.degree(),
            residual = subbin.residual,
            "fitted sub-bin"
        );
        subbins.push(subbin);
    }

    Ok(FittedBin { subbins })
}

fn search_degree(
    grid: &[f64],
    values: &[f64],
    span: Span,
    max_degree: usize,
    lsq_tolerance: f64,
) -> GlqResult<SubBin> {
    let mut degree = 1;
    loop {
        let at_ceiling = degree >= max_degree;
        let subbin = fit_degree(grid, values, degree, span, at_ceiling)?;
        if subbin.residual < lsq_tolerance {
            return Ok(SubBin {
                at_ceiling: false,
                ..subbin
            });
        }
        if at_ceiling {
            warn!(
                lo = span.lo,
                hi = span.hi,
                degree,
                residual = subbin.residual,
                "polynomial degree search reached its ceiling"
            );
            return Ok(subbin);
        }
        degree += 1;
    }
}

fn fit_degree(
    grid: &[f64],
    values: &[f64],
    degree: usize,
    span: Span,
    at_ceiling: bool,
) -> GlqResult<SubBin> {
    let fit = fit_polynomial(grid, values, degree).map_err(|error| {
        GlqError::computation(
            "COMPUTE.POLYFIT",
            format!("sub-bin [{}, {}] degree {degree}: {error}", span.lo, span.hi),
        )
    })?;
    let residual = fit.residual_or_recompute(grid, values);
    Ok(SubBin {
        span,
        polynomial: fit.series,
        residual,
        at_ceiling,
    })
}
