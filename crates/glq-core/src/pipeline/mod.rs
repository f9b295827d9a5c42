//! The binning, smoothing and quadrature workflow over one spectrum.
//!
//! [`GlqSpectrum`] owns the spectrum, the tracked species and one
//! [`BinRecord`] per bin. Operations must run in stage order
//! (bin, smooth, fit, abscissas, then normalize and write); running one out
//! of order returns a precondition error and leaves the state untouched.

mod output;

use crate::common::constants::NM;
use crate::domain::{GlqError, GlqResult, PipelineStage, Span, Spans};
use crate::modules::{
    BinQuadrature, BinReport, BinSamples, Binning, ConservedQuantity, FitParams, FittedBin,
    Normalization, QuadratureParams, SmoothedBin, SmoothingParams, bin_abscissas, companion_factor,
    fit_bin, normalize, sanitize_breaks, smooth_bin, truncated_breaks, with_edge, with_species_edge,
    without_edge,
};
use crate::numerics::integrate_simpson;
use crate::species::{CrossSectionProvider, Species, SpeciesName, VernerTable};
use crate::spectrum::{FluxTotals, SpectrumTable, WorkingColumns};
use std::ops::Range;
use tracing::{debug, info, warn};

/// Derived state of one bin. Later stages are `None` until computed and are
/// cleared whenever an earlier stage of the same bin is recomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct BinRecord {
    /// Bin bounds in normalized units.
    pub span: Span,
    /// Spectrum samples inside the bin, bounds inclusive.
    pub samples: Range<usize>,
    pub smoothed: Option<SmoothedBin>,
    pub fitted: Option<FittedBin>,
    pub quadrature: Option<BinQuadrature>,
}

impl BinRecord {
    fn new(span: Span, samples: Range<usize>) -> Self {
        Self {
            span,
            samples,
            smoothed: None,
            fitted: None,
            quadrature: None,
        }
    }
}

#[derive(Debug)]
pub struct GlqSpectrum {
    table: SpectrumTable,
    wl_norm: f64,
    provider: Box<dyn CrossSectionProvider>,
    totals: FluxTotals,
    columns: WorkingColumns,
    species: Vec<Species>,
    binning: Option<Binning>,
    bins: Vec<BinRecord>,
    stage: PipelineStage,
    spans: Spans,
    normalization: Option<Normalization>,
    last_smoothing: Option<SmoothingParams>,
    last_quadrature: Option<QuadratureParams>,
}

impl GlqSpectrum {
    /// Wavelengths in nm.
    pub fn new(table: SpectrumTable) -> GlqResult<Self> {
        Self::with_wavelength_unit(table, NM)
    }

    /// `wl_norm` is the working wavelength unit in cm.
    pub fn with_wavelength_unit(table: SpectrumTable, wl_norm: f64) -> GlqResult<Self> {
        if !wl_norm.is_finite() || wl_norm <= 0.0 {
            return Err(GlqError::configuration(
                "CONFIG.WAVELENGTH_UNIT",
                format!("wavelength unit must be positive and finite, got {wl_norm}"),
            ));
        }
        let (flux, photons) = table.integrated_totals(table.domain())?;
        let totals = FluxTotals {
            flux_total: flux,
            photon_total: photons,
            flux_resolved: flux,
            photon_resolved: photons,
        };
        let columns = WorkingColumns::new(&table, wl_norm, &totals);
        info!(
            mission = table.mission(),
            date = table.date(),
            samples = table.len(),
            "loaded spectrum"
        );

        Ok(Self {
            table,
            wl_norm,
            provider: Box::new(VernerTable::builtin()),
            totals,
            columns,
            species: Vec::new(),
            binning: None,
            bins: Vec::new(),
            stage: PipelineStage::Unbinned,
            spans: Spans::default(),
            normalization: None,
            last_smoothing: None,
            last_quadrature: None,
        })
    }

    /// Replaces the cross-section source used by later `add_species` calls.
    pub fn with_provider(mut self, provider: impl CrossSectionProvider + 'static) -> Self {
        self.provider = Box::new(provider);
        self
    }

    pub fn table(&self) -> &SpectrumTable {
        &self.table
    }

    pub fn wl_norm(&self) -> f64 {
        self.wl_norm
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn totals(&self) -> &FluxTotals {
        &self.totals
    }

    pub fn columns(&self) -> &WorkingColumns {
        &self.columns
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn spans(&self) -> &Spans {
        &self.spans
    }

    pub fn normalization(&self) -> Option<&Normalization> {
        self.normalization.as_ref()
    }

    pub fn bins(&self) -> &[BinRecord] {
        &self.bins
    }

    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }

    pub fn monochromatic_wavelength(&self) -> Option<f64> {
        match self.binning {
            Some(Binning::Monochromatic { wavelength }) => Some(wavelength),
            _ => None,
        }
    }

    /// Spectrum domain in normalized units.
    pub fn domain(&self) -> Span {
        let wavelength = &self.columns.wavelength;
        Span {
            lo: wavelength[0],
            hi: wavelength[wavelength.len() - 1],
        }
    }

    /// Current breaks; the spectrum domain before any binning.
    pub fn bin_breaks(&self) -> Vec<f64> {
        match &self.binning {
            None => {
                let domain = self.domain();
                vec![domain.lo, domain.hi]
            }
            Some(Binning::Monochromatic { wavelength }) => vec![*wavelength],
            Some(Binning::Bins { breaks }) => breaks.clone(),
        }
    }

    /// Threshold wavelengths of the tracked species, ascending.
    pub fn species_edges(&self) -> Vec<f64> {
        let mut edges: Vec<f64> = self
            .species
            .iter()
            .map(Species::threshold_wavelength)
            .collect();
        edges.sort_by(f64::total_cmp);
        edges.dedup();
        edges
    }

    /// Partitions the spectrum at `breaks` (normalized units). A single value
    /// selects monochromatic mode. All per-bin state is reset.
    pub fn bin(&mut self, breaks: &[f64]) -> GlqResult<BinReport> {
        let report = sanitize_breaks(breaks, self.domain())?;
        self.bins = match &report.binning {
            Binning::Monochromatic { .. } => Vec::new(),
            Binning::Bins { breaks } => breaks
                .windows(2)
                .map(|pair| {
                    let span = Span {
                        lo: pair[0],
                        hi: pair[1],
                    };
                    BinRecord::new(span, sample_range(&self.columns.wavelength, span))
                })
                .collect(),
        };
        self.binning = Some(report.binning.clone());
        self.columns.clear_smoothing();
        self.stage = PipelineStage::Binned;
        debug!(n_bins = report.n_bins(), "binned spectrum");
        Ok(report)
    }

    /// Tracks a species by spectroscopic name (`"He II"`) and inserts its
    /// threshold wavelength as a bin break. Adding a tracked species again
    /// only warns.
    pub fn add_species(&mut self, name: &str) -> GlqResult<()> {
        let species = Species::resolve(
            self.provider.as_ref(),
            name,
            self.table.energy(),
            self.wl_norm,
        )?;
        if self.species.iter().any(|tracked| tracked.name() == species.name()) {
            warn!(species = %species.name(), "species already tracked");
            return Ok(());
        }

        let edge = species.threshold_wavelength();
        let current = self.bin_breaks();
        if !current.contains(&edge) {
            let breaks = with_species_edge(&current, edge, &self.species_edges(), self.wl_norm);
            let report = self.bin(&breaks)?;
            if !self.bin_breaks().contains(&edge) {
                warn!(
                    species = %species.name(),
                    edge,
                    "species edge lies outside the spectrum domain"
                );
            }
            debug!(n_bins = report.n_bins(), "rebinned at species edge");
        }
        info!(species = %species.name(), edge, "added species");
        self.species.push(species);
        Ok(())
    }

    /// Stops tracking a species. Its edge is removed from the breaks unless
    /// another tracked species shares it.
    pub fn remove_species(&mut self, name: &str) -> GlqResult<()> {
        let parsed: SpeciesName = name.parse()?;
        let Some(index) = self
            .species
            .iter()
            .position(|tracked| *tracked.name() == parsed)
        else {
            return Err(GlqError::configuration(
                "CONFIG.SPECIES_UNKNOWN",
                format!("species {parsed} is not tracked"),
            ));
        };

        let edge = self.species[index].threshold_wavelength();
        let shared = self
            .species
            .iter()
            .enumerate()
            .any(|(other, tracked)| other != index && tracked.threshold_wavelength() == edge);
        let current = self.bin_breaks();

        if !shared {
            if !matches!(self.binning, Some(Binning::Bins { .. })) || !current.contains(&edge) {
                warn!(species = %parsed, edge, "species edge is not a bin break");
            } else if current.len() <= 2 {
                warn!(species = %parsed, edge, "keeping species edge, removing it would leave no bins");
            } else {
                self.bin(&without_edge(&current, edge))?;
            }
        }
        self.species.remove(index);
        info!(species = %parsed, "removed species");
        Ok(())
    }

    /// Restricts the bins to `[wl_min, wl_max]` (normalized units). `wl_max`
    /// defaults to the longest species threshold wavelength.
    pub fn truncate(&mut self, wl_min: Option<f64>, wl_max: Option<f64>) -> GlqResult<BinReport> {
        let edges = self.species_edges();
        let wl_max = match wl_max.or_else(|| edges.last().copied()) {
            Some(value) => value,
            None => {
                return Err(GlqError::configuration(
                    "CONFIG.TRUNCATION",
                    "truncation needs wl_max or at least one tracked species",
                ));
            }
        };
        let breaks = truncated_breaks(&self.bin_breaks(), &edges, wl_min, wl_max, self.wl_norm)?;
        self.bin(&breaks)
    }

    /// Inserts a break, rebins and smooths every bin with the last smoothing
    /// parameters (defaults if none were used yet).
    pub fn add_bin_edge(&mut self, wavelength: f64) -> GlqResult<BinReport> {
        let report = self.bin(&with_edge(&self.bin_breaks(), wavelength))?;
        let params = self.last_smoothing.unwrap_or_default();
        self.smooth_all(&params)?;
        Ok(report)
    }

    /// Smooths one bin, discarding its fit and quadrature.
    pub fn smooth(&mut self, bin_id: usize, params: &SmoothingParams) -> GlqResult<()> {
        self.require_stage(PipelineStage::Binned, "PRECONDITION.BIN", "bin the spectrum")?;
        self.check_bin_id(bin_id)?;
        let smoothed = self.compute_smoothing(bin_id, params)?;
        self.store_smoothing(bin_id, smoothed);
        self.last_smoothing = Some(*params);
        self.settle_stage();
        Ok(())
    }

    pub fn smooth_all(&mut self, params: &SmoothingParams) -> GlqResult<()> {
        self.require_stage(PipelineStage::Binned, "PRECONDITION.BIN", "bin the spectrum")?;
        let smoothed = (0..self.bins.len())
            .map(|bin_id| self.compute_smoothing(bin_id, params))
            .collect::<GlqResult<Vec<_>>>()?;

        self.columns.clear_smoothing();
        for (bin_id, record) in smoothed.into_iter().enumerate() {
            self.store_smoothing(bin_id, record);
        }
        self.last_smoothing = Some(*params);
        if self.bins.is_empty() {
            self.stage = PipelineStage::Smoothed;
        } else {
            self.settle_stage();
        }
        Ok(())
    }

    /// Fits polynomials to one smoothed bin, discarding its quadrature.
    pub fn fit(&mut self, bin_id: usize, params: &FitParams) -> GlqResult<()> {
        self.check_bin_id(bin_id)?;
        let fitted = self.compute_fit(bin_id, params)?;
        let record = &mut self.bins[bin_id];
        record.fitted = Some(fitted);
        record.quadrature = None;
        self.settle_stage();
        Ok(())
    }

    pub fn fit_all(&mut self, params: &FitParams) -> GlqResult<()> {
        self.require_stage(PipelineStage::Smoothed, "PRECONDITION.SMOOTH", "smooth every bin")?;
        let fitted = (0..self.bins.len())
            .map(|bin_id| self.compute_fit(bin_id, params))
            .collect::<GlqResult<Vec<_>>>()?;

        for (record, fit) in self.bins.iter_mut().zip(fitted) {
            record.fitted = Some(fit);
            record.quadrature = None;
        }
        if self.bins.is_empty() {
            self.stage = PipelineStage::Fitted;
        } else {
            self.settle_stage();
        }
        Ok(())
    }

    /// Places Gauss-Legendre nodes in every fitted sub-bin inside the window
    /// and records the window span. A degenerate window records the span and
    /// places no nodes.
    pub fn abscissas(&mut self, params: &QuadratureParams) -> GlqResult<()> {
        self.require_stage(PipelineStage::Fitted, "PRECONDITION.FIT", "fit every bin")?;
        if let Some(wavelength) = self.monochromatic_wavelength() {
            self.spans.window = Some(Span {
                lo: wavelength,
                hi: wavelength,
            });
            self.last_quadrature = Some(*params);
            self.stage = PipelineStage::QuadratureReady;
            return Ok(());
        }

        let window = params.window.unwrap_or_else(|| self.binned_domain());
        let quadrature = self.compute_quadrature(window, params, &self.totals)?;
        for (record, nodes) in self.bins.iter_mut().zip(quadrature) {
            record.quadrature = Some(nodes);
        }
        self.spans.window = Some(window);
        self.last_quadrature = Some(QuadratureParams {
            window: Some(window),
            ..*params
        });
        self.stage = PipelineStage::QuadratureReady;
        debug!(
            lo = window.lo,
            hi = window.hi,
            nodes = self.node_count(),
            "placed quadrature nodes"
        );
        Ok(())
    }

    /// Recomputes the totals over `normalized` and the resolved totals over
    /// `resolved` (defaults to `normalized`), rescales the working columns and
    /// derives the per-species means. Existing node weights follow the new
    /// resolved photon total.
    pub fn normalize(&mut self, normalized: Span, resolved: Option<Span>) -> GlqResult<&Normalization> {
        self.require_stage(PipelineStage::Binned, "PRECONDITION.BIN", "bin the spectrum")?;
        let resolved = resolved.unwrap_or(normalized);
        let normalization = normalize(&self.table, &self.species, normalized, resolved, self.wl_norm)?;

        let requantized = match (self.stage, self.last_quadrature) {
            (PipelineStage::QuadratureReady, Some(params)) if !self.bins.is_empty() => {
                let window = params.window.unwrap_or_else(|| self.binned_domain());
                Some(self.compute_quadrature(window, &params, &normalization.totals)?)
            }
            _ => None,
        };
        if let Some(quadrature) = requantized {
            for (record, nodes) in self.bins.iter_mut().zip(quadrature) {
                record.quadrature = Some(nodes);
            }
        }

        self.totals = normalization.totals;
        self.columns.rescale(&self.table, self.wl_norm, &self.totals);
        self.spans.normalized = Some(normalized);
        self.spans.resolved = Some(resolved);
        info!(
            flux_total = self.totals.flux_total,
            photon_resolved = self.totals.photon_resolved,
            "normalized spectrum"
        );
        Ok(self.normalization.insert(normalization))
    }

    /// Nodes placed across all bins.
    pub fn node_count(&self) -> usize {
        self.bins
            .iter()
            .filter_map(|record| record.quadrature.as_ref())
            .map(BinQuadrature::node_count)
            .sum()
    }

    fn require_stage(
        &self,
        required: PipelineStage,
        placeholder: &'static str,
        action: &str,
    ) -> GlqResult<()> {
        if self.stage < required {
            return Err(GlqError::precondition(
                placeholder,
                format!("{action} first, pipeline is {}", self.stage),
            ));
        }
        Ok(())
    }

    fn check_bin_id(&self, bin_id: usize) -> GlqResult<()> {
        if self.binning.is_none() {
            return Err(GlqError::precondition(
                "PRECONDITION.BIN",
                "bin the spectrum first",
            ));
        }
        if bin_id >= self.bins.len() {
            return Err(GlqError::configuration(
                "CONFIG.BIN_ID",
                format!("bin {bin_id} does not exist, spectrum has {} bins", self.bins.len()),
            ));
        }
        Ok(())
    }

    /// Stage implied by the per-bin records.
    fn settle_stage(&mut self) {
        if self.bins.is_empty() {
            return;
        }
        self.stage = if self.bins.iter().any(|record| record.smoothed.is_none()) {
            PipelineStage::Binned
        } else if self.bins.iter().any(|record| record.fitted.is_none()) {
            PipelineStage::Smoothed
        } else if self.bins.iter().any(|record| record.quadrature.is_none()) {
            PipelineStage::Fitted
        } else {
            PipelineStage::QuadratureReady
        };
    }

    /// Bounds of the binned region, or the monochromatic wavelength.
    fn binned_domain(&self) -> Span {
        let breaks = self.bin_breaks();
        Span {
            lo: breaks[0],
            hi: breaks[breaks.len() - 1],
        }
    }

    fn compute_smoothing(&self, bin_id: usize, params: &SmoothingParams) -> GlqResult<SmoothedBin> {
        let record = &self.bins[bin_id];
        let range = record.samples.clone();
        let conserved = match params.conserve {
            ConservedQuantity::PhotonFlux => &self.columns.photon_flux,
            ConservedQuantity::EnergyFlux => &self.columns.flux,
        };
        let curve = smooth_bin(
            &self.columns.wavelength[range.clone()],
            &conserved[range.clone()],
            record.span,
            params,
        )?;

        let wl = &self.table.wavelength()[range.clone()];
        let simpson = |values: &[f64]| {
            integrate_simpson(wl, values)
                .map_err(|error| GlqError::computation("COMPUTE.INTEGRATION", error.to_string()))
        };
        let mean_energy = simpson(&self.table.flux()[range.clone()])?
            / simpson(&self.table.photon_flux()[range.clone()])?;
        debug!(bin_id, n_passes = curve.n_passes, mean_energy, "smoothed bin");

        Ok(SmoothedBin {
            samples: range,
            conserved: params.conserve,
            mean_energy,
            curve,
        })
    }

    /// Writes the smoothed conserved column and its companion into the
    /// working columns. Samples on a shared edge take the later bin.
    fn store_smoothing(&mut self, bin_id: usize, smoothed: SmoothedBin) {
        let factor = companion_factor(smoothed.conserved, smoothed.mean_energy, &self.totals);
        let (conserved, companion) = match smoothed.conserved {
            ConservedQuantity::PhotonFlux => (
                &mut self.columns.photon_flux_smooth,
                &mut self.columns.flux_smooth,
            ),
            ConservedQuantity::EnergyFlux => (
                &mut self.columns.flux_smooth,
                &mut self.columns.photon_flux_smooth,
            ),
        };
        for (offset, index) in smoothed.samples.clone().enumerate() {
            let value = smoothed.curve.smoothed[offset];
            conserved[index] = Some(value);
            companion[index] = Some(value * factor);
            self.columns.bin[index] = Some(bin_id);
        }

        let record = &mut self.bins[bin_id];
        record.smoothed = Some(smoothed);
        record.fitted = None;
        record.quadrature = None;
    }

    fn compute_fit(&self, bin_id: usize, params: &FitParams) -> GlqResult<FittedBin> {
        let record = &self.bins[bin_id];
        let Some(smoothed) = &record.smoothed else {
            return Err(GlqError::precondition(
                "PRECONDITION.SMOOTH",
                format!("smooth bin {bin_id} before fitting it"),
            ));
        };
        let fitted = fit_bin(
            &self.columns.wavelength[record.samples.clone()],
            &smoothed.curve.interpolant,
            &smoothed.curve.critical_points,
            params,
            params.scaled_tolerance(self.wl_norm),
        )?;
        debug!(bin_id, degrees = ?fitted.degrees(), "fitted bin");
        Ok(fitted)
    }

    fn compute_quadrature(
        &self,
        window: Span,
        params: &QuadratureParams,
        totals: &FluxTotals,
    ) -> GlqResult<Vec<BinQuadrature>> {
        self.bins
            .iter()
            .enumerate()
            .map(|(bin_id, record)| {
                let (Some(smoothed), Some(fitted)) = (&record.smoothed, &record.fitted) else {
                    return Err(GlqError::precondition(
                        "PRECONDITION.FIT",
                        format!("fit bin {bin_id} before placing nodes"),
                    ));
                };
                let range = record.samples.clone();
                let samples = BinSamples {
                    wavelength: &self.columns.wavelength[range.clone()],
                    wavelength_cm: &self.table.wavelength()[range.clone()],
                    photon_flux: &self.table.photon_flux()[range],
                };
                bin_abscissas(
                    fitted,
                    &smoothed.curve.interpolant,
                    samples,
                    window,
                    params,
                    totals.photon_resolved,
                )
            })
            .collect()
    }
}

/// Indices of the samples inside `span`, bounds inclusive.
fn sample_range(wavelength: &[f64], span: Span) -> Range<usize> {
    let start = wavelength.partition_point(|wl| *wl < span.lo);
    let end = wavelength.partition_point(|wl| *wl <= span.hi);
    start..end.max(start)
}

#[cfg(test)]
mod tests {
    use super::{GlqSpectrum, sample_range};
    use crate::common::constants::NM;
    use crate::domain::{PipelineStage, Span};
    use crate::modules::{FitParams, QuadratureParams, SmoothingParams};
    use crate::spectrum::{SpectralSample, SpectrumTable};

    fn spectrum() -> GlqSpectrum {
        let samples = (0..=280).map(|i| {
            let wl = 10.0 + 0.5 * i as f64;
            SpectralSample::new(wl * NM, 1.0 + 0.3 * (wl / 7.0).sin())
        });
        let table = SpectrumTable::from_samples("synthetic", "2002-01-01", samples).expect("table");
        GlqSpectrum::new(table).expect("pipeline")
    }

    #[test]
    fn sample_ranges_include_both_bounds() {
        let wl = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(sample_range(&wl, Span { lo: 2.0, hi: 3.0 }), 1..3);
        assert_eq!(sample_range(&wl, Span { lo: 2.5, hi: 2.6 }), 2..2);
    }

    #[test]
    fn stages_advance_in_order_and_rebinning_resets_them() {
        let mut pipeline = spectrum();
        assert_eq!(pipeline.stage(), PipelineStage::Unbinned);
        let error = pipeline
            .smooth_all(&SmoothingParams::default())
            .expect_err("not binned");
        assert_eq!(error.placeholder(), "PRECONDITION.BIN");

        pipeline.bin(&[20.0, 60.0, 120.0]).expect("bin");
        assert_eq!(pipeline.stage(), PipelineStage::Binned);
        let error = pipeline.fit_all(&FitParams::default()).expect_err("not smoothed");
        assert_eq!(error.placeholder(), "PRECONDITION.SMOOTH");

        pipeline.smooth(0, &SmoothingParams::default()).expect("smooth bin 0");
        assert_eq!(pipeline.stage(), PipelineStage::Binned);
        let error = pipeline.fit(1, &FitParams::default()).expect_err("bin 1 unsmoothed");
        assert_eq!(error.placeholder(), "PRECONDITION.SMOOTH");

        pipeline.smooth(1, &SmoothingParams::default()).expect("smooth bin 1");
        assert_eq!(pipeline.stage(), PipelineStage::Smoothed);
        pipeline.fit_all(&FitParams::default()).expect("fit");
        assert_eq!(pipeline.stage(), PipelineStage::Fitted);
        pipeline.abscissas(&QuadratureParams::default()).expect("nodes");
        assert_eq!(pipeline.stage(), PipelineStage::QuadratureReady);

        pipeline.smooth(0, &SmoothingParams::default()).expect("resmooth");
        assert_eq!(pipeline.stage(), PipelineStage::Smoothed);
        assert!(pipeline.bins()[0].fitted.is_none());
        assert!(pipeline.bins()[1].quadrature.is_some());

        pipeline.bin(&[20.0, 60.0, 120.0]).expect("rebin");
        assert_eq!(pipeline.stage(), PipelineStage::Binned);
        assert!(pipeline.bins().iter().all(|record| record.smoothed.is_none()));
        assert!(pipeline.columns().bin.iter().all(Option::is_none));
    }

    #[test]
    fn unknown_bins_and_species_are_configuration_errors() {
        let mut pipeline = spectrum();
        pipeline.bin(&[20.0, 60.0]).expect("bin");
        let error = pipeline
            .smooth(3, &SmoothingParams::default())
            .expect_err("no bin 3");
        assert_eq!(error.placeholder(), "CONFIG.BIN_ID");

        let error = pipeline.remove_species("H I").expect_err("not tracked");
        assert_eq!(error.placeholder(), "CONFIG.SPECIES_UNKNOWN");
        let error = pipeline.truncate(None, None).expect_err("no species");
        assert_eq!(error.placeholder(), "CONFIG.TRUNCATION");
    }

    #[test]
    fn smoothing_fills_both_columns_with_a_consistent_companion() {
        let mut pipeline = spectrum();
        pipeline.bin(&[20.0, 60.0, 120.0]).expect("bin");
        pipeline.smooth_all(&SmoothingParams::default()).expect("smooth");

        let columns = pipeline.columns();
        let record = &pipeline.bins()[0];
        let smoothed = record.smoothed.as_ref().expect("smoothed");
        let ratio_expected = smoothed.mean_energy * pipeline.totals().photon_resolved
            / pipeline.totals().flux_resolved;
        let index = record.samples.start + 3;
        let phi = columns.photon_flux_smooth[index].expect("phi");
        let flux = columns.flux_smooth[index].expect("flux");
        assert!((flux / phi - ratio_expected).abs() <= 1.0e-12 * ratio_expected);
        assert_eq!(columns.bin[index], Some(0));
        assert_eq!(columns.bin[pipeline.bins()[1].samples.start], Some(1));
    }
}
