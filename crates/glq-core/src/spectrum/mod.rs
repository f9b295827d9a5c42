mod loader;

use crate::common::constants::{EV, HC};
use crate::domain::{GlqError, GlqResult, Span};
use crate::numerics::integrate_simpson;
use tracing::debug;

pub use loader::SpectrumRecord;

/// One observed sample in cgs units: wavelength (cm), spectral flux density
/// (erg s^-1 cm^-2 cm^-1) and an optional uncertainty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralSample {
    pub wavelength: f64,
    pub flux: f64,
    pub uncertainty: Option<f64>,
}

impl SpectralSample {
    pub fn new(wavelength: f64, flux: f64) -> Self {
        Self {
            wavelength,
            flux,
            uncertainty: None,
        }
    }
}

/// Observed spectrum sorted by wavelength, with photon energy and photon
/// flux density derived per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumTable {
    mission: String,
    date: String,
    wavelength: Vec<f64>,
    energy: Vec<f64>,
    flux: Vec<f64>,
    photon_flux: Vec<f64>,
    uncertainty: Vec<Option<f64>>,
}

impl SpectrumTable {
    /// Drops samples with non-positive flux, sorts by wavelength and rejects
    /// repeated wavelengths.
    pub fn from_samples(
        mission: impl Into<String>,
        date: impl Into<String>,
        samples: impl IntoIterator<Item = SpectralSample>,
    ) -> GlqResult<Self> {
        let mut kept = Vec::new();
        let mut dropped = 0_usize;
        for sample in samples {
            if !sample.wavelength.is_finite() || sample.wavelength <= 0.0 {
                return Err(GlqError::configuration(
                    "CONFIG.SPECTRUM_WAVELENGTH",
                    format!("spectrum wavelength must be positive and finite, got {}", sample.wavelength),
                ));
            }
            if sample.flux.is_finite() && sample.flux > 0.0 {
                kept.push(sample);
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(dropped, "dropped spectrum samples with non-positive flux");
        }

        kept.sort_by(|left, right| left.wavelength.total_cmp(&right.wavelength));
        if let Some(pair) = kept
            .windows(2)
            .find(|pair| pair[0].wavelength == pair[1].wavelength)
        {
            return Err(GlqError::configuration(
                "CONFIG.SPECTRUM_DUPLICATE",
                format!("spectrum repeats wavelength {} cm", pair[0].wavelength),
            ));
        }
        if kept.len() < 2 {
            return Err(GlqError::configuration(
                "CONFIG.SPECTRUM_SIZE",
                format!("spectrum needs at least 2 samples with positive flux, got {}", kept.len()),
            ));
        }

        let wavelength: Vec<f64> = kept.iter().map(|sample| sample.wavelength).collect();
        let energy: Vec<f64> = wavelength.iter().map(|wl| HC / wl).collect();
        let flux: Vec<f64> = kept.iter().map(|sample| sample.flux).collect();
        let photon_flux = flux.iter().zip(&energy).map(|(f, e)| f / e).collect();
        let uncertainty = kept.iter().map(|sample| sample.uncertainty).collect();

        Ok(Self {
            mission: mission.into(),
            date: date.into(),
            wavelength,
            energy,
            flux,
            photon_flux,
            uncertainty,
        })
    }

    pub fn mission(&self) -> &str {
        &self.mission
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    /// Wavelengths (cm), strictly increasing.
    pub fn wavelength(&self) -> &[f64] {
        &self.wavelength
    }

    /// Photon energies `hc/λ` (erg).
    pub fn energy(&self) -> &[f64] {
        &self.energy
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn photon_flux(&self) -> &[f64] {
        &self.photon_flux
    }

    pub fn uncertainty(&self) -> &[Option<f64>] {
        &self.uncertainty
    }

    /// Wavelength domain (cm).
    pub fn domain(&self) -> Span {
        Span {
            lo: self.wavelength[0],
            hi: self.wavelength[self.wavelength.len() - 1],
        }
    }

    /// Index range of the samples inside `span_cm`, bounds inclusive.
    pub fn sample_range(&self, span_cm: Span) -> std::ops::Range<usize> {
        let start = self.wavelength.partition_point(|wl| *wl < span_cm.lo);
        let end = self.wavelength.partition_point(|wl| *wl <= span_cm.hi);
        start..end.max(start)
    }

    /// `(∫F dλ, ∫Φ dλ)` over the samples inside `span_cm`.
    pub fn integrated_totals(&self, span_cm: Span) -> GlqResult<(f64, f64)> {
        let range = self.sample_range(span_cm);
        if range.len() < 2 {
            return Err(GlqError::configuration(
                "CONFIG.SPAN_SAMPLES",
                format!(
                    "span [{:e}, {:e}] cm covers {} spectrum samples, need at least 2",
                    span_cm.lo,
                    span_cm.hi,
                    range.len()
                ),
            ));
        }
        let wl = &self.wavelength[range.clone()];
        let flux = integrate_simpson(wl, &self.flux[range.clone()]).map_err(simpson_error)?;
        let photons = integrate_simpson(wl, &self.photon_flux[range]).map_err(simpson_error)?;
        Ok((flux, photons))
    }
}

fn simpson_error(error: crate::numerics::IntegrationError) -> GlqError {
    GlqError::computation("COMPUTE.INTEGRATION", error.to_string())
}

/// Integrated flux and photon flux (cgs) over the normalization (`*_total`)
/// and resolved (`*_resolved`) spans.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluxTotals {
    pub flux_total: f64,
    pub photon_total: f64,
    pub flux_resolved: f64,
    pub photon_resolved: f64,
}

impl FluxTotals {
    /// Mean photon energy of the resolved spectrum (erg).
    pub fn mean_energy(&self) -> f64 {
        self.flux_resolved / self.photon_resolved
    }
}

/// Working columns in normalized units: wavelength in `wl_norm`, energy in
/// eV and flux densities scaled so each integrates to one over the resolved
/// span.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingColumns {
    pub wavelength: Vec<f64>,
    pub energy_ev: Vec<f64>,
    pub flux: Vec<f64>,
    pub photon_flux: Vec<f64>,
    pub flux_smooth: Vec<Option<f64>>,
    pub photon_flux_smooth: Vec<Option<f64>>,
    pub bin: Vec<Option<usize>>,
}

impl WorkingColumns {
    pub fn new(table: &SpectrumTable, wl_norm: f64, totals: &FluxTotals) -> Self {
        let count = table.len();
        let mut columns = Self {
            wavelength: table.wavelength().iter().map(|wl| wl / wl_norm).collect(),
            energy_ev: table.energy().iter().map(|energy| energy / EV).collect(),
            flux: Vec::new(),
            photon_flux: Vec::new(),
            flux_smooth: vec![None; count],
            photon_flux_smooth: vec![None; count],
            bin: vec![None; count],
        };
        columns.rescale(table, wl_norm, totals);
        columns
    }

    /// Recomputes the normalized flux columns from the cgs table.
    pub fn rescale(&mut self, table: &SpectrumTable, wl_norm: f64, totals: &FluxTotals) {
        self.flux = table
            .flux()
            .iter()
            .map(|flux| flux * wl_norm / totals.flux_resolved)
            .collect();
        self.photon_flux = table
            .photon_flux()
            .iter()
            .map(|photons| photons * wl_norm / totals.photon_resolved)
            .collect();
    }

    pub fn clear_smoothing(&mut self) {
        self.flux_smooth.fill(None);
        self.photon_flux_smooth.fill(None);
        self.bin.fill(None);
    }
}

#[cfg(test)]
mod tests {
    use super::{FluxTotals, SpectralSample, SpectrumTable, WorkingColumns};
    use crate::common::constants::{HC, NM};
    use crate::domain::Span;

    fn flat_table() -> SpectrumTable {
        let samples = (0..=20).map(|i| SpectralSample::new((10.0 + i as f64) * NM, 2.0));
        SpectrumTable::from_samples("synthetic", "2002-01-01", samples).expect("table")
    }

    #[test]
    fn samples_are_sorted_and_non_positive_flux_dropped() {
        let samples = vec![
            SpectralSample::new(30.0 * NM, 1.0),
            SpectralSample::new(10.0 * NM, 3.0),
            SpectralSample::new(20.0 * NM, -1.0),
            SpectralSample::new(25.0 * NM, 2.0),
        ];
        let table = SpectrumTable::from_samples("m", "d", samples).expect("table");

        assert_eq!(table.len(), 3);
        assert_eq!(table.wavelength(), [10.0 * NM, 25.0 * NM, 30.0 * NM]);
        assert_eq!(table.domain(), Span { lo: 10.0 * NM, hi: 30.0 * NM });
        assert!((table.energy()[0] * table.wavelength()[0] - HC).abs() <= 1.0e-12 * HC);
        assert_eq!(table.photon_flux()[0], 3.0 / table.energy()[0]);
    }

    #[test]
    fn duplicate_wavelengths_and_tiny_spectra_are_rejected() {
        let duplicate = SpectrumTable::from_samples(
            "m",
            "d",
            [SpectralSample::new(1.0, 1.0), SpectralSample::new(1.0, 2.0)],
        )
        .expect_err("duplicate");
        assert_eq!(duplicate.placeholder(), "CONFIG.SPECTRUM_DUPLICATE");

        let tiny = SpectrumTable::from_samples("m", "d", [SpectralSample::new(1.0, 1.0)])
            .expect_err("one sample");
        assert_eq!(tiny.placeholder(), "CONFIG.SPECTRUM_SIZE");
    }

    #[test]
    fn totals_integrate_inside_a_span() {
        let table = flat_table();
        let (flux, _) = table.integrated_totals(table.domain()).expect("totals");
        assert!((flux - 2.0 * 20.0 * NM).abs() <= 1.0e-12 * flux);

        let narrow = Span { lo: 12.5 * NM, hi: 12.9 * NM };
        let error = table.integrated_totals(narrow).expect_err("no samples");
        assert_eq!(error.placeholder(), "CONFIG.SPAN_SAMPLES");
    }

    #[test]
    fn working_columns_integrate_to_one_over_the_resolved_span() {
        let table = flat_table();
        let (flux, photons) = table.integrated_totals(table.domain()).expect("totals");
        let totals = FluxTotals {
            flux_total: flux,
            photon_total: photons,
            flux_resolved: flux,
            photon_resolved: photons,
        };
        let columns = WorkingColumns::new(&table, NM, &totals);

        assert!((columns.wavelength[0] - 10.0).abs() <= 1.0e-12);
        let integral = crate::numerics::integrate_simpson(&columns.wavelength, &columns.flux)
            .expect("integral");
        assert!((integral - 1.0).abs() <= 1.0e-12);
        assert!(columns.bin.iter().all(Option::is_none));
    }
}
