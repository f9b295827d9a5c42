pub mod notation;
pub mod verner;

pub use notation::{SpeciesName, arabic_to_roman, roman_to_arabic};
pub use verner::{VernerFit, VernerTable};

use crate::common::constants::{EV, HC};
use crate::domain::{GlqError, GlqResult};
use std::fmt::Debug;

/// Photoionization cross section of one species.
pub trait CrossSection: Debug {
    /// Ionization threshold (eV).
    fn threshold_ev(&self) -> f64;
    /// Cross section (cm^2) at `energy_ev`.
    fn sigma(&self, energy_ev: f64) -> f64;
}

pub trait CrossSectionProvider: Debug {
    fn cross_section(&self, name: &SpeciesName) -> Option<Box<dyn CrossSection>>;
}

/// An absorbing species tracked by the pipeline, with its cross section
/// sampled on the spectrum's energies.
#[derive(Debug)]
pub struct Species {
    name: SpeciesName,
    model: Box<dyn CrossSection>,
    threshold_energy: f64,
    threshold_wavelength: f64,
    sigma: Vec<f64>,
}

impl Species {
    /// `energies_erg` are the spectrum's photon energies; `wl_norm` is the
    /// wavelength unit (cm) of the stored threshold wavelength.
    pub fn new(
        name: SpeciesName,
        model: Box<dyn CrossSection>,
        energies_erg: &[f64],
        wl_norm: f64,
    ) -> GlqResult<Self> {
        let threshold_ev = model.threshold_ev();
        if !threshold_ev.is_finite() || threshold_ev <= 0.0 {
            return Err(GlqError::configuration(
                "CONFIG.SPECIES_THRESHOLD",
                format!("species {name} has invalid ionization threshold {threshold_ev} eV"),
            ));
        }

        let threshold_energy = threshold_ev * EV;
        let sigma = energies_erg
            .iter()
            .map(|energy| model.sigma(energy / EV))
            .collect();

        Ok(Self {
            name,
            model,
            threshold_energy,
            threshold_wavelength: HC / threshold_energy / wl_norm,
            sigma,
        })
    }

    /// Parses `name` and resolves its cross section from `provider`.
    pub fn resolve(
        provider: &dyn CrossSectionProvider,
        name: &str,
        energies_erg: &[f64],
        wl_norm: f64,
    ) -> GlqResult<Self> {
        let parsed: SpeciesName = name.parse()?;
        let model = provider.cross_section(&parsed).ok_or_else(|| {
            GlqError::configuration(
                "CONFIG.SPECIES_DATA",
                format!("no cross-section data for species {parsed}"),
            )
        })?;
        Self::new(parsed, model, energies_erg, wl_norm)
    }

    pub fn name(&self) -> &SpeciesName {
        &self.name
    }

    /// Ionization threshold (erg).
    pub fn threshold_energy(&self) -> f64 {
        self.threshold_energy
    }

    /// Threshold wavelength in normalized units.
    pub fn threshold_wavelength(&self) -> f64 {
        self.threshold_wavelength
    }

    /// Cross section at each spectrum sample (cm^2).
    pub fn sigma_samples(&self) -> &[f64] {
        &self.sigma
    }

    /// Cross section (cm^2) at a photon energy in erg.
    pub fn cross_section_at(&self, energy_erg: f64) -> f64 {
        self.model.sigma(energy_erg / EV)
    }
}
