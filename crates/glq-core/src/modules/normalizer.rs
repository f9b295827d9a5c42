use crate::domain::{GlqError, GlqResult, Span};
use crate::numerics::integrate_simpson;
use crate::species::Species;
use crate::spectrum::{FluxTotals, SpectrumTable};
use tracing::warn;

/// Photon-flux weighted cross section and effective ionization potential of
/// one species over the resolved span, used by meta-particle output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeciesMean {
    /// `∫Φσ dλ / Φ_rslv` (cm^2).
    pub sigma_mean: f64,
    /// Mean photon energy minus the mean excess energy deposited per
    /// ionization (erg).
    pub ionization_potential: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalization {
    /// Spans in normalized units.
    pub normalized: Span,
    pub resolved: Span,
    pub totals: FluxTotals,
    /// In species order.
    pub species_means: Vec<SpeciesMean>,
}

/// Integrates the cgs table over the two spans (normalized units) and
/// derives per-species means over the resolved span.
pub fn normalize(
    table: &SpectrumTable,
    species: &[Species],
    normalized: Span,
    resolved: Span,
    wl_norm: f64,
) -> GlqResult<Normalization> {
    let (flux_total, photon_total) = table.integrated_totals(normalized.scaled(wl_norm))?;
    let (flux_resolved, photon_resolved) = table.integrated_totals(resolved.scaled(wl_norm))?;
    let totals = FluxTotals {
        flux_total,
        photon_total,
        flux_resolved,
        photon_resolved,
    };

    let range = table.sample_range(resolved.scaled(wl_norm));
    let wl = &table.wavelength()[range.clone()];
    let photons = &table.photon_flux()[range.clone()];
    let energy = &table.energy()[range.clone()];

    let mut species_means = Vec::with_capacity(species.len());
    for entry in species {
        let sigma = &entry.sigma_samples()[range.clone()];
        let absorbed: Vec<f64> = photons.iter().zip(sigma).map(|(phi, s)| phi * s).collect();
        let excess: Vec<f64> = absorbed
            .iter()
            .zip(energy)
            .map(|(rate, e)| rate * (e - entry.threshold_energy()))
            .collect();
        let sigma_mean = simpson(wl, &absorbed)? / photon_resolved;
        let ionization_potential = if sigma_mean > 0.0 {
            totals.mean_energy() - simpson(wl, &excess)? / photon_resolved / sigma_mean
        } else {
            warn!(
                species = %entry.name(),
                "species does not absorb in the resolved span; using its threshold as the mean potential"
            );
            entry.threshold_energy()
        };
        species_means.push(SpeciesMean {
            sigma_mean,
            ionization_potential,
        });
    }

    Ok(Normalization {
        normalized,
        resolved,
        totals,
        species_means,
    })
}

fn simpson(x: &[f64], y: &[f64]) -> GlqResult<f64> {
    integrate_simpson(x, y)
        .map_err(|error| GlqError::computation("COMPUTE.INTEGRATION", error.to_string()))
}
