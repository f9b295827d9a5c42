use super::GlqSpectrum;
use crate::common::constants::HC;
use crate::domain::{GlqError, GlqResult, OutputKind, PipelineStage, Span};
use crate::modules::{
    ENERGY_COLUMN, QuadratureTable, TableHeader, WEIGHT_COLUMN, sigma_column, write_text_artifact,
};
use std::path::Path;
use tracing::{info, warn};

impl GlqSpectrum {
    /// Builds the output table of `kind` without touching the filesystem.
    /// `mono_wl` (normalized units) is required by `fixed` and must equal the
    /// window's lower bound.
    pub fn build_table(&self, kind: OutputKind, mono_wl: Option<f64>) -> GlqResult<QuadratureTable> {
        self.check_output_preconditions(kind)?;

        let fixed_wavelength = match kind {
            OutputKind::Fixed => Some(self.fixed_wavelength(mono_wl)?),
            _ => None,
        };
        let mean_energy = self.totals.mean_energy();
        let point_wavelength = match kind {
            OutputKind::Fixed => fixed_wavelength,
            OutputKind::Mono => self.monochromatic_wavelength().or_else(|| {
                self.spans
                    .window
                    .filter(Span::is_degenerate)
                    .map(|window| window.lo)
            }),
            _ => None,
        };
        let point_energy = point_wavelength
            .map(|wavelength| HC / (wavelength * self.wl_norm))
            .unwrap_or(mean_energy);

        let rows = match kind {
            OutputKind::Full => self.node_rows(),
            OutputKind::Meta => {
                let mut row = vec![point_energy, 1.0];
                row.extend(self.species_means()?.iter().map(|mean| mean.sigma_mean));
                vec![row]
            }
            OutputKind::Mono | OutputKind::Fixed => {
                let mut row = vec![point_energy, 1.0];
                row.extend(self.species.iter().map(|entry| entry.cross_section_at(point_energy)));
                vec![row]
            }
        };

        let ionization_potentials = match kind {
            OutputKind::Meta => self
                .species_means()?
                .iter()
                .map(|mean| mean.ionization_potential)
                .collect(),
            _ => self.species.iter().map(|entry| entry.threshold_energy()).collect(),
        };

        let window = match (self.spans.window, fixed_wavelength) {
            (Some(window), _) => window,
            (None, Some(wavelength)) => Span {
                lo: wavelength,
                hi: wavelength,
            },
            (None, None) => self.fallback_span("window"),
        };
        let resolved = self
            .spans
            .resolved
            .unwrap_or_else(|| self.fallback_span("resolved"));
        let normalized = self
            .spans
            .normalized
            .unwrap_or_else(|| self.fallback_span("normalized"));

        let mut columns = vec![ENERGY_COLUMN.to_string(), WEIGHT_COLUMN.to_string()];
        columns.extend(self.species.iter().map(|entry| sigma_column(&entry.name().compact())));

        Ok(QuadratureTable {
            header: TableHeader {
                npts: rows.len(),
                nspecies: self.species.len(),
                f_to_phi: self.totals.photon_resolved / self.totals.flux_total,
                phi_frac: self.totals.photon_resolved / self.totals.photon_total,
                date: self.table.date().to_string(),
                kind,
                window: window.scaled(self.wl_norm),
                resolved: resolved.scaled(self.wl_norm),
                normalized: normalized.scaled(self.wl_norm),
                ionization_potentials,
            },
            columns,
            rows,
        })
    }

    /// Builds the table and writes it to `path`. Nothing is written when the
    /// table cannot be built.
    pub fn write(
        &self,
        path: &Path,
        kind: OutputKind,
        mono_wl: Option<f64>,
    ) -> GlqResult<QuadratureTable> {
        let table = self.build_table(kind, mono_wl)?;
        write_text_artifact(path, &table.render())?;
        info!(path = %path.display(), kind = %kind, npts = table.header.npts, "wrote quadrature table");
        Ok(table)
    }

    fn check_output_preconditions(&self, kind: OutputKind) -> GlqResult<()> {
        if self.stage == PipelineStage::Unbinned {
            return Err(GlqError::precondition(
                "PRECONDITION.BIN",
                "bin the spectrum before writing it",
            ));
        }
        if !kind.is_single_point() && self.bins.is_empty() {
            return Err(GlqError::configuration(
                "CONFIG.OUTPUT_KIND",
                "full output needs at least one bin, spectrum is monochromatic",
            ));
        }
        if !self.bins.is_empty() && self.stage < PipelineStage::QuadratureReady {
            return Err(GlqError::precondition(
                "PRECONDITION.ABSCISSAS",
                format!("place quadrature nodes before writing, pipeline is {}", self.stage),
            ));
        }
        if kind == OutputKind::Meta {
            self.species_means()?;
        }
        Ok(())
    }

    fn fixed_wavelength(&self, mono_wl: Option<f64>) -> GlqResult<f64> {
        let Some(wavelength) = mono_wl else {
            return Err(GlqError::configuration(
                "CONFIG.FIXED_WAVELENGTH",
                "fixed output needs a monochromatic wavelength",
            ));
        };
        match self.spans.window {
            Some(window) if window.lo == wavelength => Ok(wavelength),
            Some(window) => Err(GlqError::configuration(
                "CONFIG.FIXED_WAVELENGTH",
                format!(
                    "fixed wavelength {wavelength} must equal the window lower bound {}",
                    window.lo
                ),
            )),
            None => Err(GlqError::configuration(
                "CONFIG.FIXED_WAVELENGTH",
                "fixed output needs a window, place quadrature nodes first",
            )),
        }
    }

    fn species_means(&self) -> GlqResult<&[crate::modules::SpeciesMean]> {
        match &self.normalization {
            Some(normalization) if normalization.species_means.len() == self.species.len() => {
                Ok(&normalization.species_means)
            }
            Some(_) => Err(GlqError::precondition(
                "PRECONDITION.NORMALIZE",
                "tracked species changed since the last normalization, normalize again",
            )),
            None => Err(GlqError::precondition(
                "PRECONDITION.NORMALIZE",
                "meta output needs normalize to have run",
            )),
        }
    }

    fn node_rows(&self) -> Vec<Vec<f64>> {
        self.bins
            .iter()
            .filter_map(|record| record.quadrature.as_ref())
            .flat_map(|quadrature| quadrature.nodes.iter().flatten())
            .flat_map(|nodes| nodes.abscissas.iter().zip(&nodes.weights))
            .map(|(wavelength, weight)| {
                let energy = HC / (wavelength * self.wl_norm);
                let mut row = vec![energy, *weight];
                row.extend(self.species.iter().map(|entry| entry.cross_section_at(energy)));
                row
            })
            .collect()
    }

    fn fallback_span(&self, name: &str) -> Span {
        warn!(span = name, "span never set, using the binned domain");
        self.binned_domain()
    }
}
