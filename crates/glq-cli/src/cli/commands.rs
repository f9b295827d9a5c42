use super::CliError;
use super::config::RunConfig;
use anyhow::Context;
use glq_core::common::constants::{EV, NM, photon_wavelength};
use glq_core::domain::{GlqResult, OutputKind, PipelineStage, Span};
use glq_core::modules::QuadratureParams;
use glq_core::pipeline::GlqSpectrum;
use glq_core::species::VernerTable;
use glq_core::spectrum::SpectrumTable;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(clap::Args)]
pub(super) struct RunArgs {
    /// JSON run file
    #[arg(long)]
    config: PathBuf,

    /// Output table path, overriding the run file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Optional JSON summary of the run
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct SpeciesArgs {
    /// Verner-format CSV layered over the built-in rows
    #[arg(long)]
    verner_table: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    spectrum: PathBuf,
    output: PathBuf,
    kind: String,
    species: Vec<String>,
    breaks: Vec<f64>,
    n_bins: usize,
    npts: usize,
    f_to_phi: f64,
    phi_frac: f64,
}

pub(super) fn run_pipeline_command(args: RunArgs) -> Result<i32, CliError> {
    let mut config = RunConfig::from_path(&args.config)?;
    if let Some(output) = args.output {
        config.output.path = output;
    }

    let spectrum = build_spectrum(&config)?;
    let table = spectrum.write(
        &config.output.path,
        config.output.kind,
        config.output.mono_wavelength,
    )?;

    println!(
        "Wrote {} {} point(s) for {} species to {}",
        table.header.npts,
        config.output.kind,
        spectrum.species().len(),
        config.output.path.display()
    );

    if let Some(path) = args.summary {
        let summary = RunSummary {
            spectrum: config.spectrum.clone(),
            output: config.output.path.clone(),
            kind: config.output.kind.to_string(),
            species: spectrum
                .species()
                .iter()
                .map(|entry| entry.name().to_string())
                .collect(),
            breaks: spectrum.bin_breaks(),
            n_bins: spectrum.n_bins(),
            npts: table.header.npts,
            f_to_phi: table.header.f_to_phi,
            phi_frac: table.header.phi_frac,
        };
        write_summary(&path, &summary)?;
    }

    Ok(0)
}

pub(super) fn run_species_command(args: SpeciesArgs) -> Result<i32, CliError> {
    let mut provider = VernerTable::builtin();
    if let Some(path) = &args.verner_table {
        provider.extend_from_csv_path(path)?;
    }

    println!("{:<8} {:>12} {:>12}", "species", "E_th [eV]", "wl_th [nm]");
    for (name, row) in provider.entries() {
        let wavelength_nm = photon_wavelength(row.threshold_ev * EV) / NM;
        println!("{:<8} {:>12.4} {:>12.4}", name.to_string(), row.threshold_ev, wavelength_nm);
    }
    Ok(0)
}

/// Runs every stage the run file asks for, stopping short of the write.
fn build_spectrum(config: &RunConfig) -> GlqResult<GlqSpectrum> {
    let smoothing = config.smoothing.params()?;
    let fit = config.fit.params()?;
    let quadrature = config.quadrature.params()?;
    let spans = config.normalize.map(|normalize| normalize.spans()).transpose()?;

    let table = SpectrumTable::from_csv_path(&config.spectrum, &config.mission, &config.date)?;
    info!(
        path = %config.spectrum.display(),
        samples = table.len(),
        "read spectrum file"
    );

    let mut provider = VernerTable::builtin();
    if let Some(path) = &config.verner_table {
        let added = provider.extend_from_csv_path(path)?;
        info!(path = %path.display(), rows = added, "loaded Verner rows");
    }

    let mut spectrum =
        GlqSpectrum::with_wavelength_unit(table, config.wavelength_unit)?.with_provider(provider);

    if !config.bins.is_empty() {
        spectrum.bin(&config.bins)?;
    }
    for name in &config.species {
        spectrum.add_species(name)?;
    }
    if let Some(truncate) = config.truncate {
        spectrum.truncate(truncate.wl_min, truncate.wl_max)?;
    }
    if spectrum.stage() == PipelineStage::Unbinned {
        let breaks = spectrum.bin_breaks();
        spectrum.bin(&breaks)?;
    }

    spectrum.smooth_all(&smoothing)?;
    spectrum.fit_all(&fit)?;
    if config.output.kind == OutputKind::Fixed {
        // Fixed tables collapse the window onto the requested wavelength.
        let window = config
            .output
            .mono_wavelength
            .map(|wavelength| Span {
                lo: wavelength,
                hi: wavelength,
            });
        spectrum.abscissas(&QuadratureParams {
            window: window.or(quadrature.window),
            ..quadrature
        })?;
    } else {
        spectrum.abscissas(&quadrature)?;
    }
    if let Some((normalized, resolved)) = spans {
        spectrum.normalize(normalized, resolved)?;
    }
    info!(
        bins = spectrum.n_bins(),
        nodes = spectrum.node_count(),
        stage = %spectrum.stage(),
        "pipeline complete"
    );
    Ok(spectrum)
}

fn write_summary(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(summary).context("failed to render run summary")?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create '{}'", parent.display()))?;
    }
    fs::write(path, format!("{rendered}\n"))
        .with_context(|| format!("failed to write run summary '{}'", path.display()))?;
    Ok(())
}
