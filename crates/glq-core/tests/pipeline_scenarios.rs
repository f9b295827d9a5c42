use glq_core::common::constants::{HC, NM};
use glq_core::numerics::integrate_simpson;
use glq_core::{
    ConservedQuantity, CrossSection, CrossSectionProvider, FitParams, GlqSpectrum, OutputKind,
    PipelineStage, QuadratureParams, SmoothingParams, Span, SpeciesName, SpectralSample,
    SpectrumTable, StoppingRule,
};
use std::fs;
use tempfile::TempDir;

fn synthetic_table() -> SpectrumTable {
    let samples = (0..=280).map(|i| {
        let wl = 10.0 + 0.5 * f64::from(i);
        let flux = 1.0e-3 * (1.0 + 0.4 * (wl / 9.0).sin() + 0.05 * (3.7 * wl).sin());
        SpectralSample::new(wl * NM, flux)
    });
    SpectrumTable::from_samples("synthetic", "2002-01-01", samples).expect("synthetic spectrum")
}

fn pipeline() -> GlqSpectrum {
    GlqSpectrum::new(synthetic_table()).expect("pipeline")
}

fn assert_close(actual: f64, expected: f64, rel_tol: f64) {
    let scale = expected.abs().max(f64::MIN_POSITIVE);
    assert!(
        (actual - expected).abs() <= rel_tol * scale,
        "expected {expected}, got {actual} (rel tol {rel_tol})"
    );
}

fn hydrogen_edge(pipeline: &GlqSpectrum) -> f64 {
    pipeline
        .species()
        .iter()
        .find(|species| species.name().to_string() == "H I")
        .map(|species| species.threshold_wavelength())
        .expect("H I tracked")
}

#[test]
fn bin_count_follows_sanitized_breaks() {
    let mut pipeline = pipeline();
    let report = pipeline.bin(&[120.0, 20.0, 60.0, 60.0, 140.0]).expect("bin");

    assert_eq!(report.n_bins(), 3);
    assert_eq!(pipeline.n_bins(), 3);
    let breaks = pipeline.bin_breaks();
    assert_eq!(breaks, [20.0, 60.0, 120.0, 140.0]);
    assert!(breaks.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(report.warnings.is_empty());
}

#[test]
fn species_edge_splits_the_bin_containing_it() {
    let mut pipeline = pipeline();
    pipeline.bin(&[20.0, 60.0, 120.0, 140.0]).expect("bin");
    assert_eq!(pipeline.n_bins(), 3);

    pipeline.add_species("H I").expect("add H I");
    let edge = hydrogen_edge(&pipeline);
    assert!((edge - 91.16).abs() < 0.05, "edge={edge}");
    assert_eq!(pipeline.n_bins(), 4);
    assert_eq!(pipeline.bin_breaks()[2], edge);
    assert_eq!(pipeline.stage(), PipelineStage::Binned);

    pipeline.add_species("H I").expect("duplicate add is a no-op");
    assert_eq!(pipeline.species().len(), 1);
    assert_eq!(pipeline.n_bins(), 4);
}

#[test]
fn species_edges_survive_truncation_and_edits() {
    let mut pipeline = pipeline();
    pipeline.add_species("H I").expect("add H I");
    pipeline.add_species("He I").expect("add He I");
    let edges = pipeline.species_edges();
    assert_eq!(edges.len(), 2);

    pipeline.truncate(Some(20.0), None).expect("truncate");
    let breaks = pipeline.bin_breaks();
    assert_eq!(breaks.first(), Some(&20.0));
    assert_eq!(breaks.last(), Some(&edges[1]));
    assert!(edges.iter().all(|edge| breaks.contains(edge)));

    pipeline.add_bin_edge(35.0).expect("add edge");
    assert_eq!(pipeline.stage(), PipelineStage::Smoothed);
    let breaks = pipeline.bin_breaks();
    assert!(breaks.contains(&35.0));
    assert!(edges.iter().all(|edge| breaks.contains(edge)));

    pipeline.remove_species("He I").expect("remove He I");
    assert_eq!(pipeline.bin_breaks(), [20.0, 35.0, edges[1]]);
    assert_eq!(pipeline.species().len(), 1);

    pipeline.truncate(Some(20.0), Some(edges[1] + 0.05)).expect("truncate again");
    assert_eq!(pipeline.bin_breaks(), [20.0, 35.0, edges[1]]);
}

#[test]
fn smoothing_conserves_bin_flux_for_every_stopping_rule() {
    let rules = [
        (StoppingRule::FixedPasses(5), ConservedQuantity::PhotonFlux),
        (StoppingRule::FixedPasses(5), ConservedQuantity::EnergyFlux),
        (
            StoppingRule::CriticalSeparation {
                min_distance: 2.0,
                second_derivative: true,
            },
            ConservedQuantity::PhotonFlux,
        ),
        (
            StoppingRule::TargetDegree {
                degree: 3,
                lsq_tolerance: 1.0e-3,
            },
            ConservedQuantity::PhotonFlux,
        ),
    ];

    for (stopping, conserve) in rules {
        let mut pipeline = pipeline();
        pipeline.add_species("H I").expect("add H I");
        pipeline.add_species("He I").expect("add He I");
        pipeline.truncate(Some(20.0), None).expect("truncate");
        let params = SmoothingParams {
            stopping,
            conserve,
            max_passes: 200,
            ..SmoothingParams::default()
        };
        pipeline.smooth_all(&params).expect("smooth");

        let columns = pipeline.columns();
        for record in pipeline.bins() {
            let smoothed = record.smoothed.as_ref().expect("smoothed bin");
            let range = record.samples.clone();
            let original = match conserve {
                ConservedQuantity::PhotonFlux => &columns.photon_flux[range.clone()],
                ConservedQuantity::EnergyFlux => &columns.flux[range.clone()],
            };
            let wl = &columns.wavelength[range];
            let before = integrate_simpson(wl, original).expect("integral");
            let after = integrate_simpson(wl, &smoothed.curve.smoothed).expect("integral");
            assert_close(after, before, 1.0e-10);
        }
    }
}

#[test]
fn node_counts_and_positions_follow_the_fitted_degrees() {
    let mut pipeline = pipeline();
    pipeline.bin(&[20.0, 60.0, 120.0, 140.0]).expect("bin");
    pipeline.smooth_all(&SmoothingParams::default()).expect("smooth");
    pipeline
        .fit_all(&FitParams {
            crits_enclosed: Some(1),
            ..FitParams::default()
        })
        .expect("fit");
    let window = Span::new(30.0, 100.0).expect("window");
    let params = QuadratureParams {
        window: Some(window),
        sigma_degree: 3,
        transmission_degree: 2,
    };
    pipeline.abscissas(&params).expect("nodes");
    assert_eq!(pipeline.spans().window, Some(window));

    let mut placed = 0;
    for record in pipeline.bins() {
        let fitted = record.fitted.as_ref().expect("fitted");
        let quadrature = record.quadrature.as_ref().expect("quadrature");
        assert_eq!(quadrature.nodes.len(), fitted.subbins.len());
        for (subbin, nodes) in fitted.subbins.iter().zip(&quadrature.nodes) {
            let lo = window.lo.max(subbin.span.lo);
            let hi = window.hi.min(subbin.span.hi);
            let Some(nodes) = nodes else {
                assert!(lo >= hi, "sub-bin [{lo}, {hi}] inside the window has no nodes");
                continue;
            };
            let degree = subbin.degree() + 3 + 2;
            assert_eq!(nodes.len(), (degree + 2).div_ceil(2));
            assert!(nodes.abscissas.iter().all(|x| *x >= lo && *x <= hi));
            placed += nodes.len();
        }
    }
    assert!(placed > 0);
    assert_eq!(placed, pipeline.node_count());
    assert!(pipeline.bins()[2].quadrature.as_ref().expect("bin 3").nodes.iter().all(Option::is_none));
}

#[test]
fn repeating_bin_and_smooth_reproduces_identical_state() {
    let mut pipeline = pipeline();
    let breaks = [20.0, 60.0, 120.0];
    let params = SmoothingParams {
        stopping: StoppingRule::critical_separation(3.0),
        ..SmoothingParams::default()
    };

    pipeline.bin(&breaks).expect("bin");
    pipeline.smooth_all(&params).expect("smooth");
    pipeline.fit_all(&FitParams::default()).expect("fit");
    let first_breaks = pipeline.bin_breaks();
    let first_bins = pipeline.bins().to_vec();

    pipeline.bin(&breaks).expect("rebin");
    assert_eq!(pipeline.bin_breaks(), first_breaks);
    assert!(pipeline.bins().iter().all(|record| record.smoothed.is_none()));
    pipeline.smooth_all(&params).expect("resmooth");
    pipeline.fit_all(&FitParams::default()).expect("refit");
    assert_eq!(pipeline.bins(), first_bins.as_slice());
}

#[test]
fn mono_output_without_species_uses_the_window_wavelength() {
    let mut pipeline = pipeline();
    pipeline.bin(&[30.4]).expect("mono");
    assert_eq!(pipeline.n_bins(), 0);
    pipeline.smooth_all(&SmoothingParams::default()).expect("smooth");
    pipeline.fit_all(&FitParams::default()).expect("fit");
    pipeline.abscissas(&QuadratureParams::default()).expect("nodes");
    assert_eq!(pipeline.stage(), PipelineStage::QuadratureReady);

    let table = pipeline.build_table(OutputKind::Mono, None).expect("table");
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0].len(), 2);
    assert_eq!(table.rows[0][0], HC / (30.4 * NM));
    assert_eq!(table.rows[0][1], 1.0);

    let error = pipeline.build_table(OutputKind::Full, None).expect_err("full needs bins");
    assert_eq!(error.placeholder(), "CONFIG.OUTPUT_KIND");
}

#[test]
fn fixed_output_with_a_mismatched_wavelength_writes_nothing() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("fixed.csv");
    let mut pipeline = pipeline();
    pipeline.add_species("H I").expect("add H I");
    pipeline.smooth_all(&SmoothingParams::default()).expect("smooth");
    pipeline.fit_all(&FitParams::default()).expect("fit");
    pipeline
        .abscissas(&QuadratureParams {
            window: Some(Span::new(30.0, 30.0).expect("window")),
            ..QuadratureParams::default()
        })
        .expect("nodes");
    assert_eq!(pipeline.node_count(), 0);

    let error = pipeline
        .write(&path, OutputKind::Fixed, Some(40.0))
        .expect_err("mismatched wavelength");
    assert_eq!(error.placeholder(), "CONFIG.FIXED_WAVELENGTH");
    assert!(!path.exists());

    let error = pipeline.write(&path, OutputKind::Fixed, None).expect_err("missing wavelength");
    assert_eq!(error.placeholder(), "CONFIG.FIXED_WAVELENGTH");
    assert!(!path.exists());

    let table = pipeline.write(&path, OutputKind::Fixed, Some(30.0)).expect("fixed write");
    let energy = HC / (30.0 * NM);
    assert_eq!(table.rows, vec![vec![
        energy,
        1.0,
        pipeline.species()[0].cross_section_at(energy),
    ]]);
    assert!(path.exists());
}

#[test]
fn writing_before_the_quadrature_is_a_precondition_error() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("early.csv");
    let mut pipeline = pipeline();

    let error = pipeline.write(&path, OutputKind::Full, None).expect_err("unbinned");
    assert_eq!(error.placeholder(), "PRECONDITION.BIN");

    pipeline.bin(&[20.0, 60.0]).expect("bin");
    pipeline.smooth_all(&SmoothingParams::default()).expect("smooth");
    let error = pipeline.write(&path, OutputKind::Full, None).expect_err("no nodes");
    assert_eq!(error.placeholder(), "PRECONDITION.ABSCISSAS");
    let error = pipeline
        .abscissas(&QuadratureParams::default())
        .expect_err("not fitted");
    assert_eq!(error.placeholder(), "PRECONDITION.FIT");
    assert!(!path.exists());
}

#[test]
fn full_pipeline_writes_a_documented_quadrature_table() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("spectrum.csv");
    let mut pipeline = pipeline();
    pipeline.add_species("H I").expect("add H I");
    pipeline.add_species("He I").expect("add He I");
    pipeline.truncate(Some(20.0), None).expect("truncate");
    pipeline.smooth_all(&SmoothingParams::default()).expect("smooth");
    pipeline
        .fit_all(&FitParams {
            crits_enclosed: Some(2),
            ..FitParams::default()
        })
        .expect("fit");
    pipeline.abscissas(&QuadratureParams::default()).expect("nodes");
    let resolved = Span::new(10.0, 120.0).expect("resolved");
    pipeline
        .normalize(Span::new(10.0, 150.0).expect("normalized"), Some(resolved))
        .expect("normalize");

    let table = pipeline.write(&path, OutputKind::Full, None).expect("write");
    assert_eq!(table.header.npts, pipeline.node_count());
    assert_eq!(table.header.nspecies, 2);
    assert!(table.rows.iter().all(|row| row.len() == 4));
    assert!(table.rows.iter().all(|row| row[1] > 0.0 && row[2] >= 0.0));

    let window = pipeline.spans().window.expect("window");
    let (_, window_photons) = pipeline
        .table()
        .integrated_totals(window.scaled(NM))
        .expect("window photons");
    let weights: f64 = table.rows.iter().map(|row| row[1]).sum();
    assert_close(weights, window_photons / pipeline.totals().photon_resolved, 2.0e-2);

    let rendered = fs::read_to_string(&path).expect("output");
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines[0], format!("# NPTS: {}", table.rows.len()));
    assert_eq!(lines[1], "# NSPECIES: 2");
    assert_eq!(lines[5], "# KIND: full");
    assert!(lines[9].starts_with("# IONPOTS: "));
    assert_eq!(
        lines[10],
        r"# $hc/\lambda_i$, $w_i\phi_{\lambda_i}$, $\sigma_{\lambda_i,HI}$, $\sigma_{\lambda_i,HeI}$"
    );
    assert_eq!(lines.len(), 11 + table.rows.len());
    assert_eq!(lines[11].split(',').count(), 4);

    let meta = pipeline.build_table(OutputKind::Meta, None).expect("meta");
    assert_eq!(meta.rows.len(), 1);
    assert_close(meta.rows[0][0], pipeline.totals().mean_energy(), 1.0e-15);
    let means = &pipeline.normalization().expect("normalized").species_means;
    assert_eq!(meta.rows[0][2], means[0].sigma_mean);
}

/// Step cross section switching on at a chosen threshold.
#[derive(Debug, Clone, Copy)]
struct StepCrossSection {
    threshold_ev: f64,
}

impl CrossSection for StepCrossSection {
    fn threshold_ev(&self) -> f64 {
        self.threshold_ev
    }

    fn sigma(&self, energy_ev: f64) -> f64 {
        if energy_ev >= self.threshold_ev { 1.0e-18 } else { 0.0 }
    }
}

/// C I and N I share a 20 eV threshold (61.99 nm), O I sits at 10 eV
/// (123.98 nm) and Ne I at 5 eV, beyond the synthetic spectrum.
#[derive(Debug)]
struct StepProvider;

impl CrossSectionProvider for StepProvider {
    fn cross_section(&self, name: &SpeciesName) -> Option<Box<dyn CrossSection>> {
        let threshold_ev = match name.to_string().as_str() {
            "C I" | "N I" => 20.0,
            "O I" => 10.0,
            "Ne I" => 5.0,
            _ => return None,
        };
        Some(Box::new(StepCrossSection { threshold_ev }))
    }
}

fn step_pipeline() -> GlqSpectrum {
    pipeline().with_provider(StepProvider)
}

#[test]
fn species_edge_absorbs_a_nearby_break_and_stays_smoothable() {
    let mut pipeline = pipeline();
    pipeline.bin(&[20.0, 91.2, 140.0]).expect("bin");

    pipeline.add_species("H I").expect("add H I");
    let edge = hydrogen_edge(&pipeline);
    assert!((edge - 91.2).abs() < 0.1, "edge={edge}");
    assert_eq!(pipeline.bin_breaks(), vec![20.0, edge, 140.0]);

    pipeline
        .smooth_all(&SmoothingParams::default())
        .expect("every bin holds samples");
    assert_eq!(pipeline.stage(), PipelineStage::Smoothed);
}

#[test]
fn shared_species_edge_outlives_its_first_owner() {
    let mut pipeline = step_pipeline();
    pipeline.bin(&[20.0, 100.0]).expect("bin");
    pipeline.add_species("C I").expect("add C I");
    pipeline.add_species("N I").expect("add N I");
    let edge = pipeline.species_edges()[0];
    assert_eq!(pipeline.species_edges(), vec![edge]);
    assert_eq!(pipeline.bin_breaks(), vec![20.0, edge, 100.0]);

    pipeline.remove_species("C I").expect("remove C I");
    assert_eq!(pipeline.bin_breaks(), vec![20.0, edge, 100.0]);
    assert_eq!(pipeline.species().len(), 1);

    pipeline.remove_species("N I").expect("remove N I");
    assert_eq!(pipeline.bin_breaks(), vec![20.0, 100.0]);
    assert!(pipeline.species().is_empty());

    let error = pipeline.remove_species("N I").expect_err("no longer tracked");
    assert_eq!(error.placeholder(), "CONFIG.SPECIES_UNKNOWN");
}

#[test]
fn removing_a_species_whose_edge_was_clipped_keeps_the_breaks() {
    let mut pipeline = step_pipeline();
    pipeline.bin(&[20.0, 100.0]).expect("bin");
    pipeline.add_species("Ne I").expect("add Ne I");
    let breaks = pipeline.bin_breaks();
    assert_eq!(breaks, vec![20.0, 100.0, pipeline.domain().hi]);
    assert!(!breaks.contains(&pipeline.species_edges()[0]));

    pipeline.remove_species("Ne I").expect("remove Ne I");
    assert!(pipeline.species().is_empty());
    assert_eq!(pipeline.bin_breaks(), breaks);
}

#[test]
fn last_bin_survives_removing_one_of_its_two_edges() {
    let mut pipeline = step_pipeline();
    pipeline.bin(&[20.0, 140.0]).expect("bin");
    pipeline.add_species("C I").expect("add C I");
    pipeline.add_species("O I").expect("add O I");
    let edges = pipeline.species_edges();
    assert_eq!(edges.len(), 2);

    pipeline.truncate(Some(edges[0]), None).expect("truncate");
    assert_eq!(pipeline.bin_breaks(), edges);

    pipeline.remove_species("O I").expect("remove O I");
    assert_eq!(pipeline.species().len(), 1);
    assert_eq!(pipeline.bin_breaks(), edges);
    assert_eq!(pipeline.n_bins(), 1);
}

#[test]
fn mono_output_over_bins_uses_a_collapsed_window() {
    let mut pipeline = pipeline();
    pipeline.bin(&[20.0, 140.0]).expect("bin");
    pipeline.smooth_all(&SmoothingParams::default()).expect("smooth");
    pipeline.fit_all(&FitParams::default()).expect("fit");
    pipeline
        .abscissas(&QuadratureParams {
            window: Some(Span::new(60.0, 60.0).expect("window")),
            ..QuadratureParams::default()
        })
        .expect("nodes");

    let table = pipeline.build_table(OutputKind::Mono, None).expect("table");
    assert_eq!(table.rows, vec![vec![HC / (60.0 * NM), 1.0]]);

    pipeline
        .abscissas(&QuadratureParams::default())
        .expect("full window");
    let table = pipeline.build_table(OutputKind::Mono, None).expect("table");
    assert_eq!(table.rows[0][0], pipeline.totals().mean_energy());
}
