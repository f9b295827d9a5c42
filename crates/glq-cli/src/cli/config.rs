use glq_core::domain::{GlqError, GlqResult, OutputKind, Span};
use glq_core::modules::{
    ConservedQuantity, FitParams, QuadratureParams, SmoothingParams, StoppingRule,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// JSON run file. Relative paths resolve against the file's directory;
/// wavelengths are in units of `wavelength_unit` cm.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RunConfig {
    pub(super) spectrum: PathBuf,
    #[serde(default = "default_mission")]
    pub(super) mission: String,
    #[serde(default)]
    pub(super) date: String,
    #[serde(default = "default_wavelength_unit")]
    pub(super) wavelength_unit: f64,
    /// Extra Verner-format rows layered over the built-in table.
    #[serde(default)]
    pub(super) verner_table: Option<PathBuf>,
    /// Initial breaks, applied before any species edge. A single value
    /// selects monochromatic mode.
    #[serde(default)]
    pub(super) bins: Vec<f64>,
    #[serde(default)]
    pub(super) species: Vec<String>,
    #[serde(default)]
    pub(super) truncate: Option<TruncateConfig>,
    #[serde(default)]
    pub(super) smoothing: SmoothingConfig,
    #[serde(default)]
    pub(super) fit: FitConfig,
    #[serde(default)]
    pub(super) quadrature: QuadratureConfig,
    #[serde(default)]
    pub(super) normalize: Option<NormalizeConfig>,
    pub(super) output: OutputConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct TruncateConfig {
    #[serde(default)]
    pub(super) wl_min: Option<f64>,
    #[serde(default)]
    pub(super) wl_max: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(super) enum ConserveConfig {
    #[default]
    PhotonFlux,
    EnergyFlux,
}

/// At most one of `passes`, `crit_dist` and `target_degree` may be set; none
/// means ten fixed passes.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct SmoothingConfig {
    #[serde(default = "default_smoothing_window")]
    pub(super) window: usize,
    #[serde(default = "default_filter_degree")]
    pub(super) filter_degree: usize,
    #[serde(default)]
    pub(super) passes: Option<usize>,
    #[serde(default)]
    pub(super) crit_dist: Option<f64>,
    #[serde(default)]
    pub(super) target_degree: Option<usize>,
    #[serde(default = "default_smoothing_tolerance")]
    pub(super) lsq_tolerance: f64,
    #[serde(default = "default_true")]
    pub(super) second_derivative: bool,
    #[serde(default)]
    pub(super) conserve: ConserveConfig,
    #[serde(default = "default_max_passes")]
    pub(super) max_passes: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window: default_smoothing_window(),
            filter_degree: default_filter_degree(),
            passes: None,
            crit_dist: None,
            target_degree: None,
            lsq_tolerance: default_smoothing_tolerance(),
            second_derivative: true,
            conserve: ConserveConfig::default(),
            max_passes: default_max_passes(),
        }
    }
}

impl SmoothingConfig {
    pub(super) fn params(&self) -> GlqResult<SmoothingParams> {
        let stopping = match (self.passes, self.crit_dist, self.target_degree) {
            (None, None, None) => StoppingRule::default(),
            (Some(passes), None, None) => StoppingRule::FixedPasses(passes),
            (None, Some(min_distance), None) => StoppingRule::CriticalSeparation {
                min_distance,
                second_derivative: self.second_derivative,
            },
            (None, None, Some(degree)) => StoppingRule::TargetDegree {
                degree,
                lsq_tolerance: self.lsq_tolerance,
            },
            _ => {
                return Err(GlqError::configuration(
                    "CONFIG.SMOOTHING",
                    "set only one of smoothing.passes, smoothing.crit_dist and smoothing.target_degree",
                ));
            }
        };
        let params = SmoothingParams {
            window: self.window,
            filter_degree: self.filter_degree,
            stopping,
            conserve: match self.conserve {
                ConserveConfig::PhotonFlux => ConservedQuantity::PhotonFlux,
                ConserveConfig::EnergyFlux => ConservedQuantity::EnergyFlux,
            },
            max_passes: self.max_passes,
        };
        params.validate()?;
        Ok(params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct FitConfig {
    #[serde(default = "default_fit_tolerance")]
    pub(super) lsq_tolerance: f64,
    #[serde(default = "default_max_degree")]
    pub(super) max_degree: usize,
    #[serde(default)]
    pub(super) fixed_degree: Option<usize>,
    #[serde(default)]
    pub(super) crits_enclosed: Option<usize>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            lsq_tolerance: default_fit_tolerance(),
            max_degree: default_max_degree(),
            fixed_degree: None,
            crits_enclosed: None,
        }
    }
}

impl FitConfig {
    pub(super) fn params(&self) -> GlqResult<FitParams> {
        let params = FitParams {
            lsq_tolerance: self.lsq_tolerance,
            max_degree: self.max_degree,
            fixed_degree: self.fixed_degree,
            crits_enclosed: self.crits_enclosed,
        };
        params.validate()?;
        Ok(params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct QuadratureConfig {
    #[serde(default)]
    pub(super) window: Option<[f64; 2]>,
    #[serde(default = "default_sigma_degree")]
    pub(super) sigma_degree: usize,
    #[serde(default = "default_transmission_degree")]
    pub(super) transmission_degree: usize,
}

impl Default for QuadratureConfig {
    fn default() -> Self {
        Self {
            window: None,
            sigma_degree: default_sigma_degree(),
            transmission_degree: default_transmission_degree(),
        }
    }
}

impl QuadratureConfig {
    pub(super) fn params(&self) -> GlqResult<QuadratureParams> {
        Ok(QuadratureParams {
            window: self.window.map(span_from_pair).transpose()?,
            sigma_degree: self.sigma_degree,
            transmission_degree: self.transmission_degree,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct NormalizeConfig {
    pub(super) normalized: [f64; 2],
    #[serde(default)]
    pub(super) resolved: Option<[f64; 2]>,
}

impl NormalizeConfig {
    pub(super) fn spans(&self) -> GlqResult<(Span, Option<Span>)> {
        Ok((
            span_from_pair(self.normalized)?,
            self.resolved.map(span_from_pair).transpose()?,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct OutputConfig {
    pub(super) path: PathBuf,
    #[serde(default)]
    pub(super) kind: OutputKind,
    #[serde(default)]
    pub(super) mono_wavelength: Option<f64>,
}

impl RunConfig {
    pub(super) fn from_path(path: &Path) -> GlqResult<Self> {
        let source = fs::read_to_string(path).map_err(|error| {
            GlqError::io_system(
                "IO.CONFIG_READ",
                format!("failed to read run file '{}': {error}", path.display()),
            )
        })?;
        let mut config = Self::from_json(&source).map_err(|error| {
            GlqError::new(
                error.category(),
                error.placeholder(),
                format!("{}: {}", path.display(), error.message()),
            )
        })?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub(super) fn from_json(source: &str) -> GlqResult<Self> {
        let config: Self = serde_json::from_str(source).map_err(|error| {
            GlqError::configuration("CONFIG.RUN_FILE", format!("invalid run file: {error}"))
        })?;
        if !config.wavelength_unit.is_finite() || config.wavelength_unit <= 0.0 {
            return Err(GlqError::configuration(
                "CONFIG.WAVELENGTH_UNIT",
                format!("wavelength_unit must be positive, got {}", config.wavelength_unit),
            ));
        }
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.spectrum);
        resolve(&mut self.output.path);
        if let Some(table) = self.verner_table.as_mut() {
            resolve(table);
        }
    }
}

fn span_from_pair([lo, hi]: [f64; 2]) -> GlqResult<Span> {
    Span::new(lo, hi)
}

fn default_mission() -> String {
    "unknown".to_string()
}

fn default_wavelength_unit() -> f64 {
    glq_core::common::constants::NM
}

fn default_smoothing_window() -> usize {
    21
}

fn default_filter_degree() -> usize {
    1
}

fn default_smoothing_tolerance() -> f64 {
    1.0e-3
}

fn default_true() -> bool {
    true
}

fn default_max_passes() -> usize {
    10_000
}

fn default_fit_tolerance() -> f64 {
    1.0e-2
}

fn default_max_degree() -> usize {
    50
}

fn default_sigma_degree() -> usize {
    3
}

fn default_transmission_degree() -> usize {
    2
}
