use super::{SpectralSample, SpectrumTable};
use crate::domain::{GlqError, GlqResult};
use serde::Deserialize;
use std::path::Path;

/// CSV row of an observed spectrum in cgs units. Headers follow the
/// irradiance archives (`wl`, `F_wl`, `unc`); the long names are accepted
/// too.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SpectrumRecord {
    #[serde(alias = "wl")]
    pub wavelength: f64,
    #[serde(alias = "F_wl")]
    pub flux: f64,
    #[serde(default, alias = "unc")]
    pub uncertainty: Option<f64>,
}

impl From<SpectrumRecord> for SpectralSample {
    fn from(record: SpectrumRecord) -> Self {
        Self {
            wavelength: record.wavelength,
            flux: record.flux,
            uncertainty: record.uncertainty,
        }
    }
}

impl SpectrumTable {
    pub fn from_csv_path(
        path: &Path,
        mission: impl Into<String>,
        date: impl Into<String>,
    ) -> GlqResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|source| {
                GlqError::io_system(
                    "IO.SPECTRUM_READ",
                    format!("failed to open spectrum '{}': {source}", path.display()),
                )
            })?;

        let mut samples = Vec::new();
        for (index, record) in reader.deserialize::<SpectrumRecord>().enumerate() {
            let record = record.map_err(|source| {
                GlqError::configuration(
                    "CONFIG.SPECTRUM_RECORD",
                    format!("spectrum '{}' record {}: {source}", path.display(), index + 1),
                )
            })?;
            samples.push(SpectralSample::from(record));
        }

        Self::from_samples(mission, date, samples)
    }
}
