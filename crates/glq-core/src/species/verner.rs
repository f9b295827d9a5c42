//! Analytic photoionization cross sections of Verner et al. (1996),
//! ApJ 465, 487.

use super::notation::SpeciesName;
use super::{CrossSection, CrossSectionProvider};
use crate::common::constants::MEGABARN;
use crate::domain::{GlqError, GlqResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// One row of the fit table. Energies in eV, `sigma_0` in Mb.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct VernerFit {
    #[serde(rename = "Z")]
    pub atomic_number: u32,
    #[serde(rename = "Ne")]
    pub electrons: u32,
    #[serde(rename = "E_th")]
    pub threshold_ev: f64,
    #[serde(rename = "E_max")]
    pub max_ev: f64,
    #[serde(rename = "E_0")]
    pub e0: f64,
    #[serde(rename = "sigma_0")]
    pub sigma0: f64,
    #[serde(rename = "y_a")]
    pub ya: f64,
    #[serde(rename = "P")]
    pub p: f64,
    #[serde(rename = "y_w")]
    pub yw: f64,
    #[serde(rename = "y_0")]
    pub y0: f64,
    #[serde(rename = "y_1")]
    pub y1: f64,
}

impl VernerFit {
    /// Cross section (cm^2) without the `[E_th, E_max]` validity cut.
    pub fn fit_value(&self, energy_ev: f64) -> f64 {
        let x = energy_ev / self.e0 - self.y0;
        let y = (x * x + self.y1 * self.y1).sqrt();
        let shape = ((x - 1.0).powi(2) + self.yw * self.yw) * y.powf(0.5 * (self.p - 11.0))
            / (1.0 + (y / self.ya).sqrt()).powf(self.p);
        self.sigma0 * MEGABARN * shape
    }

    fn validate(&self) -> GlqResult<()> {
        let positive = [self.threshold_ev, self.max_ev, self.e0, self.sigma0, self.ya];
        if positive.iter().any(|value| !value.is_finite() || *value <= 0.0)
            || self.threshold_ev >= self.max_ev
        {
            return Err(GlqError::configuration(
                "CONFIG.VERNER_ROW",
                format!(
                    "Verner row Z={} Ne={} needs positive finite E_th < E_max, E_0, sigma_0 and y_a",
                    self.atomic_number, self.electrons
                ),
            ));
        }
        Ok(())
    }
}

impl CrossSection for VernerFit {
    fn threshold_ev(&self) -> f64 {
        self.threshold_ev
    }

    fn sigma(&self, energy_ev: f64) -> f64 {
        if energy_ev < self.threshold_ev || energy_ev > self.max_ev {
            0.0
        } else {
            self.fit_value(energy_ev)
        }
    }
}

const BUILTIN_ROWS: [VernerFit; 3] = [
    VernerFit {
        atomic_number: 1,
        electrons: 1,
        threshold_ev: 13.6,
        max_ev: 5.0e4,
        e0: 4.298e-1,
        sigma0: 5.475e4,
        ya: 32.88,
        p: 2.963,
        yw: 0.0,
        y0: 0.0,
        y1: 0.0,
    },
    VernerFit {
        atomic_number: 2,
        electrons: 2,
        threshold_ev: 24.59,
        max_ev: 5.0e4,
        e0: 13.61,
        sigma0: 949.2,
        ya: 1.469,
        p: 3.188,
        yw: 2.039,
        y0: 0.4434,
        y1: 2.136,
    },
    VernerFit {
        atomic_number: 2,
        electrons: 1,
        threshold_ev: 54.42,
        max_ev: 5.0e4,
        e0: 1.720,
        sigma0: 1.369e4,
        ya: 32.88,
        p: 2.963,
        yw: 0.0,
        y0: 0.0,
        y1: 0.0,
    },
];

/// Fit rows keyed by `(Z, Ne)`.
#[derive(Debug, Clone, PartialEq)]
pub struct VernerTable {
    rows: BTreeMap<(u32, u32), VernerFit>,
}

impl Default for VernerTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl VernerTable {
    /// H I, He I and He II.
    pub fn builtin() -> Self {
        let rows = BUILTIN_ROWS
            .iter()
            .map(|row| ((row.atomic_number, row.electrons), *row))
            .collect();
        Self { rows }
    }

    pub fn empty() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, row: VernerFit) -> GlqResult<()> {
        row.validate()?;
        self.rows.insert((row.atomic_number, row.electrons), row);
        Ok(())
    }

    pub fn get(&self, name: &SpeciesName) -> Option<&VernerFit> {
        self.rows.get(&(name.atomic_number(), name.electrons()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows ordered by atomic number, then by decreasing electron count.
    pub fn entries(&self) -> Vec<(SpeciesName, VernerFit)> {
        let mut entries: Vec<(SpeciesName, VernerFit)> = self
            .rows
            .values()
            .filter_map(|row| {
                let stage = (row.atomic_number + 1).checked_sub(row.electrons)?;
                SpeciesName::new(row.atomic_number, stage).ok().map(|name| (name, *row))
            })
            .collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }

    /// Adds or replaces rows from a Verner-format CSV (`Z,Ne,E_th,E_max,E_0,
    /// sigma_0,y_a,P,y_w,y_0,y_1`, `#` comments allowed).
    pub fn extend_from_csv_path(&mut self, path: &Path) -> GlqResult<usize> {
        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|source| {
                GlqError::io_system(
                    "IO.VERNER_TABLE",
                    format!("failed to open Verner table '{}': {source}", path.display()),
                )
            })?;

        let mut added = 0;
        for (line, record) in reader.deserialize::<VernerFit>().enumerate() {
            let row = record.map_err(|source| {
                GlqError::configuration(
                    "CONFIG.VERNER_ROW",
                    format!("Verner table '{}' record {}: {source}", path.display(), line + 1),
                )
            })?;
            self.insert(row)?;
            added += 1;
        }
        Ok(added)
    }
}

impl CrossSectionProvider for VernerTable {
    fn cross_section(&self, name: &SpeciesName) -> Option<Box<dyn CrossSection>> {
        self.get(name)
            .map(|row| Box::new(*row) as Box<dyn CrossSection>)
    }
}
