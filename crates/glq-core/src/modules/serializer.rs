//! Text rendering of the quadrature table.

use crate::domain::{GlqError, GlqResult, OutputKind, Span};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const ENERGY_COLUMN: &str = r"$hc/\lambda_i$";
pub const WEIGHT_COLUMN: &str = r"$w_i\phi_{\lambda_i}$";

/// `%.17e` formatting: 17 fractional digits and a signed exponent of at
/// least two digits, e.g. `1.00000000000000000e+00`.
pub fn format_scientific_f64(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let rendered = format!("{value:.17e}");
    let Some((mantissa, exponent)) = rendered.split_once('e') else {
        return rendered;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
}

pub fn sigma_column(species_compact: &str) -> String {
    format!(r"$\sigma_{{\lambda_i,{species_compact}}}$")
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableHeader {
    pub npts: usize,
    pub nspecies: usize,
    /// `Φ_rslv / F_tot`.
    pub f_to_phi: f64,
    /// `Φ_rslv / Φ_tot`.
    pub phi_frac: f64,
    pub date: String,
    pub kind: OutputKind,
    /// Spans in cm.
    pub window: Span,
    pub resolved: Span,
    pub normalized: Span,
    /// Ionization potentials (erg), species order.
    pub ionization_potentials: Vec<f64>,
}

/// Rows of `(energy, weight, σ_1..σ_n)` with their header.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureTable {
    pub header: TableHeader,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl QuadratureTable {
    pub fn render(&self) -> String {
        let header = &self.header;
        let span = |span: &Span| {
            format!("{},{}", format_scientific_f64(span.lo), format_scientific_f64(span.hi))
        };
        let potentials: Vec<String> = header
            .ionization_potentials
            .iter()
            .copied()
            .map(format_scientific_f64)
            .collect();

        let mut out = String::new();
        let _ = writeln!(out, "# NPTS: {}", header.npts);
        let _ = writeln!(out, "# NSPECIES: {}", header.nspecies);
        let _ = writeln!(out, "# FtoPHI: {}", format_scientific_f64(header.f_to_phi));
        let _ = writeln!(out, "# PHI_FRAC: {}", format_scientific_f64(header.phi_frac));
        let _ = writeln!(out, "# DATE: {}", header.date);
        let _ = writeln!(out, "# KIND: {}", header.kind);
        let _ = writeln!(out, "# WINDOW: {}", span(&header.window));
        let _ = writeln!(out, "# RESOLVED: {}", span(&header.resolved));
        let _ = writeln!(out, "# NORMALIZED: {}", span(&header.normalized));
        let _ = writeln!(out, "{}", format!("# IONPOTS: {}", potentials.join(", ")).trim_end());
        let _ = writeln!(out, "# {}", self.columns.join(", "));
        for row in &self.rows {
            let cells: Vec<String> = row.iter().copied().map(format_scientific_f64).collect();
            let _ = writeln!(out, "{}", cells.join(","));
        }
        out
    }
}

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn write_text_artifact(path: &Path, content: &str) -> GlqResult<()> {
    fs::write(path, normalize_text_artifact(content)).map_err(|source| {
        GlqError::io_system(
            "IO.OUTPUT_WRITE",
            format!("failed to write '{}': {source}", path.display()),
        )
    })
}
