pub mod errors;

pub use errors::{GlqError, GlqErrorCategory, GlqResult};

use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Ordered stages of the binning workflow. Each operation requires the
/// stage produced by its predecessor and fails with a precondition error
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum PipelineStage {
    #[default]
    Unbinned,
    Binned,
    Smoothed,
    Fitted,
    QuadratureReady,
}

impl PipelineStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unbinned => "unbinned",
            Self::Binned => "binned",
            Self::Smoothed => "smoothed",
            Self::Fitted => "fitted",
            Self::QuadratureReady => "quadrature-ready",
        }
    }
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Closed wavelength interval in normalized units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub lo: f64,
    pub hi: f64,
}

impl Span {
    pub fn new(lo: f64, hi: f64) -> GlqResult<Self> {
        if !lo.is_finite() || !hi.is_finite() {
            return Err(GlqError::configuration(
                "CONFIG.SPAN",
                format!("span bounds must be finite, got [{lo}, {hi}]"),
            ));
        }
        if lo > hi {
            return Err(GlqError::configuration(
                "CONFIG.SPAN",
                format!("span lower bound {lo} exceeds upper bound {hi}"),
            ));
        }
        Ok(Self { lo, hi })
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    pub fn is_degenerate(&self) -> bool {
        self.lo == self.hi
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lo && value <= self.hi
    }

    pub fn intersect(&self, other: &Span) -> Option<Span> {
        let lo = self.lo.max(other.lo);
        let hi = self.hi.min(other.hi);
        (lo <= hi).then_some(Span { lo, hi })
    }

    pub fn scaled(&self, factor: f64) -> Span {
        Span {
            lo: self.lo * factor,
            hi: self.hi * factor,
        }
    }
}

/// The three independently configurable spans. All start unset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Spans {
    pub window: Option<Span>,
    pub resolved: Option<Span>,
    pub normalized: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    #[default]
    Full,
    Mono,
    Fixed,
    Meta,
}

impl OutputKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Mono => "mono",
            Self::Fixed => "fixed",
            Self::Meta => "meta",
        }
    }

    pub const fn is_single_point(self) -> bool {
        !matches!(self, Self::Full)
    }
}

impl Display for OutputKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for OutputKind {
    type Err = GlqError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "mono" => Ok(Self::Mono),
            "fixed" => Ok(Self::Fixed),
            "meta" => Ok(Self::Meta),
            other => Err(GlqError::configuration(
                "CONFIG.OUTPUT_KIND",
                format!("unknown output kind '{other}', expected full, mono, fixed or meta"),
            )),
        }
    }
}
