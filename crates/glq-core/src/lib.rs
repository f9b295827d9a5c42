//! Gauss-Legendre quadrature representations of stellar irradiance spectra.
//!
//! A [`GlqSpectrum`] bins an observed spectrum at the photoionization edges of
//! tracked species, smooths each bin while conserving its integrated flux,
//! fits polynomials to the smoothed curve and places Gauss-Legendre nodes
//! sized to integrate those polynomials against cross sections exactly.

pub mod common;
pub mod domain;
pub mod modules;
pub mod numerics;
pub mod pipeline;
pub mod species;
pub mod spectrum;

pub use domain::{GlqError, GlqErrorCategory, GlqResult, OutputKind, PipelineStage, Span, Spans};
pub use modules::{
    ConservedQuantity, FitParams, QuadratureParams, QuadratureTable, SmoothingParams, StoppingRule,
};
pub use pipeline::{BinRecord, GlqSpectrum};
pub use species::{CrossSection, CrossSectionProvider, SpeciesName, VernerTable};
pub use spectrum::{SpectralSample, SpectrumTable};
