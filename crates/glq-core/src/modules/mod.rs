pub mod binner;
pub mod fitter;
pub mod normalizer;
pub mod quadrature;
pub mod serializer;
pub mod smoother;

pub use binner::{
    BinReport, Binning, sanitize_breaks, truncated_breaks, with_edge, with_species_edge,
    without_edge,
};
pub use fitter::{FitParams, FittedBin, SubBin, fit_bin, subbin_breaks};
pub use normalizer::{Normalization, SpeciesMean, normalize};
pub use quadrature::{BinQuadrature, BinSamples, QuadratureNodes, QuadratureParams, bin_abscissas};
pub use serializer::{
    ENERGY_COLUMN, QuadratureTable, TableHeader, WEIGHT_COLUMN, format_scientific_f64,
    sigma_column, write_text_artifact,
};
pub use smoother::{
    ConservedQuantity, SmoothedBin, SmoothedCurve, SmoothingParams, StoppingRule,
    companion_factor, smooth_bin,
};
