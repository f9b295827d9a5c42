//! Physical constants in cgs units (NIST values).
//!
//! Shared by the spectrum table, the species provider and the serializer so
//! that `hc/λ` and eV conversions agree bit-for-bit across stages.

/// Speed of light (cm/s).
pub const C: f64 = 2.997_924_58e10;
/// Planck's constant (erg s).
pub const H: f64 = 6.626_075_5e-27;
/// Electron volt (erg).
pub const EV: f64 = 1.602_177_2e-12;
/// Planck's constant times the speed of light (erg cm).
pub const HC: f64 = H * C;
/// One nanometre in centimetres; the default wavelength normalization.
pub const NM: f64 = 1.0e-7;
/// Megabarn (cm^2).
pub const MEGABARN: f64 = 1.0e-18;

/// Photon energy (erg) of a wavelength given in centimetres.
pub fn photon_energy(wavelength_cm: f64) -> f64 {
    HC / wavelength_cm
}

/// Wavelength (cm) of a photon energy given in erg.
pub fn photon_wavelength(energy_erg: f64) -> f64 {
    HC / energy_erg
}
