//! Mathematical and physical constants used in the routines.
use std::f64::consts::PI;

use crate::C64;

/// The imaginary unit, for convenience in phase-factor expressions.
pub static J: C64 = C64::new(0., 1.);

/// `2*pi`, used throughout the Fourier sum and contour phase factors.
pub static TWO_PI: f64 = 2. * PI;

/// Unit conversion from the intermediate Hartree-based contour integral to meV,
/// folding in the `1/(4*pi)` from the Lichtenstein (LKAG) formula and the sign
/// convention described in the component design for `ExchangeSolver`.
pub static MEV_PREFACTOR: f64 = -1000. / (4. * PI);

/// Default logarithmic-packing parameter for the semicircular contour.
/// A magic number with no given derivation upstream; ported as-is and
/// exposed through `ExchangeOptions::p` rather than hardcoded.
pub static DEFAULT_CONTOUR_P: f64 = 13.0;

/// Minimum eigenvalue magnitude that isn't just numerical noise (in the same
/// units as the Hamiltonian).
pub static ZERO_ENERGY_TOL: f64 = 1e-12;
