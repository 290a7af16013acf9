//! Magnetic exchange couplings from Wannier-function tight-binding
//! Hamiltonians, via the Lichtenstein (LKAG) Green's-function formula.
//!
//! The pipeline: Fourier-interpolate a real-space [`tb::TBOperator`] onto a
//! dense k-grid ([`kgrid`]), diagonalize at each k ([`eigen`]), assemble the
//! k-averaged Green's function on a semicircular energy contour ([`contour`],
//! [`greens`]), and integrate the LKAG kernel into per-pair exchange tensors
//! ([`exchange`]). [`spin_block`] carries the Collinear/NonCollinear spinor
//! storage shared by every stage.

pub mod atoms;
pub mod constants;
pub mod contour;
pub mod eigen;
pub mod error;
pub mod exchange;
pub mod greens;
pub mod kgrid;
pub mod spin_block;
pub mod tb;
pub mod utils;

use num_complex::Complex;

/// Convenience alias used throughout for double-precision complex arithmetic.
pub type C64 = Complex<f64>;

pub use atoms::{Atom, Cell};
pub use error::ExchangeError;
pub use exchange::{ExchangeOptions, ExchangeRecord, ExchangeSolver};
pub use kgrid::{KGridBuilder, KPoint};
pub use spin_block::{Layout, SpinBlockMatrix, SpinSel};
pub use tb::{LatticeVector, TBInterpolator, TBOperator};
