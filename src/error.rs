//! Error types for the exchange engine.

use thiserror::Error;

/// Failure modes of the magnetic-exchange pipeline.
///
/// `MissingOrbitals` is intentionally absent from this enum: per the
/// contract, an atom that lacks an orbital range is a silent, non-fatal
/// omission (the pair involving it is skipped), not a returned error.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Dimension parity or layout incompatibility at ingest or during multiply.
    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    /// Operation attempted across two `SpinBlockMatrix`es of different layouts.
    #[error("layout mismatch: cannot operate on matrices with differing spin layouts")]
    LayoutMismatch,

    /// The Hermitian eigensolver failed to converge or rejected its input.
    #[error("eigensolver failed (info = {info})")]
    LapackError { info: i32 },
}
