//! Reusable Hermitian eigensolver scratch tied to a [`SpinBlockMatrix`] layout.

use faer::{Mat, Side};

use crate::error::ExchangeError;
use crate::spin_block::{Layout, SpinBlockMatrix};
use crate::C64;

/// Eigenvalues of a `2N`-dimensional spin-block matrix: the first `N`
/// entries index the up sub-basis, the second `N` the down sub-basis.
/// Sorted ascending within each half.
#[derive(Debug, Clone)]
pub struct MagneticVector {
    vals: Vec<f64>,
}

impl MagneticVector {
    pub fn zeros(n: usize) -> Self {
        MagneticVector { vals: vec![0.0; 2 * n] }
    }

    pub fn up(&self) -> &[f64] {
        &self.vals[..self.vals.len() / 2]
    }

    pub fn down(&self) -> &[f64] {
        &self.vals[self.vals.len() / 2..]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.vals
    }
}

/// An eigenpair produced by [`EigenWorkspace::eigen_into`].
pub struct EigPair {
    pub vals: MagneticVector,
    pub vecs: SpinBlockMatrix,
}

/// Scratch for repeated Hermitian diagonalization of a fixed layout and
/// dimension. Not `Sync`; each worker thread owns its own instance.
pub struct EigenWorkspace {
    layout: Layout,
    dim: usize,
}

impl EigenWorkspace {
    pub fn new(layout: Layout, dim: usize) -> Self {
        EigenWorkspace { layout, dim }
    }

    /// Diagonalize `input` (same layout/dim as this workspace) into `vals`
    /// and `vecs`. For `Collinear`, the up and down `N x N` blocks are
    /// diagonalized independently; for `NonCollinear`, a single `2N`
    /// Hermitian decomposition is performed.
    pub fn eigen_into(
        &self,
        vals: &mut MagneticVector,
        vecs: &mut SpinBlockMatrix,
        input: &SpinBlockMatrix,
    ) -> Result<(), ExchangeError> {
        if input.layout() != self.layout || input.dim() != self.dim {
            return Err(ExchangeError::ShapeMismatch {
                expected: self.dim,
                found: input.dim(),
            });
        }
        match self.layout {
            Layout::Collinear => {
                let (vu, eu) = diagonalize_hermitian(&input.up())?;
                let (vd, ed) = diagonalize_hermitian(&input.down())?;
                vals.vals[..self.dim].copy_from_slice(&vu);
                vals.vals[self.dim..].copy_from_slice(&vd);
                vecs.set_up(&eu);
                vecs.set_down(&ed);
            }
            Layout::NonCollinear => {
                let (v, e) = diagonalize_hermitian(input.raw())?;
                vals.vals.copy_from_slice(&v);
                vecs.set_full(&e);
            }
        }
        Ok(())
    }
}

/// Diagonalize a Hermitian matrix, returning eigenvalues sorted ascending
/// and the matching eigenvector matrix (columns in the same order).
fn diagonalize_hermitian(m: &Mat<C64>) -> Result<(Vec<f64>, Mat<C64>), ExchangeError> {
    let eig = m
        .self_adjoint_eigen(Side::Lower)
        .map_err(|_| ExchangeError::LapackError { info: -1 })?;

    let raw_vals: Vec<f64> = eig.S().column_vector().iter().map(|c| c.re).collect();
    let u = eig.U().to_owned();
    let n = raw_vals.len();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| raw_vals[a].partial_cmp(&raw_vals[b]).unwrap());

    let vals: Vec<f64> = order.iter().map(|&i| raw_vals[i]).collect();
    let mut vecs = Mat::<C64>::zeros(n, n);
    for (new_col, &old_col) in order.iter().enumerate() {
        for row in 0..n {
            vecs[(row, new_col)] = u[(row, old_col)];
        }
    }
    Ok((vals, vecs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collinear_eigen_sorts_each_half_ascending() {
        let n = 2;
        let mut h = SpinBlockMatrix::new(Layout::Collinear, n);
        h.set_up(&Mat::<C64>::from_fn(n, n, |i, j| if i == j { C64::new((n - i) as f64, 0.) } else { C64::ZERO }));
        h.set_down(&Mat::<C64>::identity(n, n));

        let ws = EigenWorkspace::new(Layout::Collinear, n);
        let mut vals = MagneticVector::zeros(n);
        let mut vecs = SpinBlockMatrix::new(Layout::Collinear, n);
        ws.eigen_into(&mut vals, &mut vecs, &h).unwrap();

        assert!(vals.up().windows(2).all(|w| w[0] <= w[1]));
        assert!(vals.down().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn noncollinear_eigen_on_identity_gives_unit_eigenvalues() {
        let n = 2;
        let mut h = SpinBlockMatrix::new(Layout::NonCollinear, n);
        h.set_up(&Mat::<C64>::identity(n, n));
        h.set_down(&Mat::<C64>::identity(n, n));

        let ws = EigenWorkspace::new(Layout::NonCollinear, n);
        let mut vals = MagneticVector::zeros(n);
        let mut vecs = SpinBlockMatrix::new(Layout::NonCollinear, n);
        ws.eigen_into(&mut vals, &mut vecs, &h).unwrap();

        for &v in vals.as_slice() {
            assert!((v - 1.0).abs() < 1e-9);
        }
    }
}
