//! Atom catalog and real-space lattice cell.

use std::ops::Range;

use faer::Mat;

use crate::tb::LatticeVector;

/// A catalog entry: symbol, Cartesian position, and the orbital index range
/// (into the up-spin sub-basis) occupied by this atom. `uprange` is `None`
/// when the collaborator that built the atom list lacked orbital metadata
/// for it; per the error-handling contract, pairs involving such an atom
/// are silently skipped rather than treated as an error.
#[derive(Debug, Clone)]
pub struct Atom {
    pub symbol: String,
    pub position: [f64; 3],
    pub uprange: Option<Range<usize>>,
}

impl Atom {
    pub fn new(symbol: impl Into<String>, position: [f64; 3], uprange: Range<usize>) -> Self {
        Atom {
            symbol: symbol.into(),
            position,
            uprange: Some(uprange),
        }
    }

    pub fn without_orbitals(symbol: impl Into<String>, position: [f64; 3]) -> Self {
        Atom {
            symbol: symbol.into(),
            position,
            uprange: None,
        }
    }

    pub fn n_orbitals(&self) -> Option<usize> {
        self.uprange.as_ref().map(|r| r.len())
    }
}

/// The 3x3 real-space lattice matrix, rows `a1, a2, a3`.
#[derive(Debug, Clone)]
pub struct Cell {
    matrix: Mat<f64>,
}

impl Cell {
    pub fn new(a1: [f64; 3], a2: [f64; 3], a3: [f64; 3]) -> Self {
        let matrix = Mat::<f64>::from_fn(3, 3, |i, j| match i {
            0 => a1[j],
            1 => a2[j],
            _ => a3[j],
        });
        Cell { matrix }
    }

    /// Translate a Cartesian position by the lattice vector `r`.
    pub fn translate(&self, position: [f64; 3], r: LatticeVector) -> [f64; 3] {
        let (rx, ry, rz) = r.as_f64();
        let mut out = position;
        for col in 0..3 {
            out[col] += rx * self.matrix[(0, col)] + ry * self.matrix[(1, col)] + rz * self.matrix[(2, col)];
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_by_zero_is_identity() {
        let cell = Cell::new([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]);
        let p = [0.3, 0.4, 0.5];
        assert_eq!(cell.translate(p, LatticeVector::new(0, 0, 0)), p);
    }

    #[test]
    fn translate_adds_lattice_vector_for_cubic_cell() {
        let cell = Cell::new([2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]);
        let p = [0.0, 0.0, 0.0];
        let moved = cell.translate(p, LatticeVector::new(1, 0, 0));
        assert!((moved[0] - 2.0).abs() < 1e-12);
    }
}
