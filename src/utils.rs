//! Small linear-algebra helpers shared across the pipeline.
use faer::traits::ComplexField;
use faer::{unzip, zip, Mat};

use crate::C64;

/// Perform componentwise (Hadamard) multiplication on two matrices.
#[inline]
pub fn component_mul(a: &Mat<C64>, b: &Mat<C64>) -> Mat<C64> {
    let mut product = Mat::<C64>::zeros(a.nrows(), a.ncols());
    zip!(&mut product, a, b).for_each(|unzip!(product, x, y)| *product = x * y);
    product
}

/// Assemble a dense matrix from four sub-matrix blocks:
/// ```text
/// [ TL  TR ]
/// [ BL  BR ]
/// ```
#[inline]
pub fn block_matrix<T: ComplexField>(tl: &Mat<T>, tr: &Mat<T>, bl: &Mat<T>, br: &Mat<T>) -> Mat<T> {
    let n_rows = tl.nrows() + bl.nrows();
    let n_cols = tl.ncols() + tr.ncols();
    let mut result = Mat::<T>::zeros(n_rows, n_cols);

    result.submatrix_mut(0, 0, tl.nrows(), tl.ncols()).copy_from(tl);
    result
        .submatrix_mut(0, tl.ncols(), tr.nrows(), tr.ncols())
        .copy_from(tr);
    result
        .submatrix_mut(tl.nrows(), 0, bl.nrows(), bl.ncols())
        .copy_from(bl);
    result
        .submatrix_mut(tl.nrows(), tr.ncols(), br.nrows(), br.ncols())
        .copy_from(br);

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_mul_matches_elementwise_product() {
        let a = Mat::<C64>::from_fn(2, 2, |i, j| C64::new((i + 1) as f64, j as f64));
        let b = Mat::<C64>::identity(2, 2);
        let p = component_mul(&a, &b);
        assert_eq!(p[(0, 0)], a[(0, 0)]);
        assert_eq!(p[(0, 1)], C64::ZERO);
        assert_eq!(p[(1, 1)], a[(1, 1)]);
    }

    #[test]
    fn block_matrix_places_quadrants_correctly() {
        let tl = Mat::<C64>::from_fn(1, 1, |_, _| C64::new(1., 0.));
        let tr = Mat::<C64>::from_fn(1, 1, |_, _| C64::new(2., 0.));
        let bl = Mat::<C64>::from_fn(1, 1, |_, _| C64::new(3., 0.));
        let br = Mat::<C64>::from_fn(1, 1, |_, _| C64::new(4., 0.));
        let m = block_matrix(&tl, &tr, &bl, &br);
        assert_eq!(m[(0, 0)], C64::new(1., 0.));
        assert_eq!(m[(0, 1)], C64::new(2., 0.));
        assert_eq!(m[(1, 0)], C64::new(3., 0.));
        assert_eq!(m[(1, 1)], C64::new(4., 0.));
    }
}
