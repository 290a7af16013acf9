//! Green's-function contour assembly: per-omega, k-averaged `G(k, omega)`.

use faer::Mat;
use indicatif::ParallelProgressIterator;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::spin_block::{Layout, SpinBlockMatrix};
use crate::tb::KData;
use crate::C64;

/// Per-worker scratch for [`GreensAssembler::integrate_gk_into`], reused
/// across every k-point a given rayon worker is assigned.
pub struct GreensScratch {
    diag: SpinBlockMatrix,
    v_diag: SpinBlockMatrix,
    v_adj: SpinBlockMatrix,
    gk: SpinBlockMatrix,
}

impl GreensScratch {
    pub fn new(layout: Layout, dim: usize) -> Self {
        GreensScratch {
            diag: SpinBlockMatrix::new(layout, dim),
            v_diag: SpinBlockMatrix::new(layout, dim),
            v_adj: SpinBlockMatrix::new(layout, dim),
            gk: SpinBlockMatrix::new(layout, dim),
        }
    }
}

pub struct GreensAssembler;

impl GreensAssembler {
    /// Accumulate the k-averaged Green's function at a single energy `omega`
    /// into `g_out` (assumed pre-zeroed by the caller). For each k:
    /// `G(k,omega) = V * diag(1/(mu+omega-E)) * V^+`. The up-up block of the
    /// accumulation gets the forward translation phase `phases[k]`, the
    /// down-down block gets the conjugate (backward) phase, and the
    /// off-diagonal spin blocks (non-collinear only) are accumulated
    /// unphased, since they contribute only locally.
    pub fn integrate_gk_into(
        g_out: &mut SpinBlockMatrix,
        omega: C64,
        mu: f64,
        kdata: &KData,
        scratch: &mut GreensScratch,
    ) {
        g_out.clear();

        for idx in 0..kdata.kpoints.len() {
            let vals = &kdata.eigvals[idx];
            let vecs = &kdata.eigvecs[idx];
            let phase = kdata.phases[idx];

            let mu_plus_omega = omega + C64::new(mu, 0.0);
            let inv_up: Vec<C64> = vals.up().iter().map(|&e| C64::new(1.0, 0.0) / (mu_plus_omega - e)).collect();
            let inv_down: Vec<C64> = vals.down().iter().map(|&e| C64::new(1.0, 0.0) / (mu_plus_omega - e)).collect();
            scratch.diag.fill_diag(&inv_up, &inv_down);

            SpinBlockMatrix::multiply(&mut scratch.v_diag, vecs, &scratch.diag)
                .expect("V and diag(1/(mu+omega-E)) share layout/dim by construction");
            SpinBlockMatrix::adjoint_into(&mut scratch.v_adj, vecs);
            SpinBlockMatrix::multiply(&mut scratch.gk, &scratch.v_diag, &scratch.v_adj)
                .expect("intermediate products share layout/dim by construction");

            g_out.add_scaled_up(&scratch.gk.up(), phase);
            g_out.add_scaled_down(&scratch.gk.down(), phase.conj());
            if g_out.layout() == Layout::NonCollinear {
                g_out.add_up_down(&scratch.gk.up_down());
                g_out.add_down_up(&scratch.gk.down_up());
            }
        }

        let inv_nk = 1.0 / kdata.kpoints.len().max(1) as f64;
        g_out.scale(C64::new(inv_nk, 0.0));
    }

    /// Dispatch one `G(omega)` per contour point in parallel, each worker
    /// reusing a single [`GreensScratch`] across the omega-points it draws.
    pub fn assemble_all(omega_grid: &[C64], kdata: &KData, mu: f64) -> Vec<SpinBlockMatrix> {
        let layout = kdata.layout;
        let dim = kdata.dim;
        omega_grid
            .par_iter()
            .progress_count(omega_grid.len() as u64)
            .map_init(
                || GreensScratch::new(layout, dim),
                |scratch, &omega| {
                    let mut g = SpinBlockMatrix::new(layout, dim);
                    Self::integrate_gk_into(&mut g, omega, mu, kdata, scratch);
                    g
                },
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kgrid::KGridBuilder;
    use crate::tb::{LatticeVector, TBInterpolator, TBOperator};

    fn single_site_tb(eps: f64) -> TBOperator {
        let mut h0 = SpinBlockMatrix::new(Layout::Collinear, 1);
        h0.set_up(&Mat::<C64>::from_fn(1, 1, |_, _| C64::new(eps, 0.0)));
        h0.set_down(&Mat::<C64>::from_fn(1, 1, |_, _| C64::new(eps, 0.0)));
        TBOperator::new(vec![(LatticeVector::new(0, 0, 0), h0)]).unwrap()
    }

    #[test]
    fn greens_function_pole_structure_is_finite_off_the_real_axis() {
        let tb = single_site_tb(0.0);
        let kpoints = KGridBuilder::uniform_shifted_grid(1, 1, 1, false);
        let kdata = TBInterpolator::build_k_eigens(&tb, kpoints, LatticeVector::new(0, 0, 0)).unwrap();

        let omega = C64::new(0.0, 0.5);
        let mut scratch = GreensScratch::new(Layout::Collinear, 1);
        let mut g = SpinBlockMatrix::new(Layout::Collinear, 1);
        GreensAssembler::integrate_gk_into(&mut g, omega, 0.0, &kdata, &mut scratch);

        let expected = C64::new(1.0, 0.0) / (C64::new(0.0, 0.5) - C64::new(0.0, 0.0));
        assert!((g.up()[(0, 0)] - expected).norm() < 1e-9);
    }
}
