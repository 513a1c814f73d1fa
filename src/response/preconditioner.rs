use crate::active_space::ReferenceDensities;
use crate::integrals::MoIntegrals;
use crate::integrals::Space::{Active as A, Core as C, Virtual as V};
use crate::response::layout::ResponseLayout;
use itertools::iproduct;
use ndarray::prelude::*;

// Entries of the diagonal that are too small to invert are skipped and
// act as the identity in the Jacobi scaling.
fn assign(d: &mut Array1<f64>, idx: usize, value: f64, threshold: f64) {
    if value.abs() > threshold {
        d[idx] = 1.0 / value;
    }
}

/// Inverted diagonal of the response matrix, evaluated block by block
/// with the same dressed integrals the operator uses. The whole CI block
/// shares a single scalar.
pub fn build_preconditioner(
    ints: &MoIntegrals,
    rdms: &ReferenceDensities,
    e_ref: f64,
    layout: &ResponseLayout,
    threshold: f64,
) -> Array1<f64> {
    let nc: usize = ints.spaces.n_core;
    let na: usize = ints.spaces.n_actv;
    let nv: usize = ints.spaces.n_virt;
    let g1: ArrayView2<f64> = rdms.gamma1.view();
    let g2: ArrayView4<f64> = rdms.gamma2.view();

    let mut d: Array1<f64> = Array1::from_elem(layout.dim, 1.0);

    // VIRTUAL-CORE diagonal
    let delta_cv: Array2<f64> = ints.delta(C, V);
    let v_cvvc: Array4<f64> = ints.eri(C, V, V, C);
    let v_ccvv: Array4<f64> = ints.eri(C, C, V, V);
    let offset: usize = layout.offset("vc");
    for (e, m) in iproduct!(0..nv, 0..nc) {
        let value: f64 = delta_cv[[m, e]] - v_cvvc[[m, e, e, m]] + v_ccvv[[m, m, e, e]];
        assign(&mut d, offset + e * nc + m, value, threshold);
    }

    let hv_aa: Array2<f64> = &ints.h(A, A) + &ints.vc(A, A);
    let hv_cc: Array2<f64> = &ints.h(C, C) + &ints.vc(C, C);
    let hv_vv: Array2<f64> = &ints.h(V, V) + &ints.vc(V, V);
    let f_aa: ArrayView2<f64> = ints.f(A, A);
    let f_cc: ArrayView2<f64> = ints.f(C, C);

    // Gamma1-weighted dressed one-electron diagonal, per active orbital.
    let mut hv_g1: Array1<f64> = Array1::zeros(na);
    for (w, v) in iproduct!(0..na, 0..na) {
        hv_g1[w] += hv_aa[[v, w]] * g1[[w, v]];
    }
    // Gamma2 folded with the all-active integrals, per active orbital.
    let v_aaaa: Array4<f64> = ints.eri(A, A, A, A);
    let mut g2_fold: Array1<f64> = Array1::zeros(na);
    for (w, v, x, y) in iproduct!(0..na, 0..na, 0..na, 0..na) {
        g2_fold[w] += g2[[w, v, x, y]] * v_aaaa[[x, w, y, v]];
    }

    // CORE-ACTIVE diagonal
    let v_acca: Array4<f64> = ints.eri(A, C, C, A);
    let v_aacc: Array4<f64> = ints.eri(A, A, C, C);
    let v_caac: Array4<f64> = ints.eri(C, A, A, C);
    let v_ccaa: Array4<f64> = ints.eri(C, C, A, A);
    let offset: usize = layout.offset("ca");
    for (m, w) in iproduct!(0..nc, 0..na) {
        let mut value: f64 = f_aa[[w, w]] - hv_g1[w] - f_cc[[m, m]]
            + hv_cc[[m, m]] * g1[[w, w]]
            + v_acca[[w, m, m, w]]
            - v_aacc[[w, w, m, m]]
            - g2_fold[w];
        for v in 0..na {
            value += g1[[w, v]] * (v_aacc[[w, v, m, m]] - 2.0 * v_acca[[w, m, m, v]]);
        }
        for (v, y) in iproduct!(0..na, 0..na) {
            value += g2[[w, v, w, y]] * (v_ccaa[[m, m, y, v]] - v_caac[[m, v, y, m]]);
        }
        assign(&mut d, offset + m * na + w, value, threshold);
    }

    // VIRTUAL-ACTIVE diagonal
    let v_vava: Array4<f64> = ints.eri(V, A, V, A);
    let v_vaav: Array4<f64> = ints.eri(V, A, A, V);
    let v_vvaa: Array4<f64> = ints.eri(V, V, A, A);
    let offset: usize = layout.offset("va");
    for (e, w) in iproduct!(0..nv, 0..na) {
        let mut value: f64 = hv_g1[w] - hv_vv[[e, e]] * g1[[w, w]] + g2_fold[w];
        for (x, y) in iproduct!(0..na, 0..na) {
            value -= g2[[w, w, x, y]] * v_vava[[e, x, e, y]];
        }
        for (v, y) in iproduct!(0..na, 0..na) {
            value += g2[[w, v, w, y]] * (v_vaav[[e, v, y, e]] - v_vvaa[[e, e, y, v]]);
        }
        assign(&mut d, offset + e * na + w, value, threshold);
    }

    // ACTIVE-ACTIVE diagonal, strict lower triangle
    let delta_aa: Array2<f64> = ints.delta(A, A);
    let offset: usize = layout.offset("aa");
    for w in 1..na {
        for z in 0..w {
            let mut value: f64 = -delta_aa[[w, z]];
            for v in 0..na {
                value += g1[[w, v]] * (v_aaaa[[z, w, v, z]] - v_aaaa[[z, z, v, w]]);
            }
            assign(&mut d, offset + w * (w - 1) / 2 + z, value, threshold);
        }
    }

    // CI diagonal, one scalar for the whole block
    let offset: usize = layout.offset("ci");
    let d_ci: f64 = ints.core_trace() - e_ref;
    for i in 0..layout.n_dets {
        assign(&mut d, offset + i, d_ci, threshold);
    }

    d
}
