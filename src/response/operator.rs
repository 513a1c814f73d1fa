/*!

# Action of the Response Matrix

The coupled orbital/CI response matrix of the DSRG-MRPT2 gradient is far
too large to store, but its action on a trial vector reduces to a fixed
set of tensor contractions over the frozen molecular-orbital integrals,
the reference densities and the CI coupling machinery. This module
evaluates that action for the spin-adapted (restricted) case; spin-summed
factors absorb the beta channel.

*/

use crate::active_space::{ActiveSpaceSolver, ReferenceDensities};
use crate::integrals::Space::{Active as A, Core as C, Virtual as V};
use crate::integrals::{MoIntegrals, Space};
use crate::response::layout::{antisymmetrize, ResponseLayout};
use crate::solvers::GmresEngine;
use crate::utils::{contract0, contract2, contract4};
use ndarray::prelude::*;

/// Matrix-free representation of the response matrix `A`.
///
/// All borrowed inputs are frozen for the lifetime of a solve; `apply` is
/// strictly linear in the trial vector.
pub struct ResponseOperator<'a> {
    ints: &'a MoIntegrals,
    rdms: &'a ReferenceDensities,
    as_solver: &'a dyn ActiveSpaceSolver,
    /// Normalized reference CI vector.
    ci: ArrayView1<'a, f64>,
    /// Reference energy relative to the nuclear repulsion, subtracted
    /// from the diagonal of the CI-CI coupling.
    e_ref: f64,
    layout: &'a ResponseLayout,
}

impl<'a> ResponseOperator<'a> {
    pub fn new(
        ints: &'a MoIntegrals,
        rdms: &'a ReferenceDensities,
        as_solver: &'a dyn ActiveSpaceSolver,
        ci: ArrayView1<'a, f64>,
        e_ref: f64,
        layout: &'a ResponseLayout,
    ) -> Self {
        let na: usize = ints.spaces.n_actv;
        assert_eq!(rdms.gamma1.dim(), (na, na), "gamma1 has the wrong shape");
        assert_eq!(
            rdms.gamma2.dim(),
            (na, na, na, na),
            "gamma2 has the wrong shape"
        );
        assert_eq!(
            ci.len(),
            as_solver.n_determinants(),
            "reference CI vector does not match the active-space solver"
        );
        assert_eq!(layout.n_dets, ci.len(), "layout does not match the CI space");
        ResponseOperator {
            ints,
            rdms,
            as_solver,
            ci,
            e_ref,
            layout,
        }
    }
}

impl GmresEngine for ResponseOperator<'_> {
    fn size(&self) -> usize {
        self.layout.dim
    }

    fn apply(&self, x: ArrayView1<f64>) -> Array1<f64> {
        let ints: &MoIntegrals = self.ints;
        let g1: ArrayView2<f64> = self.rdms.gamma1.view();
        let g2: ArrayView4<f64> = self.rdms.gamma2.view();
        // Two-electron block (pq|rs) over four orbital spaces.
        let v = |p: Space, q: Space, r: Space, s: Space| ints.eri(p, q, r, s);

        // Trial vector blocks; the active-active block is completed
        // antisymmetrically before it enters any contraction.
        let k_vc: Array2<f64> = self.layout.unpack_orb("vc", x);
        let k_ca: Array2<f64> = self.layout.unpack_orb("ca", x);
        let k_va: Array2<f64> = self.layout.unpack_orb("va", x);
        let mut k_aa: Array2<f64> = self.layout.unpack_orb("aa", x);
        antisymmetrize(&mut k_aa);
        let k_ci: Array1<f64> = self.layout.unpack_ci(x);

        // Core Hamiltonian dressed with the closed-shell field.
        let hv_aa: Array2<f64> = &ints.h(A, A) + &ints.vc(A, A);
        let hv_cc: Array2<f64> = &ints.h(C, C) + &ints.vc(C, C);
        let hv_ac: Array2<f64> = &ints.h(A, C) + &ints.vc(A, C);
        let hv_av: Array2<f64> = &ints.h(A, V) + &ints.vc(A, V);
        let hv_cv: Array2<f64> = &ints.h(C, V) + &ints.vc(C, V);
        let hv_vc: Array2<f64> = &ints.h(V, C) + &ints.vc(V, C);
        let hv_vv: Array2<f64> = &ints.h(V, V) + &ints.vc(V, V);

        // VIRTUAL-CORE response
        let mut y_vc: Array2<f64> = &ints.delta(C, V).t() * &k_vc;
        y_vc -= &contract2("ue,mu->em", &[&ints.f(A, V), &k_ca]);
        y_vc += &contract2("um,eu->em", &[&ints.f(A, C), &k_va]);
        y_vc -= &(4.0 * contract2("fnem,fn->em", &[&v(V, C, V, C), &k_vc]));
        y_vc += &contract2("fmen,fn->em", &[&v(V, C, V, C), &k_vc]);
        y_vc += &contract2("nmef,fn->em", &[&v(C, C, V, V), &k_vc]);
        y_vc -= &(4.0 * contract2("unem,nu->em", &[&v(A, C, V, C), &k_ca]));
        y_vc += &contract2("umen,nu->em", &[&v(A, C, V, C), &k_ca]);
        y_vc += &contract2("nmeu,nu->em", &[&v(C, C, V, A), &k_ca]);
        y_vc -= &(2.0 * contract2("vuem,uv->em", &[&v(A, A, V, C), &k_aa]));
        y_vc += &contract2("vmeu,uv->em", &[&v(A, C, V, A), &k_aa]);
        y_vc += &(4.0 * contract2("uv,vnem,nu->em", &[&g1, &v(A, C, V, C), &k_ca]));
        y_vc -= &contract2("uv,vmen,nu->em", &[&g1, &v(A, C, V, C), &k_ca]);
        y_vc -= &contract2("uv,nmev,nu->em", &[&g1, &v(C, C, V, A), &k_ca]);
        y_vc -= &(4.0 * contract2("uv,fvem,fu->em", &[&g1, &v(V, A, V, C), &k_va]));
        y_vc += &contract2("uv,fmev,fu->em", &[&g1, &v(V, C, V, A), &k_va]);
        y_vc += &contract2("uv,vmef,fu->em", &[&g1, &v(A, C, V, V), &k_va]);

        // CORE-ACTIVE response
        let mut y_ca: Array2<f64> = contract2("we,em->mw", &[&ints.f(A, V), &k_vc]);
        y_ca -= &contract2("vm,wv->mw", &[&ints.f(A, C), &k_aa]);
        y_ca += &contract2("uw,mu->mw", &[&ints.f(A, A), &k_ca]);
        y_ca -= &contract2("mn,nw->mw", &[&ints.f(C, C), &k_ca]);
        y_ca -= &contract2("vw,uv,mu->mw", &[&hv_aa, &g1, &k_ca]);
        y_ca += &contract2("mn,uw,nu->mw", &[&hv_cc, &g1, &k_ca]);
        y_ca -= &contract2("mf,uw,fu->mw", &[&hv_cv, &g1, &k_va]);
        y_ca += &(4.0 * contract2("fnwm,fn->mw", &[&v(V, C, A, C), &k_vc]));
        y_ca -= &contract2("fmwn,fn->mw", &[&v(V, C, A, C), &k_vc]);
        y_ca -= &contract2("fwmn,fn->mw", &[&v(V, A, C, C), &k_vc]);
        y_ca += &(4.0 * contract2("unwm,nu->mw", &[&v(A, C, A, C), &k_ca]));
        y_ca -= &contract2("umwn,nu->mw", &[&v(A, C, A, C), &k_ca]);
        y_ca -= &contract2("uwmn,nu->mw", &[&v(A, A, C, C), &k_ca]);
        y_ca -= &(4.0 * contract2("uv,vnwm,nu->mw", &[&g1, &v(A, C, A, C), &k_ca]));
        y_ca += &contract2("uv,vmwn,nu->mw", &[&g1, &v(A, C, A, C), &k_ca]);
        y_ca += &contract2("uv,vwmn,nu->mw", &[&g1, &v(A, A, C, C), &k_ca]);
        y_ca += &(4.0 * contract2("uv,fvwm,fu->mw", &[&g1, &v(V, A, A, C), &k_va]));
        y_ca -= &contract2("uv,fmwv,fu->mw", &[&g1, &v(V, C, A, A), &k_va]);
        y_ca -= &contract2("uv,fwmv,fu->mw", &[&g1, &v(V, A, C, A), &k_va]);
        y_ca += &(2.0 * contract2("vuwm,uv->mw", &[&v(A, A, A, C), &k_aa]));
        y_ca -= &contract2("vmwu,uv->mw", &[&v(A, C, A, A), &k_aa]);
        y_ca -= &(4.0 * contract2("uw,fnum,fn->mw", &[&g1, &v(V, C, A, C), &k_vc]));
        y_ca += &contract2("uw,fmun,fn->mw", &[&g1, &v(V, C, A, C), &k_vc]);
        y_ca += &contract2("uw,fumn,fn->mw", &[&g1, &v(V, A, C, C), &k_vc]);
        y_ca -= &(4.0 * contract2("wv,unvm,nu->mw", &[&g1, &v(A, C, A, C), &k_ca]));
        y_ca += &contract2("wv,uvmn,nu->mw", &[&g1, &v(A, A, C, C), &k_ca]);
        y_ca += &contract2("wv,umvn,nu->mw", &[&g1, &v(A, C, A, C), &k_ca]);
        y_ca -= &(2.0 * contract2("wv,qpvm,pq->mw", &[&g1, &v(A, A, A, C), &k_aa]));
        y_ca += &contract2("wv,qmvp,pq->mw", &[&g1, &v(A, C, A, A), &k_aa]);
        y_ca -= &contract2("uvxy,mu,xwyv->mw", &[&g2, &k_ca, &v(A, A, A, A)]);
        y_ca += &contract2("uwxy,nu,xnym->mw", &[&g2, &k_ca, &v(A, C, A, C)]);
        y_ca -= &contract2("uvwy,fu,fmvy->mw", &[&g2, &k_va, &v(V, C, A, A)]);
        y_ca += &contract2("uvwy,fu,fyvm->mw", &[&g2, &k_va, &v(V, A, A, C)]);
        y_ca += &contract2("uvwy,nu,mnyv->mw", &[&g2, &k_ca, &v(C, C, A, A)]);
        y_ca -= &contract2("uvwy,nu,mvyn->mw", &[&g2, &k_ca, &v(C, A, A, C)]);
        y_ca -= &contract2("uwxy,fu,fxmy->mw", &[&g2, &k_va, &v(V, A, C, A)]);

        // VIRTUAL-ACTIVE response
        let mut y_va: Array2<f64> = contract2("nw,en->ew", &[&ints.f(C, A), &k_vc]);
        y_va -= &contract2("ve,wv->ew", &[&ints.f(A, V), &k_aa]);
        y_va += &contract2("vw,uv,eu->ew", &[&hv_aa, &g1, &k_va]);
        y_va += &contract2("en,uw,nu->ew", &[&hv_vc, &g1, &k_ca]);
        y_va -= &contract2("ef,uw,fu->ew", &[&hv_vv, &g1, &k_va]);
        y_va -= &(4.0 * contract2("uw,fneu,fn->ew", &[&g1, &v(V, C, V, A), &k_vc]));
        y_va += &contract2("uw,fuen,fn->ew", &[&g1, &v(V, A, V, C), &k_vc]);
        y_va += &contract2("uw,feun,fn->ew", &[&g1, &v(V, V, A, C), &k_vc]);
        y_va -= &(4.0 * contract2("wv,unev,nu->ew", &[&g1, &v(A, C, V, A), &k_ca]));
        y_va += &contract2("wv,uven,nu->ew", &[&g1, &v(A, A, V, C), &k_ca]);
        y_va += &contract2("wv,uevn,nu->ew", &[&g1, &v(A, V, A, C), &k_ca]);
        y_va -= &(2.0 * contract2("wv,pqev,pq->ew", &[&g1, &v(A, A, V, A), &k_aa]));
        y_va += &contract2("wv,pveq,pq->ew", &[&g1, &v(A, A, V, A), &k_aa]);
        y_va += &contract2("uvxy,eu,xwyv->ew", &[&g2, &k_va, &v(A, A, A, A)]);
        y_va += &contract2("uvwy,nu,enyv->ew", &[&g2, &k_ca, &v(V, C, A, A)]);
        y_va -= &contract2("uvwy,nu,evyn->ew", &[&g2, &k_ca, &v(V, A, A, C)]);
        y_va += &contract2("uwxy,nu,xnye->ew", &[&g2, &k_ca, &v(A, C, A, V)]);
        y_va -= &contract2("uwxy,fu,fxey->ew", &[&g2, &k_va, &v(V, A, V, A)]);
        y_va -= &contract2("uvwy,fu,efyv->ew", &[&g2, &k_va, &v(V, V, A, A)]);
        y_va += &contract2("uvwy,fu,evyf->ew", &[&g2, &k_va, &v(V, A, A, V)]);

        // ACTIVE-ACTIVE response, assembled in a plain intermediate that
        // is antisymmetrized at the end.
        let mut t_aa: Array2<f64> = -contract2("wn,nz->wz", &[&ints.f(A, C), &k_ca]);
        t_aa += &contract2("wn,uz,nu->wz", &[&hv_ac, &g1, &k_ca]);
        t_aa -= &contract2("wf,uz,fu->wz", &[&hv_av, &g1, &k_va]);
        t_aa -= &(2.0 * contract2("zv,qpvw,pq->wz", &[&g1, &v(A, A, A, A), &k_aa]));
        t_aa += &contract2("zv,qwvp,pq->wz", &[&g1, &v(A, A, A, A), &k_aa]);
        t_aa -= &(4.0 * contract2("uz,fnuw,fn->wz", &[&g1, &v(V, C, A, A), &k_vc]));
        t_aa += &contract2("uz,fwun,fn->wz", &[&g1, &v(V, A, A, C), &k_vc]);
        t_aa += &contract2("uz,fuwn,fn->wz", &[&g1, &v(V, A, A, C), &k_vc]);
        t_aa -= &(4.0 * contract2("zv,unvw,nu->wz", &[&g1, &v(A, C, A, A), &k_ca]));
        t_aa += &contract2("zv,uwvn,nu->wz", &[&g1, &v(A, A, A, C), &k_ca]);
        t_aa += &contract2("zv,uvwn,nu->wz", &[&g1, &v(A, A, A, C), &k_ca]);
        t_aa += &contract2("uzxy,nu,xnyw->wz", &[&g2, &k_ca, &v(A, C, A, A)]);
        t_aa += &contract2("uvzy,nu,wnyv->wz", &[&g2, &k_ca, &v(A, C, A, A)]);
        t_aa -= &contract2("uvzy,nu,wvyn->wz", &[&g2, &k_ca, &v(A, A, A, C)]);
        t_aa -= &contract2("uzxy,fu,fxwy->wz", &[&g2, &k_va, &v(V, A, A, A)]);
        t_aa -= &contract2("uvzy,fu,fwvy->wz", &[&g2, &k_va, &v(V, A, A, A)]);
        t_aa += &contract2("uvzy,fu,fyvw->wz", &[&g2, &k_va, &v(V, A, A, A)]);

        // MO RESPONSE -- CI coupling: transition densities of the CI
        // component of the trial vector enter the orbital blocks.
        let cc1: Array2<f64> = self.as_solver.generalized_rdm1(k_ci.view());
        let cc2: Array4<f64> = self.as_solver.generalized_rdm2(k_ci.view());
        let ci_dot: f64 = self.ci.dot(&k_ci);

        t_aa -= &(0.5 * contract2("vw,zv->wz", &[&ints.h(A, A), &cc1]));
        t_aa -= &(0.5 * contract2("uw,uz->wz", &[&ints.vc(A, A), &cc1]));
        t_aa -= &(0.5 * contract2("zvxy,wxvy->wz", &[&cc2, &v(A, A, A, A)]));

        let hv_vc_sym: Array2<f64> = &ints.h(V, C) + &ints.vc(C, V).t();
        y_vc.scaled_add(-ci_dot, &hv_vc_sym);
        y_vc -= &contract2("uv,vuem->em", &[&cc1, &v(A, A, V, C)]);
        y_vc += &(0.5 * contract2("uv,vmeu->em", &[&cc1, &v(A, C, V, A)]));

        let hv_ca_sym: Array2<f64> = &ints.h(A, C).t() + &ints.vc(C, A);
        y_ca.scaled_add(ci_dot, &hv_ca_sym);
        y_ca -= &(0.5 * contract2("vm,wv->mw", &[&ints.h(A, C), &cc1]));
        y_ca -= &(0.5 * contract2("um,uw->mw", &[&ints.vc(A, C), &cc1]));
        y_ca -= &(0.5 * contract2("wvxy,xmyv->mw", &[&cc2, &v(A, C, A, A)]));
        y_ca += &contract2("uv,vuwm->mw", &[&cc1, &v(A, A, A, C)]);
        y_ca -= &(0.5 * contract2("uv,vmwu->mw", &[&cc1, &v(A, C, A, A)]));

        y_va -= &(0.5 * contract2("ve,wv->ew", &[&ints.h(A, V), &cc1]));
        y_va -= &(0.5 * contract2("ue,uw->ew", &[&ints.vc(A, V), &cc1]));
        y_va -= &(0.5 * contract2("wvxy,exvy->ew", &[&cc2, &v(V, A, A, A)]));

        let mut y_aa: Array2<f64> = &t_aa - &t_aa.t();
        y_aa += &(&ints.delta(A, A).t() * &k_aa);

        // CI RESPONSE -- MO coupling: scalar couplings along the reference
        // vector plus effective one- and two-body operators contracted
        // into the determinant basis.
        let mut y_ci: Array1<f64> = Array1::zeros(self.layout.n_dets);

        let mut s: f64 = 0.0;
        s += 8.0 * contract0("vn,uv,nu->u", &[&hv_ac, &g1, &k_ca]);
        s -= 8.0 * contract0("ve,uv,eu->u", &[&hv_av, &g1, &k_va]);
        s -= 16.0 * contract0("xy,em,emxy->x", &[&g1, &k_vc, &v(V, C, A, A)]);
        s += 8.0 * contract0("xy,em,eyxm->x", &[&g1, &k_vc, &v(V, A, A, C)]);
        s -= 16.0 * contract0("xy,nu,unyx->x", &[&g1, &k_ca, &v(A, C, A, A)]);
        s += 8.0 * contract0("xy,nu,uxyn->x", &[&g1, &k_ca, &v(A, A, A, C)]);
        s -= 8.0 * contract0("xy,uv,uvyx->x", &[&g1, &k_aa, &v(A, A, A, A)]);
        s += 4.0 * contract0("xy,uv,uxyv->x", &[&g1, &k_aa, &v(A, A, A, A)]);
        s += 8.0 * contract0("uvxy,nu,xnyv->u", &[&g2, &k_ca, &v(A, C, A, A)]);
        s -= 8.0 * contract0("uvxy,eu,exvy->u", &[&g2, &k_va, &v(V, A, A, A)]);
        y_ci.scaled_add(s, &self.ci);

        // Effective one-body operator of the orbital response.
        let mut t1: Array2<f64> = -2.0 * contract2("vn,nu->uv", &[&hv_ac, &k_ca]);
        t1 += &(2.0 * contract2("ve,eu->uv", &[&hv_av, &k_va]));
        t1 += &(4.0 * contract2("em,emuv->uv", &[&k_vc, &v(V, C, A, A)]));
        t1 -= &(2.0 * contract2("em,evum->uv", &[&k_vc, &v(V, A, A, C)]));
        t1 += &(4.0 * contract2("nu,unyx->xy", &[&k_ca, &v(A, C, A, A)]));
        t1 -= &(2.0 * contract2("nu,uxyn->xy", &[&k_ca, &v(A, A, A, C)]));
        t1 += &(2.0 * contract2("uv,uvyx->xy", &[&k_aa, &v(A, A, A, A)]));
        t1 -= &contract2("uv,uxyv->xy", &[&k_aa, &v(A, A, A, A)]);
        let sym1: Array2<f64> = &t1 + &t1.t();

        // Effective two-body operator, antisymmetrized in both index pairs
        // and symmetrized under pair exchange.
        let mut t2: Array4<f64> = -2.0 * contract4("nu,xnyv->uvxy", &[&k_ca, &v(A, C, A, A)]);
        t2 += &(2.0 * contract4("eu,exvy->uvxy", &[&k_va, &v(V, A, A, A)]));
        let asym: Array4<f64> = &t2 - &t2.view().permuted_axes([0, 1, 3, 2])
            - &t2.view().permuted_axes([1, 0, 2, 3])
            + &t2.view().permuted_axes([1, 0, 3, 2]);
        let sym2: Array4<f64> = &asym + &asym.view().permuted_axes([2, 3, 0, 1]);

        self.as_solver
            .add_sigma_kbody(sym1.view(), sym2.view(), &mut y_ci);

        // CI-CI coupling.
        let c0: f64 = ints.core_trace() - self.e_ref;
        y_ci.scaled_add(c0, &k_ci);
        y_ci += &self.as_solver.generalized_sigma(k_ci.view());

        let mut out: Array1<f64> = Array1::zeros(self.layout.dim);
        self.layout.pack_orb("vc", y_vc.view(), &mut out);
        self.layout.pack_orb("ca", y_ca.view(), &mut out);
        self.layout.pack_orb("va", y_va.view(), &mut out);
        self.layout.pack_orb("aa", y_aa.view(), &mut out);
        self.layout.pack_ci(y_ci.view(), &mut out);
        out
    }
}
