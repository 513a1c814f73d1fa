use crate::active_space::{ActiveSpaceSolver, ReferenceDensities};
use crate::integrals::MoIntegrals;
use crate::integrals::Space::{Active as A, Core as C, Virtual as V};
use crate::response::layout::{antisymmetrize, ResponseLayout};
use crate::response::operator::ResponseOperator;
use crate::response::preconditioner::build_preconditioner;
use crate::solvers::gmres::{Gmres, GmresConfig};
use anyhow::{ensure, Context, Result};
use log::info;
use ndarray::prelude::*;
use ndarray_stats::QuantileExt;

/// Solution of the z-vector equations.
pub struct ZVectorResponse {
    /// Orbital-rotation multipliers over the full MO range. The
    /// off-diagonal space blocks are completed symmetrically
    /// (`z[m,e] = z[e,m]`), the active-active block antisymmetrically.
    /// Under the restricted precondition the beta blocks equal this
    /// alpha matrix.
    pub z: Array2<f64>,
    /// CI response, projected orthogonal to the reference vector.
    pub x_ci: Array1<f64>,
    pub iterations: usize,
    pub residual_norms: Vec<f64>,
}

/// Driver for the coupled orbital/CI response equations `A x = b`.
pub struct ZVectorSolver<'a> {
    ints: &'a MoIntegrals,
    rdms: &'a ReferenceDensities,
    as_solver: &'a dyn ActiveSpaceSolver,
    ci: ArrayView1<'a, f64>,
    e_ref: f64,
    config: GmresConfig,
    layout: ResponseLayout,
}

impl<'a> ZVectorSolver<'a> {
    /// Validate the frozen inputs and build the packing layout.
    /// * `ci` the normalized reference CI vector.
    /// * `e_ref` the reference energy relative to the nuclear repulsion,
    ///   entering the CI-CI diagonal.
    pub fn new(
        ints: &'a MoIntegrals,
        rdms: &'a ReferenceDensities,
        as_solver: &'a dyn ActiveSpaceSolver,
        ci: ArrayView1<'a, f64>,
        e_ref: f64,
        config: GmresConfig,
    ) -> Result<Self> {
        ensure!(
            ints.restricted,
            "the z-vector equations require restricted orbitals; \
             beta multipliers are mirrored from the alpha blocks"
        );
        ensure!(
            ci.len() == as_solver.n_determinants(),
            "reference CI vector has {} entries, the active-space solver expects {}",
            ci.len(),
            as_solver.n_determinants()
        );
        let norm: f64 = ci.dot(&ci).sqrt();
        ensure!(
            (norm - 1.0).abs() < 1.0e-8,
            "reference CI vector is not normalized (|c| = {})",
            norm
        );
        let layout = ResponseLayout::new(&ints.spaces, ci.len());
        Ok(ZVectorSolver {
            ints,
            rdms,
            as_solver,
            ci,
            e_ref,
            config,
            layout,
        })
    }

    pub fn layout(&self) -> &ResponseLayout {
        &self.layout
    }

    /// Solve `A x = b` and unfold the solution into the multiplier
    /// matrix and the projected CI response.
    pub fn solve(&self, b: Array1<f64>) -> Result<ZVectorResponse> {
        ensure!(
            b.len() == self.layout.dim,
            "right-hand side has length {}, the response dimension is {}",
            b.len(),
            self.layout.dim
        );
        info!(
            "Solving the z-vector equations: dim = {} ({} orbital + {} CI)",
            self.layout.dim,
            self.layout.dim - self.layout.n_dets,
            self.layout.n_dets
        );

        let operator = ResponseOperator::new(
            self.ints,
            self.rdms,
            self.as_solver,
            self.ci.view(),
            self.e_ref,
            &self.layout,
        );
        let precond: Array1<f64> = build_preconditioner(
            self.ints,
            self.rdms,
            self.e_ref,
            &self.layout,
            crate::defaults::SINGULARITY_TOL,
        );
        let scale: Array1<f64> = precond.mapv(f64::abs);
        info!(
            "Jacobi scaling range: {:.3e} -- {:.3e}",
            scale.min().unwrap(),
            scale.max().unwrap()
        );

        let gmres: Gmres = Gmres::solve(&operator, b, precond.view(), &self.config)
            .context("solving the z-vector response equations")?;
        let x: Array1<f64> = gmres.x;

        // The CI response is only determined up to a component along the
        // reference vector; it is projected out of the solution.
        let mut x_ci: Array1<f64> = self.layout.unpack_ci(x.view());
        let overlap: f64 = self.ci.dot(&x_ci);
        x_ci.scaled_add(-overlap, &self.ci);

        // Unfold the orbital blocks into the full MO range with their
        // symmetry completions.
        let spaces = &self.ints.spaces;
        let (rc, ra, rv) = (spaces.range(C), spaces.range(A), spaces.range(V));
        let mut z: Array2<f64> = Array2::zeros((spaces.n_orb(), spaces.n_orb()));

        let z_vc: Array2<f64> = self.layout.unpack_orb("vc", x.view());
        z.slice_mut(s![rv.clone(), rc.clone()]).assign(&z_vc);
        z.slice_mut(s![rc.clone(), rv.clone()]).assign(&z_vc.t());

        let z_ca: Array2<f64> = self.layout.unpack_orb("ca", x.view());
        z.slice_mut(s![rc.clone(), ra.clone()]).assign(&z_ca);
        z.slice_mut(s![ra.clone(), rc.clone()]).assign(&z_ca.t());

        let z_va: Array2<f64> = self.layout.unpack_orb("va", x.view());
        z.slice_mut(s![rv.clone(), ra.clone()]).assign(&z_va);
        z.slice_mut(s![ra.clone(), rv.clone()]).assign(&z_va.t());

        let mut z_aa: Array2<f64> = self.layout.unpack_orb("aa", x.view());
        antisymmetrize(&mut z_aa);
        z.slice_mut(s![ra.clone(), ra.clone()]).assign(&z_aa);

        Ok(ZVectorResponse {
            z,
            x_ci,
            iterations: gmres.iterations,
            residual_norms: gmres.residual_norms,
        })
    }
}
