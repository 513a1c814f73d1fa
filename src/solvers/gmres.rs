/*!

# GMRES Solution of the Z-Vector Equations

A Jacobi-preconditioned generalized minimal residual solver for the
nonsymmetric linear systems `A x = b` of the orbital/CI response. The
matrix is only accessed through products with trial vectors, so the
(very large) response matrix never has to be stored. The Krylov subspace
grows until convergence; there is no restart.

*/

use crate::defaults;
use crate::solvers::utils;
use ndarray::prelude::*;
use ndarray::Data;
use ndarray_linalg::{LeastSquaresSvd, Norm};
use serde::{Deserialize, Serialize};
use std::error;
use std::fmt;
use std::time::Instant;

#[derive(Debug, PartialEq)]
pub enum GmresError {
    /// The Krylov iteration exhausted its budget. The z-vector equations
    /// are not solvable with the current settings.
    NotConverged { iterations: usize },
}

impl fmt::Display for GmresError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GmresError::NotConverged { iterations } => write!(
                f,
                "GMRES did not converge within {} iterations! \
                 Increase the iteration budget or loosen the convergence threshold.",
                iterations
            ),
        }
    }
}

impl error::Error for GmresError {}

/// Abstract Trait defining the API required by solver engines.
///
/// Engines provide the product of the response matrix with a trial vector
/// so that iterative solvers do not require the target matrix be stored
/// directly. The product must be strictly linear in the trial vector.
pub trait GmresEngine {
    /// Compute the matrix * trial vector product `A x`.
    fn apply(&self, x: ArrayView1<f64>) -> Array1<f64>;

    /// Return the size of the matrix problem.
    fn size(&self) -> usize;
}

impl<S> GmresEngine for ArrayBase<S, Ix2>
where
    S: Data<Elem = f64>,
{
    fn apply(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        self.dot(&x)
    }

    fn size(&self) -> usize {
        self.nrows()
    }
}

/// Iteration budget and convergence threshold of the solver.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct GmresConfig {
    pub max_iter: usize,
    pub conv: f64,
}

impl Default for GmresConfig {
    fn default() -> Self {
        GmresConfig {
            max_iter: defaults::MAX_ITER,
            conv: defaults::CONV,
        }
    }
}

/// Structure with the results of the GMRES iteration.
pub struct Gmres {
    pub x: Array1<f64>,
    pub iterations: usize,
    /// Least-squares residual norm of each subspace solve.
    pub residual_norms: Vec<f64>,
}

impl Gmres {
    /// Solve the preconditioned system `(D o A) x = D o b`.
    /// * `engine` an object that implements the `GmresEngine` trait.
    /// * `b` the right-hand side (unscaled).
    /// * `precond` the inverted diagonal of `A`; entries too small to
    ///   invert must be set to 1.0 by the caller.
    /// * `config` iteration budget and convergence threshold.
    pub fn solve<E: GmresEngine>(
        engine: &E,
        b: Array1<f64>,
        precond: ArrayView1<f64>,
        config: &GmresConfig,
    ) -> Result<Self, GmresError> {
        // Timer to measure the time within the GMRES routine.
        let timer: Instant = Instant::now();

        // Dimension of the original matrix problem.
        let dim: usize = engine.size();
        assert_eq!(b.len(), dim, "right-hand side does not match the engine");
        assert_eq!(precond.len(), dim, "preconditioner does not match the engine");

        let max_iter: usize = config.max_iter;

        // The initial information of the GMRES routine are printed.
        utils::print_gmres_init(max_iter, config.conv);

        // The right-hand side absorbs the diagonal scaling.
        let b: Array1<f64> = b * &precond;

        let mut x_new: Array1<f64> = Array1::zeros(dim);
        let mut x_old: Array1<f64> = Array1::zeros(dim);

        // Krylov basis (rows) and the upper Hessenberg matrix. The extra
        // Hessenberg row holds the subdiagonal elements of the Arnoldi
        // recursion.
        let mut q: Array2<f64> = Array2::zeros((max_iter, dim));
        let mut h: Array2<f64> = Array2::zeros((max_iter + 1, max_iter));
        let mut bh: Array1<f64> = Array1::zeros(max_iter + 1);

        // Initial residual for the zero starting vector. A vanishing
        // right-hand side is already solved by it.
        let r: Array1<f64> = &b - &(engine.apply(x_new.view()) * &precond);
        bh[0] = r.norm();
        if bh[0] < config.conv {
            utils::print_gmres_end(true, 0, timer);
            return Ok(Gmres {
                x: x_new,
                iterations: 0,
                residual_norms: Vec::new(),
            });
        }
        q.row_mut(0).assign(&(&r / bh[0]));

        let mut residual_norms: Vec<f64> = Vec::with_capacity(16);

        // Initialization of the result.
        let mut result: Result<Self, GmresError> = Err(GmresError::NotConverged {
            iterations: max_iter,
        });

        for iter in 0..max_iter {
            // 1. Convergence of the solution vector is checked before the
            //    subspace is expanded further. The first iterations are
            //    excluded since the solution estimate is still meaningless.
            let diff: f64 = (&x_new - &x_old).norm();
            if diff < config.conv && iter > 2 {
                result = Ok(Gmres {
                    x: x_new.clone(),
                    iterations: iter,
                    residual_norms: residual_norms.clone(),
                });
                break;
            }
            x_old.assign(&x_new);

            // 2. Arnoldi step: the preconditioned product with the newest
            //    basis vector is orthogonalized against all previous ones,
            //    filling column `iter` of the Hessenberg matrix.
            let mut y: Array1<f64> = engine.apply(q.row(iter)) * &precond;
            for i in 0..=iter {
                let hij: f64 = q.row(i).dot(&y);
                h[[i, iter]] = hij;
                y.scaled_add(-hij, &q.row(i));
            }
            let sub: f64 = y.norm();
            h[[iter + 1, iter]] = sub;
            // An (almost) vanishing subdiagonal element means the Krylov
            // subspace is invariant and the solution is exact.
            let breakdown: bool = sub < defaults::BREAKDOWN_TOL;

            // 3. The solution estimate minimizes the residual over the
            //    current subspace: least-squares solve of the leading
            //    (iter+2) x (iter+1) sub-Hessenberg against beta*e1.
            let h_sub: Array2<f64> = h.slice(s![..iter + 2, ..iter + 1]).to_owned();
            let bh_sub: Array1<f64> = bh.slice(s![..iter + 2]).to_owned();
            let ck: Array1<f64> = h_sub.least_squares(&bh_sub).unwrap().solution;

            let res: f64 = (h_sub.dot(&ck) - &bh_sub).norm();
            residual_norms.push(res);

            // 4. The new solution estimate in the original basis.
            x_new = q.slice(s![..iter + 1, ..]).t().dot(&ck);

            // The information of the current iteration is printed to the console.
            utils::print_gmres_iteration(iter, res, (&x_new - &x_old).norm());

            if breakdown {
                result = Ok(Gmres {
                    x: x_new.clone(),
                    iterations: iter + 1,
                    residual_norms: residual_norms.clone(),
                });
                break;
            }

            // 5. The normalized remainder becomes the next basis vector.
            if iter + 1 < max_iter {
                q.row_mut(iter + 1).assign(&(&y / sub));
            }
        }

        // The end of the GMRES routine is noted in the console together with
        // information about the used wall time.
        let (converged, iterations) = match &result {
            Ok(g) => (true, g.iterations),
            Err(_) => (false, max_iter),
        };
        utils::print_gmres_end(converged, iterations, timer);

        result
    }
}
