use crate::utils::{contract1, contract2, contract4};
use ndarray::prelude::*;

/// Frozen spin-summed reference densities of the active space.
pub struct ReferenceDensities {
    pub gamma1: Array2<f64>,
    pub gamma2: Array4<f64>,
}

/// Interface to the CI machinery of the active space.
///
/// The response operator only needs transition densities between the
/// reference CI vector and a trial vector, sigma builds, and the
/// contraction of effective MO operators into the determinant basis.
/// Every method must be linear in its vector argument.
pub trait ActiveSpaceSolver {
    /// Number of determinants in the CI expansion.
    fn n_determinants(&self) -> usize;

    /// Spin-summed transition one-density between the reference and
    /// `vector`, symmetrized over bra and ket:
    /// g[u,v] = sum_IJ c_I x_J (<I|E_uv|J> + <J|E_uv|I>).
    fn generalized_rdm1(&self, vector: ArrayView1<f64>) -> Array2<f64>;

    /// Spin-summed transition two-density, symmetrized over bra and ket.
    fn generalized_rdm2(&self, vector: ArrayView1<f64>) -> Array4<f64>;

    /// Active Hamiltonian acting on a CI vector.
    fn generalized_sigma(&self, vector: ArrayView1<f64>) -> Array1<f64>;

    /// Accumulate the effective one- and two-body MO operators against the
    /// reference vector into `sigma`:
    /// sigma_I += sum_J (<I|E_uv|J> f[u,v] + 1/4 <I|e_uvxy|J> w[u,v,x,y]) c_J.
    fn add_sigma_kbody(
        &self,
        one_body: ArrayView2<f64>,
        two_body: ArrayView4<f64>,
        sigma: &mut Array1<f64>,
    );
}

/// Dense realization of [`ActiveSpaceSolver`] over explicit coupling
/// tensors. Intended for small active spaces and for exercising the
/// response machinery without a determinant-driven CI code.
pub struct CasTensors {
    /// Active Hamiltonian in the determinant basis.
    pub hamiltonian: Array2<f64>,
    /// One-body couplings <I|E_uv|J>, shape (ndets, ndets, na, na).
    pub cc1: Array4<f64>,
    /// Two-body couplings <I|e_uvxy|J>, shape (ndets, ndets, na, na, na, na).
    pub cc2: Array6<f64>,
    /// Normalized reference CI vector.
    pub reference: Array1<f64>,
}

impl ActiveSpaceSolver for CasTensors {
    fn n_determinants(&self) -> usize {
        self.hamiltonian.nrows()
    }

    fn generalized_rdm1(&self, vector: ArrayView1<f64>) -> Array2<f64> {
        let ket: Array2<f64> = contract2("i,j,ijuv->uv", &[&self.reference, &vector, &self.cc1]);
        let bra: Array2<f64> = contract2("i,j,jiuv->uv", &[&self.reference, &vector, &self.cc1]);
        ket + bra
    }

    fn generalized_rdm2(&self, vector: ArrayView1<f64>) -> Array4<f64> {
        let ket: Array4<f64> =
            contract4("i,j,ijuvxy->uvxy", &[&self.reference, &vector, &self.cc2]);
        let bra: Array4<f64> =
            contract4("i,j,jiuvxy->uvxy", &[&self.reference, &vector, &self.cc2]);
        ket + bra
    }

    fn generalized_sigma(&self, vector: ArrayView1<f64>) -> Array1<f64> {
        self.hamiltonian.dot(&vector)
    }

    fn add_sigma_kbody(
        &self,
        one_body: ArrayView2<f64>,
        two_body: ArrayView4<f64>,
        sigma: &mut Array1<f64>,
    ) {
        *sigma += &contract1("ijuv,uv,j->i", &[&self.cc1, &one_body, &self.reference]);
        sigma.scaled_add(
            0.25,
            &contract1(
                "ijuvxy,uvxy,j->i",
                &[&self.cc2, &two_body, &self.reference],
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_solver() -> CasTensors {
        let nd = 2;
        let na = 2;
        let hamiltonian: Array2<f64> = array![[-1.0, 0.2], [0.2, -0.5]];
        let cc1: Array4<f64> =
            Array4::from_shape_fn((nd, nd, na, na), |(i, j, u, v)| {
                ((i + 2 * j + 3 * u + 5 * v) as f64 * 0.37).sin()
            });
        let cc2: Array6<f64> = Array6::from_shape_fn(
            (nd, nd, na, na, na, na),
            |(i, j, u, v, x, y)| ((i + 2 * j + 3 * u + 5 * v + 7 * x + 11 * y) as f64 * 0.21).cos(),
        );
        let reference: Array1<f64> = array![0.8, -0.6];
        CasTensors {
            hamiltonian,
            cc1,
            cc2,
            reference,
        }
    }

    #[test]
    fn transition_densities_are_linear() {
        let solver = toy_solver();
        let x1: Array1<f64> = array![0.3, -1.1];
        let x2: Array1<f64> = array![2.0, 0.7];
        let combo: Array1<f64> = 2.0 * &x1 - 0.5 * &x2;
        let lhs: Array2<f64> = solver.generalized_rdm1(combo.view());
        let rhs: Array2<f64> =
            2.0 * &solver.generalized_rdm1(x1.view()) - 0.5 * &solver.generalized_rdm1(x2.view());
        assert!(lhs
            .iter()
            .zip(rhs.iter())
            .all(|(a, b)| (a - b).abs() < 1e-12));
    }

    #[test]
    fn sigma_kbody_accumulates() {
        let solver = toy_solver();
        let one: Array2<f64> = array![[1.0, 0.5], [0.5, 2.0]];
        let two: Array4<f64> = Array4::zeros((2, 2, 2, 2));
        let mut sigma: Array1<f64> = Array1::zeros(2);
        solver.add_sigma_kbody(one.view(), two.view(), &mut sigma);
        let mut want: Array1<f64> = Array1::zeros(2);
        for i in 0..2 {
            for j in 0..2 {
                for u in 0..2 {
                    for v in 0..2 {
                        want[i] +=
                            solver.cc1[[i, j, u, v]] * one[[u, v]] * solver.reference[j];
                    }
                }
            }
        }
        assert!(sigma
            .iter()
            .zip(want.iter())
            .all(|(a, b)| (a - b).abs() < 1e-12));
    }
}
