use crate::utils::contract4;
use ndarray::prelude::*;
use std::ops::Range;

/// Correlated orbital spaces of the DSRG-MRPT2 reference. Frozen orbitals
/// are assumed to be removed from all tensors beforehand.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Space {
    Core,
    Active,
    Virtual,
}

/// Sizes of the correlated orbital spaces, ordered core < active < virtual
/// within the MO range.
#[derive(Copy, Clone, Debug)]
pub struct OrbitalSpaces {
    pub n_core: usize,
    pub n_actv: usize,
    pub n_virt: usize,
}

impl OrbitalSpaces {
    pub fn n_orb(&self) -> usize {
        self.n_core + self.n_actv + self.n_virt
    }

    pub fn len(&self, space: Space) -> usize {
        match space {
            Space::Core => self.n_core,
            Space::Active => self.n_actv,
            Space::Virtual => self.n_virt,
        }
    }

    /// Index range of a space within the full MO range.
    pub fn range(&self, space: Space) -> Range<usize> {
        match space {
            Space::Core => 0..self.n_core,
            Space::Active => self.n_core..(self.n_core + self.n_actv),
            Space::Virtual => (self.n_core + self.n_actv)..self.n_orb(),
        }
    }
}

/// Two-electron repulsion integrals in chemist notation (pq|rs), either as
/// a conventional four-index tensor over the full MO range or as the
/// three-index density-fitted factors B[g,p,q] with
/// (pq|rs) = sum_g B[g,p,q] B[g,r,s].
pub enum TwoElectronRepr {
    Conventional(Array4<f64>),
    DensityFitted(Array3<f64>),
}

/// Frozen molecular-orbital quantities entering the response equations.
///
/// `v_core` is the closed-shell field sum_m (pm|qm) dressed quantity that
/// accompanies the bare core Hamiltonian, `eps` the semicanonical orbital
/// energies. `restricted` asserts that alpha and beta orbitals coincide;
/// the solver refuses unrestricted inputs.
pub struct MoIntegrals {
    pub spaces: OrbitalSpaces,
    pub hcore: Array2<f64>,
    pub fock: Array2<f64>,
    pub v_core: Array2<f64>,
    pub eps: Array1<f64>,
    pub tei: TwoElectronRepr,
    pub restricted: bool,
}

impl MoIntegrals {
    /// Core-Hamiltonian block view.
    pub fn h(&self, p: Space, q: Space) -> ArrayView2<f64> {
        self.hcore
            .slice(s![self.spaces.range(p), self.spaces.range(q)])
    }

    /// Fock-matrix block view.
    pub fn f(&self, p: Space, q: Space) -> ArrayView2<f64> {
        self.fock
            .slice(s![self.spaces.range(p), self.spaces.range(q)])
    }

    /// Closed-shell field block view.
    pub fn vc(&self, p: Space, q: Space) -> ArrayView2<f64> {
        self.v_core
            .slice(s![self.spaces.range(p), self.spaces.range(q)])
    }

    /// Orbital-energy difference table delta[i,j] = eps_p[i] - eps_q[j].
    pub fn delta(&self, p: Space, q: Space) -> Array2<f64> {
        let ep = self.eps.slice(s![self.spaces.range(p)]);
        let eq = self.eps.slice(s![self.spaces.range(q)]);
        Array2::from_shape_fn((ep.len(), eq.len()), |(i, j)| ep[i] - eq[j])
    }

    /// Materialize the (pq|rs) block over four orbital spaces. Both
    /// integral representations yield the identical tensor.
    pub fn eri(&self, p: Space, q: Space, r: Space, s: Space) -> Array4<f64> {
        let (rp, rq) = (self.spaces.range(p), self.spaces.range(q));
        let (rr, rs) = (self.spaces.range(r), self.spaces.range(s));
        match &self.tei {
            TwoElectronRepr::Conventional(v) => v.slice(s![rp, rq, rr, rs]).to_owned(),
            TwoElectronRepr::DensityFitted(b) => {
                let b_pq = b.slice(s![.., rp, rq]);
                let b_rs = b.slice(s![.., rr, rs]);
                contract4("gpq,grs->pqrs", &[&b_pq, &b_rs])
            }
        }
    }

    /// Doubly occupied core trace 2 tr(H_mm) + tr(V_mm). Enters the CI-CI
    /// coupling and the CI preconditioner with the same value.
    pub fn core_trace(&self) -> f64 {
        2.0 * self.h(Space::Core, Space::Core).diag().sum()
            + self.vc(Space::Core, Space::Core).diag().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_ranges_partition_the_orbital_range() {
        let spaces = OrbitalSpaces {
            n_core: 2,
            n_actv: 3,
            n_virt: 4,
        };
        assert_eq!(spaces.n_orb(), 9);
        assert_eq!(spaces.range(Space::Core), 0..2);
        assert_eq!(spaces.range(Space::Active), 2..5);
        assert_eq!(spaces.range(Space::Virtual), 5..9);
        assert_eq!(spaces.len(Space::Active), 3);
    }
}
