//! Thin wrappers around [`einsum`] that fix the output dimensionality.
//! The contraction strings are static and validated by the tests, so a
//! failure here is a programmer error and panics.

use ndarray::prelude::*;
use ndarray_einsum_beta::{einsum, ArrayLike};

/// Full contraction to a scalar; any remaining output axes of `subscripts`
/// are summed over.
pub fn contract0(subscripts: &str, ops: &[&dyn ArrayLike<f64>]) -> f64 {
    einsum(subscripts, ops).unwrap().sum()
}

pub fn contract1(subscripts: &str, ops: &[&dyn ArrayLike<f64>]) -> Array1<f64> {
    einsum(subscripts, ops)
        .unwrap()
        .into_dimensionality::<Ix1>()
        .unwrap()
}

pub fn contract2(subscripts: &str, ops: &[&dyn ArrayLike<f64>]) -> Array2<f64> {
    einsum(subscripts, ops)
        .unwrap()
        .into_dimensionality::<Ix2>()
        .unwrap()
}

pub fn contract4(subscripts: &str, ops: &[&dyn ArrayLike<f64>]) -> Array4<f64> {
    einsum(subscripts, ops)
        .unwrap()
        .into_dimensionality::<Ix4>()
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contractions_match_explicit_loops() {
        let a: Array2<f64> = array![[1.0, 2.0], [3.0, 4.0]];
        let b: Array2<f64> = array![[0.5, -1.0], [2.0, 0.25]];
        let ab: Array2<f64> = contract2("ij,jk->ik", &[&a, &b]);
        assert!((ab[[0, 0]] - 4.5).abs() < 1e-12);
        assert!((ab[[1, 1]] - (-2.0)).abs() < 1e-12);
        let tr: f64 = contract0("ij,ji->i", &[&a, &b]);
        assert!((tr - 2.5).abs() < 1e-12);
    }
}
