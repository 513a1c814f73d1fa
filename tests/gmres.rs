use ndarray::prelude::*;
use rdsrg::solvers::{Gmres, GmresConfig, GmresError, GmresEngine};

fn max_abs_diff(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    (a - b).iter().fold(0.0f64, |m, x| m.max(x.abs()))
}

#[test]
fn identity_system_solves_immediately() {
    let a: Array2<f64> = Array2::eye(4);
    let b: Array1<f64> = array![1.0, 2.0, 3.0, 4.0];
    let precond: Array1<f64> = Array1::ones(4);
    let result: Gmres =
        Gmres::solve(&a, b.clone(), precond.view(), &GmresConfig::default()).unwrap();
    assert!(result.iterations <= 2);
    assert!(max_abs_diff(&result.x, &b) < 1e-10);
}

#[test]
fn diagonal_system_with_jacobi_scaling() {
    let a: Array2<f64> = Array2::from_diag(&array![2.0, 3.0]);
    let b: Array1<f64> = array![4.0, 9.0];
    let precond: Array1<f64> = array![0.5, 1.0 / 3.0];
    let result: Gmres =
        Gmres::solve(&a, b, precond.view(), &GmresConfig::default()).unwrap();
    assert!(max_abs_diff(&result.x, &array![2.0, 3.0]) < 1e-10);
}

#[test]
fn well_conditioned_system_converges() {
    // diagonally dominant nonsymmetric test matrix
    let dim: usize = 6;
    let a: Array2<f64> = Array2::from_shape_fn((dim, dim), |(i, j)| {
        let base: f64 = 1.0 / (1.0 + (i as f64 - 2.0 * j as f64).powi(2));
        if i == j {
            5.0 + base
        } else {
            base
        }
    });
    let b: Array1<f64> = Array1::from_shape_fn(dim, |i| (i + 1) as f64);
    let precond: Array1<f64> = a.diag().mapv(|v| 1.0 / v);
    let result: Gmres =
        Gmres::solve(&a, b.clone(), precond.view(), &GmresConfig::default()).unwrap();

    let residual: Array1<f64> = a.apply(result.x.view()) - &b;
    let rel: f64 = residual.dot(&residual).sqrt() / b.dot(&b).sqrt();
    assert!(rel < 1e-7, "relative residual too large: {}", rel);

    // the least-squares residual cannot grow with the subspace
    for pair in result.residual_norms.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-12);
    }
}

#[test]
fn vanishing_right_hand_side_yields_the_zero_vector() {
    let a: Array2<f64> = Array2::from_diag(&array![2.0, 3.0, 4.0]);
    let b: Array1<f64> = Array1::zeros(3);
    let precond: Array1<f64> = array![0.5, 1.0 / 3.0, 0.25];
    let result: Gmres =
        Gmres::solve(&a, b, precond.view(), &GmresConfig::default()).unwrap();
    assert_eq!(result.iterations, 0);
    assert!(result.x.iter().all(|&v| v == 0.0));
}

#[test]
fn iteration_budget_exhaustion_is_fatal() {
    let a: Array2<f64> = Array2::from_diag(&array![1.0, 2.0, 3.0, 4.0, 5.0]);
    let b: Array1<f64> = Array1::ones(5);
    let precond: Array1<f64> = Array1::ones(5);
    let config = GmresConfig {
        max_iter: 3,
        conv: 1e-9,
    };
    let result = Gmres::solve(&a, b, precond.view(), &config);
    assert_eq!(
        result.err(),
        Some(GmresError::NotConverged { iterations: 3 })
    );
}

#[test]
#[should_panic]
fn mismatched_right_hand_side_fails_fast() {
    let a: Array2<f64> = Array2::eye(4);
    let b: Array1<f64> = Array1::ones(3);
    let precond: Array1<f64> = Array1::ones(4);
    let _ = Gmres::solve(&a, b, precond.view(), &GmresConfig::default());
}
