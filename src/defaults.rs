// Z-VECTOR ITERATION
// stop the GMRES solver after MAX_ITER iterations
pub const MAX_ITER: usize = 500;
// convergence threshold for the change of the solution vector
pub const CONV: f64 = 1.0e-9;
// a subdiagonal Hessenberg element below this value terminates
// the Arnoldi expansion (lucky breakdown)
pub const BREAKDOWN_TOL: f64 = 1.0e-10;
// diagonal entries below this magnitude are not inverted
// in the Jacobi preconditioner
pub const SINGULARITY_TOL: f64 = 1.0e-9;
