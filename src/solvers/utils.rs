use log::info;
use std::time::Instant;

pub fn print_gmres_init(max_iter: usize, tolerance: f64) {
    info!("{:^55}", "");
    info!("{: ^55}", "GMRES Solution of the Response Equations");
    info!("{:-^55}", "");
    info!("{: <25} {}", "Maximal number of iterations:", max_iter);
    info!("{: <25} {:e}", "Convergence threshold:", tolerance);
    info!("{:-^55}", "");
    info!(
        "{: <5} {: >18} {: >18}",
        "Iter.", "Residual norm", "|dx|"
    );
}

pub fn print_gmres_iteration(iter: usize, residual: f64, diff: f64) {
    info!("{: >5} {:>18.10e} {:>18.10e}", iter + 1, residual, diff);
}

pub fn print_gmres_end(converged: bool, iterations: usize, timer: Instant) {
    info!("{:-^55}", "");
    if converged {
        info!("GMRES converged after {} iterations.", iterations);
    } else {
        info!("GMRES did NOT converge!");
    }
    info!(
        "{:>30} {:>18.10} s",
        "Time elapsed:",
        timer.elapsed().as_secs_f32()
    );
    info!("{:-^55}", "");
    info!("{:^55}", "");
}
