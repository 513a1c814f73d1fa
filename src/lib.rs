pub mod active_space;
pub mod defaults;
pub mod integrals;
pub mod response;
pub mod solvers;
pub mod utils;
