pub mod gmres;
pub mod utils;

pub use gmres::{Gmres, GmresConfig, GmresEngine, GmresError};
