pub mod driver;
pub mod layout;
pub mod operator;
pub mod preconditioner;

pub use driver::{ZVectorResponse, ZVectorSolver};
pub use layout::{antisymmetrize, ResponseLayout, ORB_BLOCKS};
pub use operator::ResponseOperator;
pub use preconditioner::build_preconditioner;
