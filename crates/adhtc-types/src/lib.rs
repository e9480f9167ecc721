pub mod errors;
pub mod performance;

pub use errors::*;
pub use performance::*;
