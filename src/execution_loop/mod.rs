pub mod error_classifier;
pub mod outcome;
pub mod retry_loop;

pub use error_classifier::*;
pub use outcome::*;
pub use retry_loop::*;
