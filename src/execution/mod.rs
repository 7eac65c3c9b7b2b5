//! Executors for generated artifacts
//!
//! [`QueryExecutor`] runs SQL against a database backend, [`CodeExecutor`]
//! runs analysis JavaScript against a retrieved result set.

pub mod code;
pub mod query;
pub mod result;

pub use code::{AnalysisOutput, AnalysisValue, CodeExecutor, CodeLimits, MissingResultPolicy};
pub use query::QueryExecutor;
pub use result::render_sample;
