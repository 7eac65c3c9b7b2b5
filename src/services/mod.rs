//! The two retry loop instantiations: question → SQL, and question + data → analysis code.

pub mod analysis;
pub mod sql;

pub use analysis::AnalysisService;
pub use sql::SqlService;
