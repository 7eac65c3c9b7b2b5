pub mod config;
pub mod copilot;
pub mod db;
pub mod error;
pub mod execution;
pub mod execution_loop;
pub mod extract;
pub mod llm;
pub mod prompts;
pub mod report;
pub mod services;
pub mod validate;

pub use copilot::{Copilot, CopilotReport};
pub use error::{CopilotError, Result};
pub use execution_loop::{LoopResult, RetryLoop};
