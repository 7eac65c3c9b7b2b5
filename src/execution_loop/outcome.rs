//! Values flowing through one retry loop invocation.

use serde::Serialize;
use std::fmt;

/// Stage at which an attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    /// The generation backend itself failed
    Generation,
    /// The artifact was rejected before execution
    Syntax,
    /// The executor ran the artifact and it failed
    Execution,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Generation => write!(f, "generation"),
            FailureKind::Syntax => write!(f, "syntax"),
            FailureKind::Execution => write!(f, "execution"),
        }
    }
}

/// Why an attempt failed. `message` is what gets fed back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: FailureKind,
    pub message: String,
}

impl Diagnostic {
    pub fn generation(error: impl fmt::Display) -> Self {
        Self {
            kind: FailureKind::Generation,
            message: format!("Generation backend error: {}", error),
        }
    }

    pub fn syntax(diagnostic: impl fmt::Display) -> Self {
        Self {
            kind: FailureKind::Syntax,
            message: format!("Generated query failed syntax validation: {}", diagnostic),
        }
    }

    /// Execution failure; the executor has already shaped the message
    pub fn execution(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Execution,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of the pre-execution syntax gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub diagnostic: Option<String>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            valid: true,
            diagnostic: None,
        }
    }

    pub fn invalid(diagnostic: impl Into<String>) -> Self {
        Self {
            valid: false,
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// What an executor reports for one artifact
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome<T> {
    Success(T),
    Failure(String),
}

/// Terminal outcome of a retry loop; the only value handed to callers
#[derive(Debug, Clone)]
pub enum LoopResult<T> {
    Resolved {
        artifact: String,
        result: T,
        attempts_used: u32,
    },
    Exhausted {
        /// `None` when the final attempt never produced an artifact
        last_artifact: Option<String>,
        last_error: Diagnostic,
        attempts_used: u32,
    },
}

impl<T> LoopResult<T> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, LoopResult::Resolved { .. })
    }

    pub fn attempts_used(&self) -> u32 {
        match self {
            LoopResult::Resolved { attempts_used, .. } | LoopResult::Exhausted { attempts_used, .. } => {
                *attempts_used
            }
        }
    }

    pub fn artifact(&self) -> Option<&str> {
        match self {
            LoopResult::Resolved { artifact, .. } => Some(artifact),
            LoopResult::Exhausted { last_artifact, .. } => last_artifact.as_deref(),
        }
    }

    pub fn result(&self) -> Option<&T> {
        match self {
            LoopResult::Resolved { result, .. } => Some(result),
            LoopResult::Exhausted { .. } => None,
        }
    }

    /// Caller-facing explanation of an exhausted loop, naming the budget and the final error.
    /// `what` describes the artifact, e.g. "a valid SQL query".
    pub fn failure_report(&self, what: &str) -> Option<String> {
        match self {
            LoopResult::Resolved { .. } => None,
            LoopResult::Exhausted {
                last_artifact,
                last_error,
                attempts_used,
            } => {
                let mut report = format!(
                    "Failed to generate and execute {} after {} attempts.",
                    what, attempts_used
                );
                if let Some(artifact) = last_artifact {
                    report.push_str(&format!(" Last generated artifact: '{}'.", artifact));
                }
                report.push_str(&format!(" Last error: {}", last_error));
                Some(report)
            }
        }
    }
}
