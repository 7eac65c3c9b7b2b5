//! Retry Loop
//!
//! Bounded generate → validate → execute cycle. Each failure is fed back into
//! the next prompt; only the most recent failure is remembered.

use crate::execution_loop::outcome::{Diagnostic, ExecutionOutcome, LoopResult, ValidationOutcome};
use crate::llm::GenerationModel;
use crate::prompts::{Feedback, GenerationRequest, PromptTemplate};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Runs one extracted artifact against whatever it targets
#[async_trait]
pub trait ArtifactExecutor: Send + Sync {
    type Output: Send;

    async fn execute(&self, artifact: &str) -> ExecutionOutcome<Self::Output>;
}

/// Cheap pre-execution check; an invalid artifact never reaches the executor
pub trait ArtifactValidator: Send + Sync {
    fn validate(&self, artifact: &str) -> ValidationOutcome;
}

/// The single failure the loop remembers between attempts
struct LastFailure {
    artifact: Option<String>,
    diagnostic: Diagnostic,
}

impl LastFailure {
    /// Feedback needs both halves; a failure without an artifact yields none
    fn feedback(&self) -> Option<Feedback> {
        self.artifact.as_ref().map(|artifact| Feedback {
            artifact: artifact.clone(),
            diagnostic: self.diagnostic.clone(),
        })
    }
}

enum AttemptOutcome<O> {
    Succeeded { artifact: String, result: O },
    Failed { artifact: Option<String>, diagnostic: Diagnostic },
}

/// Generic self-correcting generation loop
pub struct RetryLoop<T, E> {
    label: &'static str,
    model: Arc<dyn GenerationModel>,
    template: T,
    validator: Option<Box<dyn ArtifactValidator>>,
    executor: E,
    max_attempts: u32,
}

impl<T, E> RetryLoop<T, E>
where
    T: PromptTemplate,
    E: ArtifactExecutor,
{
    pub fn new(label: &'static str, model: Arc<dyn GenerationModel>, template: T, executor: E) -> Self {
        Self {
            label,
            model,
            template,
            validator: None,
            executor,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_validator(mut self, validator: impl ArtifactValidator + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Attempt budget; clamped to at least one attempt
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Drive attempts until one succeeds or the budget is spent
    pub async fn run(&self, question: &str, context: &str) -> LoopResult<E::Output> {
        let mut attempt_index: u32 = 0;
        let mut last: Option<LastFailure> = None;

        loop {
            let feedback = last.as_ref().and_then(LastFailure::feedback);
            let request = GenerationRequest {
                question,
                context,
                feedback: feedback.as_ref(),
                attempt_index,
            };

            info!(
                "[{}] Generation attempt {} of {}",
                self.label,
                attempt_index + 1,
                self.max_attempts
            );

            match self.attempt(&request).await {
                AttemptOutcome::Succeeded { artifact, result } => {
                    info!("[{}] Succeeded on attempt {}", self.label, attempt_index + 1);
                    return LoopResult::Resolved {
                        artifact,
                        result,
                        attempts_used: attempt_index + 1,
                    };
                }
                AttemptOutcome::Failed { artifact, diagnostic } => {
                    attempt_index += 1;
                    warn!(
                        kind = %diagnostic.kind,
                        "[{}] Attempt {} failed: {}",
                        self.label,
                        attempt_index,
                        diagnostic.message
                    );

                    if attempt_index >= self.max_attempts {
                        warn!("[{}] Attempt budget of {} exhausted", self.label, self.max_attempts);
                        return LoopResult::Exhausted {
                            last_artifact: artifact,
                            last_error: diagnostic,
                            attempts_used: attempt_index,
                        };
                    }

                    last = Some(LastFailure { artifact, diagnostic });
                }
            }
        }
    }

    async fn attempt(&self, request: &GenerationRequest<'_>) -> AttemptOutcome<E::Output> {
        let prompt = self.template.render(request);
        debug!("[{}] Prompt:\n{}", self.label, prompt);

        let raw = match self.model.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                return AttemptOutcome::Failed {
                    artifact: None,
                    diagnostic: Diagnostic::generation(e),
                }
            }
        };
        debug!("[{}] Raw response:\n{}", self.label, raw);

        let artifact = self.template.extract(&raw);

        if let Some(validator) = &self.validator {
            let outcome = validator.validate(&artifact);
            if !outcome.valid {
                let reason = outcome
                    .diagnostic
                    .unwrap_or_else(|| "rejected by validator".to_string());
                return AttemptOutcome::Failed {
                    artifact: Some(artifact),
                    diagnostic: Diagnostic::syntax(reason),
                };
            }
        }

        match self.executor.execute(&artifact).await {
            ExecutionOutcome::Success(result) => AttemptOutcome::Succeeded { artifact, result },
            ExecutionOutcome::Failure(message) => AttemptOutcome::Failed {
                artifact: Some(artifact),
                diagnostic: Diagnostic::execution(message),
            },
        }
    }
}
