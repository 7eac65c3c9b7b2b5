use crate::error::Result;
use crate::execution::{render_sample, AnalysisOutput, CodeExecutor, CodeLimits, MissingResultPolicy};
use crate::execution_loop::{LoopResult, RetryLoop, DEFAULT_MAX_ATTEMPTS};
use crate::llm::GenerationModel;
use crate::prompts::AnalysisPrompt;
use polars::prelude::DataFrame;
use std::sync::Arc;
use tracing::info;

/// Wording used in the exhaustion report
pub const ANALYSIS_ARTIFACT: &str = "working analysis code";

pub const DEFAULT_SAMPLE_ROWS: usize = 5;

/// Question + retrieved rows → analysis code → result
///
/// The executor is bound to one result set, so a fresh loop is assembled per call.
pub struct AnalysisService {
    model: Arc<dyn GenerationModel>,
    max_attempts: u32,
    sample_rows: usize,
    policy: MissingResultPolicy,
    limits: CodeLimits,
}

impl AnalysisService {
    pub fn new(model: Arc<dyn GenerationModel>) -> Self {
        Self {
            model,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            policy: MissingResultPolicy::default(),
            limits: CodeLimits::default(),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_sample_rows(mut self, sample_rows: usize) -> Self {
        self.sample_rows = sample_rows;
        self
    }

    pub fn with_policy(mut self, policy: MissingResultPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_limits(mut self, limits: CodeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Fails only if the rows cannot be handed to the interpreter
    pub async fn generate_analysis(
        &self,
        question: &str,
        df: &DataFrame,
    ) -> Result<LoopResult<AnalysisOutput>> {
        info!(
            "Generating analysis over {} rows x {} columns",
            df.height(),
            df.width()
        );

        let executor = CodeExecutor::new(df)?
            .with_policy(self.policy)
            .with_limits(self.limits.clone());
        let retry = RetryLoop::new("analysis", Arc::clone(&self.model), AnalysisPrompt, executor)
            .with_max_attempts(self.max_attempts);

        let context = render_sample(df, self.sample_rows);
        Ok(retry.run(question, &context).await)
    }
}
