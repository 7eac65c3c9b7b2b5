//! Generation capability
//!
//! The retry loops only need "prompt in, text out". Concrete backends live in
//! the submodules and are built once by [`build_model`], then shared as an
//! `Arc<dyn GenerationModel>` across requests.

pub mod gemini;
pub mod openai;

use crate::config::{LlmSettings, Provider};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

/// Stateless text completion service.
///
/// Implementations must tolerate concurrent calls; a backend that cannot is
/// responsible for serializing them itself.
#[async_trait]
pub trait GenerationModel: Send + Sync {
    /// Backend identifier used in logs
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Single initialization point for the generation backend
pub fn build_model(settings: &LlmSettings) -> Result<Arc<dyn GenerationModel>> {
    let model: Arc<dyn GenerationModel> = match settings.provider {
        Provider::OpenAi => Arc::new(OpenAiClient::new(
            settings.api_key.clone(),
            settings.model.clone(),
            settings.base_url.clone(),
        )?
        .with_limits(settings.max_tokens, settings.temperature)),
        Provider::Gemini => Arc::new(GeminiClient::new(
            settings.api_key.clone(),
            settings.model.clone(),
            settings.base_url.clone(),
        )?
        .with_limits(settings.max_tokens, settings.temperature)),
    };
    info!("Generation model configured: {} ({})", model.name(), settings.model);
    Ok(model)
}
