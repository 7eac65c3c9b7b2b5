use crate::error::{CopilotError, Result};
use crate::llm::GenerationModel;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const SYSTEM_PROMPT: &str =
    "You are a precise code generator. Follow the output format instructions exactly.";

/// Client for OpenAI-compatible `/chat/completions` endpoints
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| CopilotError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_tokens: 2048,
            temperature: 0.1,
        })
    }

    pub fn with_limits(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    async fn call_llm(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt}
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CopilotError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|e| CopilotError::Llm(format!("Failed to read LLM response: {}", e)))?;

        if !status.is_success() {
            return Err(CopilotError::Llm(format!(
                "OpenAI API error ({}): {}",
                status,
                api_error_message(&payload)
            )));
        }

        let response_json: serde_json::Value = serde_json::from_str(&payload)
            .map_err(|e| CopilotError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| CopilotError::Llm("No content in LLM response".to_string()))?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl GenerationModel for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "calling chat completions");
        self.call_llm(prompt).await
    }
}

/// Pull the human-readable message out of an API error body
pub(crate) fn api_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: Option<ApiError>,
    }
    #[derive(Deserialize)]
    struct ApiError {
        message: Option<String>,
        status: Option<String>,
    }

    match serde_json::from_str::<Envelope>(body) {
        Ok(Envelope {
            error: Some(ApiError { message, status }),
        }) => {
            let message = message.unwrap_or_else(|| "unknown error".to_string());
            match status {
                Some(status) => format!("{} (status={})", message, status),
                None => message,
            }
        }
        _ => body.trim().chars().take(500).collect(),
    }
}
