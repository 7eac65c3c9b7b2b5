use crate::error::{CopilotError, Result};
use crate::llm::openai::api_error_message;
use crate::llm::GenerationModel;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Client for the Gemini `generateContent` API
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

impl GeminiClient {
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

    fn endpoint(&self) -> Result<reqwest::Url> {
        let model_path = if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        };
        let mut url = reqwest::Url::parse(&format!("{}/{}:generateContent", self.base_url, model_path))
            .map_err(|e| CopilotError::Config(format!("Invalid Gemini endpoint URL: {}", e)))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[async_trait]
impl GenerationModel for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "calling generateContent");

        let body = serde_json::json!({
            "contents": [
                {"role": "user", "parts": [{"text": prompt}]}
            ],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_tokens
            }
        });

        let response = self
            .http
            .post(self.endpoint()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| CopilotError::Llm(format!("Gemini API call failed: {}", e)))?;

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|e| CopilotError::Llm(format!("Failed to read Gemini response: {}", e)))?;

        if !status.is_success() {
            return Err(CopilotError::Llm(format!(
                "Gemini API error ({}): {}",
                status,
                api_error_message(&payload)
            )));
        }

        let parsed: GeminiResponse = serde_json::from_str(&payload)
            .map_err(|e| CopilotError::Llm(format!("Failed to parse Gemini response: {}", e)))?;

        candidate_text(&parsed)
    }
}

fn candidate_text(response: &GeminiResponse) -> Result<String> {
    let first = response.candidates.first();
    let text: String = first
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let finish_reason = first
            .and_then(|c| c.finish_reason.clone())
            .unwrap_or_else(|| "N/A".to_string());
        let feedback = response
            .prompt_feedback
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        warn!(%finish_reason, %feedback, "Gemini response was empty or blocked");
        return Err(CopilotError::Llm(format!(
            "Failed to get response from Gemini. Finish reason: {}",
            finish_reason
        )));
    }

    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_text_joins_parts() {
        let parsed: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"SELECT "},{"text":"1"}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(candidate_text(&parsed).unwrap(), "SELECT 1");
    }

    #[test]
    fn test_blocked_response_reports_finish_reason() {
        let parsed: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"finishReason":"SAFETY"}],"promptFeedback":{"blockReason":"OTHER"}}"#,
        )
        .unwrap();
        let err = candidate_text(&parsed).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));

        let empty: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(candidate_text(&empty).unwrap_err().to_string().contains("N/A"));
    }

    #[test]
    fn test_endpoint_carries_model_and_key() {
        let client = GeminiClient::new(
            "abc".to_string(),
            "gemini-1.5-flash".to_string(),
            "https://generativelanguage.googleapis.com/v1beta/".to_string(),
        )
        .unwrap();
        let url = client.endpoint().unwrap();
        assert_eq!(url.path(), "/v1beta/models/gemini-1.5-flash:generateContent");
        assert_eq!(url.query(), Some("key=abc"));
    }
}
