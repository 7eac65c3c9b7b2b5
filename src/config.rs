//! Runtime configuration
//!
//! Settings are read from the process environment (a `.env` file is loaded
//! by the binary first). Anything missing or malformed is a fatal
//! configuration error raised before any service is constructed.

use crate::error::{CopilotError, Result};
use crate::execution::code::MissingResultPolicy;
use crate::execution_loop::DEFAULT_MAX_ATTEMPTS;
use std::str::FromStr;
use std::time::Duration;

/// Which generation backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Any OpenAI-compatible chat completions endpoint (hosted or a local model server)
    OpenAi,
    Gemini,
}

impl FromStr for Provider {
    type Err = CopilotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "gemini" => Ok(Provider::Gemini),
            other => Err(CopilotError::Config(format!(
                "Unsupported COPILOT_PROVIDER '{}' (expected 'openai' or 'gemini')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct CopilotConfig {
    pub llm: LlmSettings,
    pub max_attempts: u32,
    pub sample_rows: usize,
    pub request_timeout: Duration,
    pub missing_result: MissingResultPolicy,
}

impl CopilotConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get("COPILOT_PROVIDER") {
            Some(p) => p.parse()?,
            None => Provider::OpenAi,
        };

        let (api_key, model, base_url) = match provider {
            Provider::OpenAi => (
                get("OPENAI_API_KEY").ok_or_else(|| {
                    CopilotError::Config("OPENAI_API_KEY environment variable not set.".to_string())
                })?,
                get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4".to_string()),
                get("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            ),
            Provider::Gemini => (
                get("GEMINI_API_KEY").ok_or_else(|| {
                    CopilotError::Config("GEMINI_API_KEY environment variable not set.".to_string())
                })?,
                get("GEMINI_MODEL").unwrap_or_else(|| "gemini-1.5-flash".to_string()),
                get("GEMINI_BASE_URL")
                    .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            ),
        };

        let max_attempts: u32 = parse_or(&get, "COPILOT_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        if max_attempts == 0 {
            return Err(CopilotError::Config(
                "COPILOT_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let require_result: bool = parse_or(&get, "COPILOT_REQUIRE_RESULT", false)?;

        Ok(Self {
            llm: LlmSettings {
                provider,
                api_key,
                model,
                base_url,
                max_tokens: parse_or(&get, "LLM_MAX_TOKENS", 2048)?,
                temperature: parse_or(&get, "LLM_TEMPERATURE", 0.1)?,
            },
            max_attempts,
            sample_rows: parse_or(&get, "COPILOT_SAMPLE_ROWS", 5)?,
            request_timeout: Duration::from_secs(parse_or(&get, "COPILOT_REQUEST_TIMEOUT_SECS", 300)?),
            missing_result: if require_result {
                MissingResultPolicy::Reject
            } else {
                MissingResultPolicy::Accept
            },
        })
    }
}

/// PostgreSQL connection string: an explicit value wins over `DATABASE_URL`.
///
/// Kept apart from [`CopilotConfig`] so that commands which never call the
/// model can open the database without LLM credentials.
pub fn database_url<F>(explicit: Option<String>, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    explicit
        .filter(|v| !v.trim().is_empty())
        .or_else(|| lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()))
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
            CopilotError::Config(format!("Invalid value '{}' for {}: {}", raw, key, e))
        }),
        None => Ok(default),
    }
}
