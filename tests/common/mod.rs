#![allow(dead_code)]

use async_trait::async_trait;
use polars::prelude::*;
use query_copilot::config::{CopilotConfig, LlmSettings, Provider};
use query_copilot::db::LocalDatabase;
use query_copilot::error::{CopilotError, Result};
use query_copilot::execution::MissingResultPolicy;
use query_copilot::llm::GenerationModel;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Model double that replays canned responses and records every prompt
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        })
    }

    pub fn replies(responses: &[&str]) -> Arc<Self> {
        Self::new(responses.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn slow(delay: Duration, responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(|r| Ok(r.to_string())).collect()),
            prompts: Mutex::new(Vec::new()),
            delay: Some(delay),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CopilotError::Llm("script exhausted".to_string())))
    }
}

pub fn people() -> DataFrame {
    df! {
        "city" => &["Oslo", "Lima", "Oslo", "Pune"],
        "income" => &[52000i64, 31000, 48000, 27000],
    }
    .unwrap()
}

pub fn people_db() -> Arc<LocalDatabase> {
    let mut db = LocalDatabase::new();
    db.register("people", people());
    Arc::new(db)
}

pub fn config(max_attempts: u32) -> CopilotConfig {
    CopilotConfig {
        llm: LlmSettings {
            provider: Provider::OpenAi,
            api_key: "test".to_string(),
            model: "scripted".to_string(),
            base_url: "http://localhost".to_string(),
            max_tokens: 256,
            temperature: 0.0,
        },
        max_attempts,
        sample_rows: 5,
        request_timeout: Duration::from_secs(30),
        missing_result: MissingResultPolicy::Accept,
    }
}
