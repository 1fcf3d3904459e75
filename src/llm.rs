//! Language-model clients.
//!
//! The pipeline only needs single-shot, stateless text completion, exposed
//! through [`LanguageModel`]. Two chat-completion backends are provided:
//! OpenAI-compatible (`POST {base}/chat/completions`) and Ollama
//! (`POST {base}/api/chat`, non-streaming).

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{RagError, Stage};

/// Single-shot text completion.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Run one model call for `stage`, classifying failures and timeouts.
pub async fn complete_stage(
    model: &dyn LanguageModel,
    stage: Stage,
    prompt: &str,
    timeout: Option<Duration>,
) -> std::result::Result<String, RagError> {
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, model.complete(prompt))
            .await
            .map_err(|_| RagError::Timeout {
                stage,
                secs: limit.as_secs(),
            })?,
        None => model.complete(prompt).await,
    };
    result.map_err(|e| RagError::model(stage, format!("{:#}", e)))
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

impl Message {
    fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: Message,
}

/// Chat-completions client for OpenAI and compatible gateways.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAiModel {
    model: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY is not set. Check your environment."))?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.model.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let req = OpenAiChatRequest {
            model: &self.model,
            messages: vec![Message::user(prompt)],
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("Failed to call OpenAI chat API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("OpenAI chat API returned {status}: {body}");
        }

        let body: OpenAiChatResponse = resp.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("OpenAI chat API returned no choices"))
    }
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Message,
}

pub struct OllamaModel {
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OllamaModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.model.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let req = OllamaChatRequest {
            model: &self.model,
            messages: vec![Message::user(prompt)],
            stream: false,
        };

        let resp = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&req)
            .send()
            .await
            .with_context(|| format!("Failed to call Ollama chat API (is Ollama running at {}?)", self.base_url))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("Ollama chat API returned {status}: {body}");
        }

        let body: OllamaChatResponse = resp.json().await?;
        Ok(body.message.content)
    }
}

/// Create the [`LanguageModel`] selected by `llm.provider`.
pub fn create_model(config: &LlmConfig) -> Result<Box<dyn LanguageModel>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiModel::new(config)?)),
        "ollama" => Ok(Box::new(OllamaModel::new(config)?)),
        other => bail!("Unknown LLM provider: {other}"),
    }
}
