//! TOML configuration.
//!
//! One file configures the corpus location, the embedding and language-model
//! providers, the retrieval loop budgets, history trimming and the HTTP server.
//! Every tunable has a default so a minimal file only needs `[corpus]` and
//! `[server]`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// Raw little-endian `f32` vectors, one row of `embedding.dims` per chunk.
    pub index_path: PathBuf,
    /// JSON array of chunk metadata, aligned with the index rows.
    pub metadata_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            timeout_secs: default_embedding_timeout(),
        }
    }
}

fn default_embedding_provider() -> String {
    "disabled".to_string()
}
fn default_embedding_timeout() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Overrides the provider's default endpoint (OpenAI-compatible gateways, remote Ollama).
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            base_url: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_llm_model() -> String {
    "gpt-5-mini".to_string()
}
fn default_llm_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Documents fetched per loop iteration.
    #[serde(default = "default_step_k")]
    pub step_k: usize,
    #[serde(default = "default_max_loops")]
    pub max_loops: usize,
    /// Budget for the context shown to the sufficiency and refinement calls.
    #[serde(default = "default_partial_context_chars")]
    pub partial_context_chars: usize,
    /// Budget for the context handed to the answer generator.
    #[serde(default = "default_final_context_chars")]
    pub final_context_chars: usize,
    /// Default hit count for `pokepedia search`.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            step_k: default_step_k(),
            max_loops: default_max_loops(),
            partial_context_chars: default_partial_context_chars(),
            final_context_chars: default_final_context_chars(),
            search_limit: default_search_limit(),
        }
    }
}

fn default_step_k() -> usize {
    8
}
fn default_max_loops() -> usize {
    4
}
fn default_partial_context_chars() -> usize {
    3200
}
fn default_final_context_chars() -> usize {
    4000
}
fn default_search_limit() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    #[serde(default = "default_history_chars")]
    pub max_chars: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            max_chars: default_history_chars(),
        }
    }
}

fn default_max_turns() -> usize {
    8
}
fn default_history_chars() -> usize {
    3200
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// CORS origins. Empty allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u32,
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_secs: i64,
}

fn default_rate_limit_requests() -> u32 {
    10
}
fn default_rate_limit_window() -> i64 {
    60
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate retrieval
    if config.retrieval.max_loops < 1 {
        anyhow::bail!("retrieval.max_loops must be >= 1");
    }
    if config.retrieval.step_k < 1 {
        anyhow::bail!("retrieval.step_k must be >= 1");
    }
    if config.retrieval.partial_context_chars > config.retrieval.final_context_chars {
        anyhow::bail!("retrieval.partial_context_chars must be <= retrieval.final_context_chars");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "local" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }
    if config.embedding.is_enabled() && config.embedding.provider != "local" {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    // Validate llm
    match config.llm.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!("Unknown llm provider: '{}'. Must be openai or ollama.", other),
    }

    // Validate server
    if config.server.rate_limit_requests < 1 {
        anyhow::bail!("server.rate_limit_requests must be >= 1");
    }
    if config.server.rate_limit_window_secs < 1 {
        anyhow::bail!("server.rate_limit_window_secs must be >= 1");
    }

    Ok(config)
}
