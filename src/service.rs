//! Chat service facade.
//!
//! Sequences one request through the pipeline:
//!
//! ```text
//! history ─▶ trim/format ─┐
//! message ─▶ rewrite ─────┴─▶ recursive retrieval ─▶ final context ─▶ answer ─▶ reply
//! ```
//!
//! The service always produces a reply string. Retrieval-phase failures turn
//! into [`RETRIEVAL_FALLBACK`]; answer failures into
//! [`ANSWER_FALLBACK`](crate::answer::ANSWER_FALLBACK).

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use crate::answer;
use crate::config::{Config, HistoryConfig, RetrievalConfig};
use crate::context;
use crate::embedding::{create_embedder, Embedder};
use crate::history;
use crate::index::{Corpus, DocumentStore, FlatL2Index, VectorIndex};
use crate::llm::{create_model, LanguageModel};
use crate::models::ConversationTurn;
use crate::rcr::{LoopSettings, RecursiveRetriever, RetrievalOutcome};
use crate::retriever::DenseRetriever;
use crate::rewrite;

/// Reply used when the retrieval phase fails.
pub const RETRIEVAL_FALLBACK: &str =
    "Sorry, I ran into a problem looking up the Pokémon data. Please try again in a moment.";

/// Full result of one request, for callers that want diagnostics.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub reply: String,
    pub rewritten_query: String,
    /// `None` when retrieval failed and the fallback reply was returned.
    pub retrieval: Option<RetrievalOutcome>,
}

/// Shared, read-only pipeline. Cheap to clone; one instance serves all requests.
#[derive(Clone)]
pub struct ChatService {
    retriever: DenseRetriever,
    model: Arc<dyn LanguageModel>,
    retrieval: RetrievalConfig,
    history: HistoryConfig,
    model_timeout: Option<Duration>,
}

impl ChatService {
    pub fn new(
        retriever: DenseRetriever,
        model: Arc<dyn LanguageModel>,
        retrieval: RetrievalConfig,
        history: HistoryConfig,
    ) -> Self {
        Self {
            retriever,
            model,
            retrieval,
            history,
            model_timeout: None,
        }
    }

    /// Bound every model call. Expiry counts as a failure of that call.
    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = Some(timeout);
        self
    }

    /// Load the corpus and construct providers from configuration.
    ///
    /// Called once at process start; everything loaded here is immutable.
    pub fn load(config: &Config) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = Arc::from(create_embedder(&config.embedding)?);
        if embedder.dims() == 0 {
            anyhow::bail!("an embedding provider is required to serve questions");
        }
        let embedder_name = embedder.model_name().to_string();

        let index = FlatL2Index::load(&config.corpus.index_path, embedder.dims())?;
        let corpus = Corpus::load(&config.corpus.metadata_path)?;
        if index.len() != corpus.len() {
            tracing::warn!(
                vectors = index.len(),
                chunks = corpus.len(),
                "vector index and metadata sizes differ"
            );
        }

        let index: Arc<dyn VectorIndex> = Arc::new(index);
        let corpus: Arc<dyn DocumentStore> = Arc::new(corpus);
        let retriever = DenseRetriever::new(embedder, index, corpus);
        let model: Arc<dyn LanguageModel> = Arc::from(create_model(&config.llm)?);

        tracing::info!(
            embedder = %embedder_name,
            llm = model.model_name(),
            "chat service ready"
        );

        Ok(Self::new(
            retriever,
            model,
            config.retrieval.clone(),
            config.history.clone(),
        )
        .with_model_timeout(Duration::from_secs(config.llm.timeout_secs)))
    }

    /// Answer `message` given prior `history`.
    pub async fn chat(&self, message: &str, history: &[ConversationTurn]) -> String {
        self.chat_detailed(message, history).await.reply
    }

    /// Like [`chat`](Self::chat), also returning the rewritten query and
    /// the retrieval outcome.
    pub async fn chat_detailed(&self, message: &str, history: &[ConversationTurn]) -> ChatReply {
        tracing::info!(history = history.len(), "handling chat request");

        let trimmed = history::trim(history, self.history.max_turns, self.history.max_chars);
        let convo = history::format(&trimmed, self.history.max_chars);

        let rewritten_query =
            rewrite::rewrite(self.model.as_ref(), message, &convo, self.model_timeout).await;

        let rcr = RecursiveRetriever::new(
            &self.retriever,
            self.model.as_ref(),
            LoopSettings::from(&self.retrieval),
        )
        .with_timeout(self.model_timeout);

        let outcome = match rcr.run(message, &rewritten_query).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    stage = ?e.stage(),
                    query = %rewritten_query,
                    "retrieval failed"
                );
                return ChatReply {
                    reply: RETRIEVAL_FALLBACK.to_string(),
                    rewritten_query,
                    retrieval: None,
                };
            }
        };

        let context = context::build(outcome.evidence.docs(), self.retrieval.final_context_chars);
        tracing::debug!(context = %context, conversation = %convo, "answer inputs");

        let reply = answer::generate(
            self.model.as_ref(),
            &context,
            message,
            &convo,
            self.model_timeout,
        )
        .await;

        ChatReply {
            reply,
            rewritten_query,
            retrieval: Some(outcome),
        }
    }
}
