//! Standalone-question rewriting.

use std::time::Duration;

use crate::error::Stage;
use crate::llm::{complete_stage, LanguageModel};
use crate::prompts;

/// Rephrase `query` so it stands on its own without `conversation`, the
/// already trimmed and rendered history.
///
/// Never fails: a failed or empty model response yields `query` unchanged.
pub async fn rewrite(
    model: &dyn LanguageModel,
    query: &str,
    conversation: &str,
    timeout: Option<Duration>,
) -> String {
    let prompt = prompts::rewrite(conversation, query);

    match complete_stage(model, Stage::Rewrite, &prompt, timeout).await {
        Ok(text) => {
            let rewritten = text.trim();
            if rewritten.is_empty() {
                tracing::warn!("rewrite returned empty text; using original query");
                return query.to_string();
            }
            tracing::info!(rewritten, "rewrote query for retrieval");
            rewritten.to_string()
        }
        Err(e) => {
            tracing::warn!(error = %e, "query rewrite failed; using original query");
            query.to_string()
        }
    }
}
