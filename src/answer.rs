//! Final answer generation.

use std::time::Duration;

use crate::error::Stage;
use crate::llm::{complete_stage, LanguageModel};
use crate::prompts;

/// Reply used when the answer call fails.
pub const ANSWER_FALLBACK: &str =
    "Sorry, I had an internal error while generating this answer. Please try again shortly.";

/// Answer `query` from `context` only. Never fails; model errors yield [`ANSWER_FALLBACK`].
pub async fn generate(
    model: &dyn LanguageModel,
    context: &str,
    query: &str,
    history: &str,
    timeout: Option<Duration>,
) -> String {
    let prompt = prompts::answer(context, query, history);

    match complete_stage(model, Stage::Answer, &prompt, timeout).await {
        Ok(reply) => {
            tracing::info!(chars = reply.len(), "generated reply");
            reply.trim().to_string()
        }
        Err(e) => {
            tracing::error!(error = %e, "answer generation failed");
            ANSWER_FALLBACK.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Scripted(Option<&'static str>);

    #[async_trait]
    impl LanguageModel for Scripted {
        fn model_name(&self) -> &str {
            "scripted"
        }
        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            assert!(prompt.contains("<question>\nWhat is Tackle's PP?\n</question>"));
            self.0
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_returns_model_reply() {
        let reply = generate(
            &Scripted(Some("Tackle has 35 PP.\n")),
            "[Tackle — stats]\nPP 35\n",
            "What is Tackle's PP?",
            "",
            None,
        )
        .await;
        assert_eq!(reply, "Tackle has 35 PP.");
    }

    #[tokio::test]
    async fn test_failure_returns_fallback() {
        let reply = generate(&Scripted(None), "", "What is Tackle's PP?", "", None).await;
        assert_eq!(reply, ANSWER_FALLBACK);
    }
}
