//! Dense retrieval: embed a query, search the index, attach chunk metadata.

use std::sync::Arc;
use std::time::Duration;

use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::index::{DocumentStore, VectorIndex};
use crate::models::{RetrievedDocument, SearchResult};

/// Wraps the embedder, vector index and document store injected at startup.
#[derive(Clone)]
pub struct DenseRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn DocumentStore>,
    timeout: Option<Duration>,
}

impl DenseRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            embedder,
            index,
            store,
            timeout: None,
        }
    }

    /// Bound the embedding call. Expiry is reported as a retrieval failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Return up to `top_k` documents, best first, with `score = -distance`.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<SearchResult> {
        tracing::info!(query, top_k, "dense search");

        let embedding = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.embedder.embed(query))
                .await
                .map_err(|_| {
                    RagError::Retrieval(format!(
                        "embedding timed out after {}s",
                        limit.as_secs()
                    ))
                })?,
            None => self.embedder.embed(query).await,
        }
        .map_err(|e| {
            tracing::error!(error = %e, "query embedding failed");
            RagError::Retrieval(format!("embedding failed: {}", e))
        })?;

        let hits = self.index.search(&embedding, top_k).map_err(|e| {
            tracing::error!(error = %e, "vector search failed");
            RagError::Retrieval(format!("vector search failed: {}", e))
        })?;

        let mut results = Vec::with_capacity(hits.len());
        for (rank, (distance, idx)) in hits.into_iter().enumerate() {
            let doc = self.store.get(idx).ok_or_else(|| {
                RagError::Corpus(format!("index returned id {} with no metadata", idx))
            })?;
            let score = -distance;

            tracing::debug!(
                rank = rank + 1,
                idx,
                score,
                "{} {}{}",
                doc.header(),
                snippet(&doc.text, 300),
                if doc.text.chars().count() > 300 { "... [truncated]" } else { "" }
            );

            results.push(RetrievedDocument {
                idx,
                score,
                doc: doc.clone(),
            });
        }

        Ok(results)
    }
}

/// First `max_chars` characters of `text`, on one line.
pub fn snippet(text: &str, max_chars: usize) -> String {
    text.chars()
        .take(max_chars)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Corpus, FlatL2Index};
    use crate::models::CorpusEntry;
    use async_trait::async_trait;

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn model_name(&self) -> &str {
            "fixed"
        }
        fn dims(&self) -> usize {
            self.0.len()
        }
        async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        fn model_name(&self) -> &str {
            "broken"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            anyhow::bail!("model not loaded")
        }
    }

    struct SlowEmbedder;

    #[async_trait]
    impl Embedder for SlowEmbedder {
        fn model_name(&self) -> &str {
            "slow"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![0.0, 0.0])
        }
    }

    fn entry(text: &str) -> CorpusEntry {
        CorpusEntry {
            pokemon: Some("Bulbasaur".to_string()),
            section: "moves".to_string(),
            text: text.to_string(),
            description: None,
        }
    }

    fn retriever(embedder: Arc<dyn Embedder>, entries: usize) -> DenseRetriever {
        let index = FlatL2Index::new(
            2,
            &[vec![0.0, 0.0], vec![2.0, 0.0], vec![1.0, 0.0]],
        )
        .unwrap();
        let corpus = Corpus::new(
            ["origin", "far", "near"][..entries]
                .iter()
                .map(|t| entry(t))
                .collect(),
        );
        DenseRetriever::new(embedder, Arc::new(index), Arc::new(corpus))
    }

    #[tokio::test]
    async fn test_scores_are_negated_distances() {
        let r = retriever(Arc::new(FixedEmbedder(vec![0.0, 0.0])), 3);
        let results = r.search("tackle", 3).await.unwrap();
        let ids: Vec<usize> = results.iter().map(|d| d.idx).collect();
        assert_eq!(ids, vec![0, 2, 1]);
        assert_eq!(results[0].score, 0.0);
        assert_eq!(results[1].score, -1.0);
        assert_eq!(results[2].score, -4.0);
        assert_eq!(results[1].doc.text, "near");
    }

    #[tokio::test]
    async fn test_respects_top_k() {
        let r = retriever(Arc::new(FixedEmbedder(vec![0.0, 0.0])), 3);
        assert_eq!(r.search("tackle", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let r = retriever(Arc::new(BrokenEmbedder), 3);
        let err = r.search("tackle", 3).await.unwrap_err();
        assert!(matches!(err, RagError::Retrieval(_)));
    }

    #[tokio::test]
    async fn test_missing_metadata_is_an_error() {
        let r = retriever(Arc::new(FixedEmbedder(vec![2.0, 0.0])), 1);
        let err = r.search("tackle", 3).await.unwrap_err();
        assert!(matches!(err, RagError::Corpus(_)));
    }

    #[tokio::test]
    async fn test_embedding_timeout_is_retrieval_error() {
        let r = retriever(Arc::new(SlowEmbedder), 3).with_timeout(Duration::from_millis(20));
        let err = r.search("tackle", 3).await.unwrap_err();
        assert!(matches!(err, RagError::Retrieval(_)));
    }

    #[tokio::test]
    async fn test_embedding_service_error_is_not_retried() {
        use crate::config::EmbeddingConfig;
        use crate::embedding::create_embedder;
        use axum::{http::StatusCode, routing::post, Router};
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let app = Router::new().route(
            "/api/embed",
            post(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (StatusCode::SERVICE_UNAVAILABLE, "loading model".to_string())
                    } else {
                        (StatusCode::OK, r#"{"embeddings":[[0.0,0.0]]}"#.to_string())
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let config = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: Some("all-minilm".to_string()),
            dims: Some(2),
            url: Some(format!("http://{}", addr)),
            ..EmbeddingConfig::default()
        };
        let embedder: Arc<dyn Embedder> = Arc::from(create_embedder(&config).unwrap());
        let r = retriever(embedder, 3);

        let err = r.search("bulbasaur", 3).await.unwrap_err();
        assert!(matches!(err, RagError::Retrieval(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_snippet_flattens_newlines() {
        assert_eq!(snippet("Level 1\nTackle", 9), "Level 1 T");
    }
}
