//! Error taxonomy for the retrieval pipeline.
//!
//! Collaborators (embedders, indexes, language models) report failures as
//! `anyhow::Error`; the pipeline classifies them into [`RagError`] at the call
//! site so the service facade can decide which failures are recoverable.

use std::fmt;
use thiserror::Error;

/// Which model call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Rewrite,
    Sufficiency,
    Refinement,
    Answer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Rewrite => "rewrite",
            Stage::Sufficiency => "sufficiency",
            Stage::Refinement => "refinement",
            Stage::Answer => "answer",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum RagError {
    /// Embedding, vector search or document lookup failed.
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// A language-model call failed or returned an unusable response.
    #[error("{stage} model call failed: {message}")]
    Model { stage: Stage, message: String },

    /// A language-model call did not complete in time.
    #[error("{stage} model call timed out after {secs}s")]
    Timeout { stage: Stage, secs: u64 },

    /// The corpus files could not be loaded or are inconsistent.
    #[error("corpus error: {0}")]
    Corpus(String),
}

impl RagError {
    pub fn model(stage: Stage, err: impl fmt::Display) -> Self {
        RagError::Model {
            stage,
            message: err.to_string(),
        }
    }

    /// Stage of the failed model call, if this is a model failure.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RagError::Model { stage, .. } | RagError::Timeout { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
