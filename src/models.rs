//! Core data models shared across the pipeline.
//!
//! These types describe the conversation supplied by the caller and the corpus
//! chunks that flow from the vector index into prompts.

use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used when rendering history into a prompt.
    pub fn speaker(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One prior message, resubmitted by the caller on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub message: String,
}

impl ConversationTurn {
    pub fn user(message: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            message: message.into(),
        }
    }

    pub fn assistant(message: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            message: message.into(),
        }
    }
}

/// Metadata for one corpus chunk, as stored in the metadata JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusEntry {
    #[serde(default)]
    pub pokemon: Option<String>,
    pub section: String,
    pub text: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CorpusEntry {
    /// `[<pokemon> — <section>]`, or `[<section>]` for chunks not tied to a Pokémon.
    pub fn header(&self) -> String {
        match self.pokemon.as_deref().filter(|p| !p.is_empty()) {
            Some(pokemon) => format!("[{} — {}]", pokemon, self.section),
            None => format!("[{}]", self.section),
        }
    }
}

/// A corpus chunk returned by dense search.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedDocument {
    /// Row of the chunk in the index and metadata file.
    pub idx: usize,
    /// Negated index distance; higher is more similar.
    pub score: f32,
    pub doc: CorpusEntry,
}

/// Rank-ordered hits from one search call, best first.
pub type SearchResult = Vec<RetrievedDocument>;
