//! Shared fakes for the integration tests: a keyword embedder, an in-memory
//! corpus and a language model that answers from a per-stage script.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use pokepedia::embedding::Embedder;
use pokepedia::index::{Corpus, FlatL2Index};
use pokepedia::llm::LanguageModel;
use pokepedia::models::CorpusEntry;
use pokepedia::retriever::DenseRetriever;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ─── Embedding ──────────────────────────────────────────────────────

/// Priority-ordered; a text embeds as the one-hot of the first keyword it mentions.
const KEYWORDS: [&str; 4] = ["bulbasaur", "charmander", "tackle", "growl"];

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut vec = vec![0.0; KEYWORDS.len()];
    if let Some(i) = KEYWORDS.iter().position(|k| lower.contains(k)) {
        vec[i] = 1.0;
    }
    vec
}

pub struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword"
    }

    fn dims(&self) -> usize {
        KEYWORDS.len()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(keyword_vector(text))
    }
}

pub struct BrokenEmbedder;

#[async_trait]
impl Embedder for BrokenEmbedder {
    fn model_name(&self) -> &str {
        "broken"
    }

    fn dims(&self) -> usize {
        KEYWORDS.len()
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        bail!("embedding service unavailable")
    }
}

// ─── Corpus ─────────────────────────────────────────────────────────

pub fn entries() -> Vec<CorpusEntry> {
    let entry = |pokemon: Option<&str>, section: &str, text: &str| CorpusEntry {
        pokemon: pokemon.map(str::to_string),
        section: section.to_string(),
        text: text.to_string(),
        description: None,
    };
    vec![
        entry(
            Some("Bulbasaur"),
            "Learnset",
            "Bulbasaur learns Tackle at level 1 and Growl at level 3.",
        ),
        entry(
            Some("Tackle"),
            "Move data",
            "Tackle is a Normal-type physical move with 40 power and 35 PP.",
        ),
        entry(
            Some("Charmander"),
            "Learnset",
            "Charmander learns Scratch at level 1 and Ember at level 4.",
        ),
        entry(
            Some("Growl"),
            "Move data",
            "Growl lowers the Attack of opposing Pokémon. It has 40 PP.",
        ),
    ]
}

pub fn retriever_with(embedder: Arc<dyn Embedder>) -> DenseRetriever {
    let entries = entries();
    let rows: Vec<Vec<f32>> = entries.iter().map(|e| keyword_vector(&e.text)).collect();
    let index = FlatL2Index::new(KEYWORDS.len(), &rows).expect("index");
    DenseRetriever::new(embedder, Arc::new(index), Arc::new(Corpus::new(entries)))
}

/// Index covers every entry but metadata stops after the first `kept`.
pub fn retriever_with_metadata(kept: usize) -> DenseRetriever {
    let entries = entries();
    let rows: Vec<Vec<f32>> = entries.iter().map(|e| keyword_vector(&e.text)).collect();
    let index = FlatL2Index::new(KEYWORDS.len(), &rows).expect("index");
    let corpus = Corpus::new(entries.into_iter().take(kept).collect());
    DenseRetriever::new(Arc::new(KeywordEmbedder), Arc::new(index), Arc::new(corpus))
}

pub fn retriever() -> DenseRetriever {
    retriever_with(Arc::new(KeywordEmbedder))
}

// ─── Language model ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Rewrite,
    Sufficiency,
    Refinement,
    Answer,
}

fn classify(prompt: &str) -> Call {
    if prompt.contains("<current_query>") {
        Call::Refinement
    } else if prompt.contains("Reply with exactly one word") {
        Call::Sufficiency
    } else if prompt.contains("<role>") {
        Call::Answer
    } else {
        Call::Rewrite
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail,
    Hang,
}

pub fn text(s: &str) -> Reply {
    Reply::Text(s.to_string())
}

/// Replies are consumed in order per stage; the last one repeats.
#[derive(Default)]
pub struct ScriptedModel {
    script: Mutex<Vec<(Call, VecDeque<Reply>)>>,
    calls: Mutex<Vec<(Call, String)>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, call: Call, replies: Vec<Reply>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push((call, replies.into_iter().collect()));
        self
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls.lock().unwrap().iter().filter(|(c, _)| *c == call).count()
    }

    pub fn prompts(&self, call: Call) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == call)
            .map(|(_, p)| p.clone())
            .collect()
    }

    fn next(&self, call: Call) -> Reply {
        let mut script = self.script.lock().unwrap();
        let queue = script
            .iter_mut()
            .find(|(c, _)| *c == call)
            .map(|(_, q)| q)
            .unwrap_or_else(|| panic!("no script for {:?}", call));
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let call = classify(prompt);
        self.calls.lock().unwrap().push((call, prompt.to_string()));
        match self.next(call) {
            Reply::Text(s) => Ok(s),
            Reply::Fail => bail!("model unavailable"),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                bail!("unreachable")
            }
        }
    }
}
