//! Recursive contextual retrieval.
//!
//! A single dense search often misses multi-part questions ("what is the PP of
//! Bulbasaur's first move") because the literal query does not match the fact
//! that is needed. This module runs a bounded loop instead:
//!
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            ▼                                              │
//!   search(current_query) ─▶ merge into evidence ─▶ sufficient? ── yes ─▶ Sufficient
//!                                                       │ no
//!                                                       ▼
//!                                   refine ─▶ next query empty or unchanged? ── yes ─▶ Unchanged
//!                                                       │ no
//!                                                       └── loops left? ── no ─▶ Exhausted
//! ```
//!
//! Facts only ever enter the evidence through the index; the model decides
//! when to stop and what to search next. Any failed search, sufficiency or
//! refinement call aborts the session with an error.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::RetrievalConfig;
use crate::context;
use crate::error::{Result, Stage};
use crate::llm::{complete_stage, LanguageModel};
use crate::models::RetrievedDocument;
use crate::prompts::{self, QUERY_MARKER};
use crate::retriever::DenseRetriever;

/// How a retrieval session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    /// The model judged the evidence sufficient.
    Sufficient,
    /// Refinement produced no new query.
    Unchanged,
    /// `max_loops` iterations ran without either of the above.
    Exhausted,
}

impl TerminalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalState::Sufficient => "sufficient",
            TerminalState::Unchanged => "unchanged",
            TerminalState::Exhausted => "exhausted",
        }
    }
}

/// Diagnostics for one loop iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopState {
    /// 1-based iteration number.
    pub iteration: usize,
    pub query: String,
    pub new_docs: usize,
    pub sufficiency: String,
    /// Raw refinement response; `None` when the loop stopped as sufficient.
    pub refinement: Option<String>,
    pub refined_query: Option<String>,
}

/// Documents gathered across iterations, unique by `idx`, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Evidence {
    docs: Vec<RetrievedDocument>,
    seen: HashSet<usize>,
}

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append documents not seen before. Returns how many were added.
    pub fn merge(&mut self, results: impl IntoIterator<Item = RetrievedDocument>) -> usize {
        let before = self.docs.len();
        for doc in results {
            if self.seen.insert(doc.idx) {
                self.docs.push(doc);
            }
        }
        self.docs.len() - before
    }

    pub fn docs(&self) -> &[RetrievedDocument] {
        &self.docs
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// Result of a completed retrieval session.
#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    pub evidence: Evidence,
    pub state: TerminalState,
    pub trace: Vec<LoopState>,
}

/// Budgets for one retrieval session.
#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub step_k: usize,
    pub max_loops: usize,
    pub partial_context_chars: usize,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

impl From<&RetrievalConfig> for LoopSettings {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            step_k: config.step_k,
            max_loops: config.max_loops,
            partial_context_chars: config.partial_context_chars,
        }
    }
}

/// Runs the retrieve → judge → refine loop.
pub struct RecursiveRetriever<'a> {
    retriever: &'a DenseRetriever,
    model: &'a dyn LanguageModel,
    settings: LoopSettings,
    timeout: Option<Duration>,
}

impl<'a> RecursiveRetriever<'a> {
    pub fn new(
        retriever: &'a DenseRetriever,
        model: &'a dyn LanguageModel,
        settings: LoopSettings,
    ) -> Self {
        Self {
            retriever,
            model,
            settings,
            timeout: None,
        }
    }

    /// Bound each model call; expiry aborts the session like a failed call.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Gather evidence for `original_question`, starting the search from
    /// `initial_query` (normally the rewritten question).
    ///
    /// Sufficiency and refinement are always judged against the original
    /// question, so a lossy rewrite cannot narrow what counts as answered.
    pub async fn run(&self, original_question: &str, initial_query: &str) -> Result<RetrievalOutcome> {
        let mut evidence = Evidence::new();
        let mut trace = Vec::new();
        let mut current_query = initial_query.to_string();

        for iteration in 1..=self.settings.max_loops {
            let results = self
                .retriever
                .search(&current_query, self.settings.step_k)
                .await?;
            let new_docs = evidence.merge(results);

            let partial = context::build(evidence.docs(), self.settings.partial_context_chars);

            let verdict = complete_stage(
                self.model,
                Stage::Sufficiency,
                &prompts::sufficiency(original_question, &partial),
                self.timeout,
            )
            .await?;
            let sufficient = is_sufficient(&verdict);

            tracing::info!(
                iteration,
                query = %current_query,
                new_docs,
                total_docs = evidence.len(),
                sufficient,
                "retrieval loop"
            );

            let mut step = LoopState {
                iteration,
                query: current_query.clone(),
                new_docs,
                sufficiency: verdict,
                refinement: None,
                refined_query: None,
            };

            if sufficient {
                trace.push(step);
                return Ok(finish(evidence, TerminalState::Sufficient, trace));
            }

            let refinement = complete_stage(
                self.model,
                Stage::Refinement,
                &prompts::refinement(original_question, &partial, &current_query),
                self.timeout,
            )
            .await?;
            let next_query = extract_search_query(&refinement);
            tracing::debug!(refinement = %refinement, next_query = %next_query, "refined query");

            step.refinement = Some(refinement);
            step.refined_query = Some(next_query.clone());
            trace.push(step);

            if next_query.is_empty() || next_query == current_query {
                return Ok(finish(evidence, TerminalState::Unchanged, trace));
            }
            current_query = next_query;
        }

        Ok(finish(evidence, TerminalState::Exhausted, trace))
    }
}

fn finish(evidence: Evidence, state: TerminalState, trace: Vec<LoopState>) -> RetrievalOutcome {
    tracing::info!(
        state = state.as_str(),
        iterations = trace.len(),
        docs = evidence.len(),
        "retrieval finished"
    );
    RetrievalOutcome {
        evidence,
        state,
        trace,
    }
}

/// A verdict is sufficient when it starts with `YES`, ignoring case and
/// leading whitespace. Anything else means keep searching.
pub fn is_sufficient(verdict: &str) -> bool {
    verdict
        .trim_start()
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("YES"))
}

/// Pull the next search query out of a refinement response.
///
/// 1. The text after the marker on the last line starting with `QUERY:`
///    (case-insensitive).
/// 2. Otherwise the last `.`-separated sentence longer than 10 characters.
/// 3. Otherwise the whole response, trimmed.
pub fn extract_search_query(text: &str) -> String {
    for line in text.lines().rev() {
        let line = line.trim();
        let has_marker = line
            .get(..QUERY_MARKER.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(QUERY_MARKER));
        if has_marker {
            return line[QUERY_MARKER.len()..].trim().to_string();
        }
    }

    text.split('.')
        .rev()
        .map(str::trim)
        .find(|sentence| sentence.chars().count() > 10)
        .unwrap_or_else(|| text.trim())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CorpusEntry;

    fn doc(idx: usize) -> RetrievedDocument {
        RetrievedDocument {
            idx,
            score: 0.0,
            doc: CorpusEntry {
                pokemon: None,
                section: "moves".to_string(),
                text: format!("chunk {}", idx),
                description: None,
            },
        }
    }

    #[test]
    fn test_sufficiency_prefix_match() {
        for yes in ["YES", "Yes, absolutely", "yes.", "  yes\n"] {
            assert!(is_sufficient(yes), "{:?} should be sufficient", yes);
        }
        for no in ["NOPE", "", "Maybe", "NO", "ye", "I think yes"] {
            assert!(!is_sufficient(no), "{:?} should not be sufficient", no);
        }
    }

    #[test]
    fn test_sufficiency_handles_multibyte_prefix() {
        assert!(!is_sufficient("é"));
        assert!(!is_sufficient("ÿes"));
    }

    #[test]
    fn test_extract_query_line() {
        let text = "Replaced \"first move\" with \"Tackle\".\nQUERY: What is the PP of Tackle?";
        assert_eq!(extract_search_query(text), "What is the PP of Tackle?");
    }

    #[test]
    fn test_extract_uses_last_query_line_case_insensitive() {
        let text = "QUERY: first\nnote\n  query:   second  \ntrailing words";
        assert_eq!(extract_search_query(text), "second");
    }

    #[test]
    fn test_extract_empty_after_marker() {
        assert_eq!(extract_search_query("No changes.\nQUERY:   "), "");
    }

    #[test]
    fn test_extract_falls_back_to_last_long_sentence() {
        let text = "The move is Tackle. Search for the PP of Tackle. Ok.";
        assert_eq!(extract_search_query(text), "Search for the PP of Tackle");
    }

    #[test]
    fn test_extract_falls_back_to_raw_text() {
        assert_eq!(extract_search_query("  Tackle PP \n"), "Tackle PP");
    }

    #[test]
    fn test_evidence_dedups_in_first_seen_order() {
        let mut evidence = Evidence::new();
        assert_eq!(evidence.merge(vec![doc(3), doc(1), doc(3)]), 2);
        assert_eq!(evidence.merge(vec![doc(1), doc(7), doc(2)]), 2);
        let ids: Vec<usize> = evidence.docs().iter().map(|d| d.idx).collect();
        assert_eq!(ids, vec![3, 1, 7, 2]);
    }

    #[test]
    fn test_settings_from_config() {
        let settings = LoopSettings::default();
        assert_eq!(settings.step_k, 8);
        assert_eq!(settings.max_loops, 4);
        assert_eq!(settings.partial_context_chars, 3200);
    }
}
