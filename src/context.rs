//! Evidence context assembly.
//!
//! Retrieved chunks are rendered as a header line followed by the chunk text
//! and concatenated in the order given. Assembly stops at the first chunk that
//! would overflow the character budget; later chunks are never considered,
//! even when they are shorter. This keeps the context biased toward the
//! highest-ranked evidence.

use std::collections::HashSet;

use crate::models::RetrievedDocument;

/// Render one chunk: header line, then the text, newline terminated.
pub fn render_chunk(doc: &RetrievedDocument) -> String {
    format!("{}\n{}\n", doc.doc.header(), doc.doc.text)
}

/// Build a context blob from `documents` within `max_chars` characters.
///
/// Documents whose `idx` was already rendered are skipped so a caller may pass
/// overlapping result sets.
pub fn build(documents: &[RetrievedDocument], max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    let mut total = 0usize;

    for doc in documents {
        if !seen.insert(doc.idx) {
            continue;
        }
        let chunk = render_chunk(doc);
        let len = chunk.chars().count();
        if total + len > max_chars {
            break;
        }
        parts.push(chunk);
        total += len;
    }

    tracing::debug!(chunks = parts.len(), chars = total, "built context");
    parts.join("\n")
}
