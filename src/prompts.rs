//! Prompt text for each model call in the pipeline.
//!
//! These are plain string builders; the pipeline never inspects their wording,
//! only the response contracts they establish (a standalone question, a bare
//! `YES`/`NO`, a two-line refinement ending in [`QUERY_MARKER`], a plain-text
//! answer).

/// Prefix of the refinement line that carries the next search query.
pub const QUERY_MARKER: &str = "QUERY:";

const NO_HISTORY: &str = "(no previous conversation)";
const NO_CONTEXT: &str = "(no context yet)";
const NO_ANSWER_CONTEXT: &str = "(no relevant context was found in the knowledge base)";

/// Ask for a standalone rephrasing of the latest question.
pub fn rewrite(history: &str, query: &str) -> String {
    let history = if history.is_empty() { NO_HISTORY } else { history };
    format!(
        "You rewrite questions for a Pokédex search engine.

Given the conversation so far and the user's latest question, restate ONLY the
latest question so it can be understood without the conversation.

Rules:
- Do not answer the question.
- Do not add information that is not in the conversation.
- If the question already stands on its own, return it unchanged.
- Everything is about Pokémon; you do not need to say so.
- Reply with the rewritten question and nothing else.

Conversation so far:
{history}

Latest user question:
{query}
"
    )
}

/// Ask whether `context` alone fully answers `question`. Expects `YES` or `NO`.
pub fn sufficiency(question: &str, context: &str) -> String {
    let context = if context.is_empty() { NO_CONTEXT } else { context };
    format!(
        "<task>
Decide whether the Context is enough, on its own, to answer the Question fully
and specifically, using no outside knowledge and without guessing.
</task>

<question>
{question}
</question>

<context>
{context}
</context>

<rules>
- Every part of a multi-part question (each move, stat, game or condition) must
  be clearly covered.
- Missing, vague, contradictory or merely implied facts mean NOT sufficient.
- If unsure, the answer is NO.
</rules>

<examples>
Q: What type is Bulbasaur?  Context: \"Bulbasaur is a Grass/Poison-type Pokémon.\"  -> YES
Q: What is the PP of Hyper Beam?  Context: \"Hyper Beam has 150 base power.\"  -> NO
</examples>

Reply with exactly one word: YES or NO.
"
    )
}

/// Ask for a sharper next search query, resolving vague references in
/// `question` from `context` without inventing facts.
pub fn refinement(question: &str, context: &str, current_query: &str) -> String {
    let context = if context.is_empty() { NO_CONTEXT } else { context };
    format!(
        "<task>
You plan the next retrieval step for a Pokédex knowledge base. You are not
answering the user. First resolve what the Context already settles, then write
a search query for what is still missing.
</task>

<original_question>
{question}
</original_question>

<current_query>
{current_query}
</current_query>

<context>
{context}
</context>

<rules>
- Use ONLY the Context to resolve vague phrases such as \"its first move\",
  \"that ability\" or \"the level 1 move\"; substitute the concrete names.
- Never invent Pokémon facts (move names, PP, power, types, generations) that the
  Context does not state.
- Keep the intent of the original question (still about PP, power, learnset, ...).
- Aim the query at the property that is still missing, naming every entity
  you resolved.
- If the Context is empty or irrelevant, return a clean version of the
  current query.
</rules>

<example>
Original question: What is Bulbasaur's first move's PP?
Context: Level 1: Tackle (PP 35), Level 3: Growl (PP 40)
Output:
Replaced \"first move\" with \"Tackle\", Bulbasaur's level 1 move.
{QUERY_MARKER} What is the PP of Tackle, Bulbasaur's level 1 move?
</example>

<output_format>
Exactly two lines:
1) One short sentence describing what you changed, or
   \"No changes; not enough information to rewrite the question.\"
2) '{QUERY_MARKER} ' followed by the next search query (repeat the current query
   if nothing changed).
</output_format>
"
    )
}

/// Ask for the final grounded answer.
pub fn answer(context: &str, query: &str, history: &str) -> String {
    let context = if context.is_empty() {
        NO_ANSWER_CONTEXT
    } else {
        context
    };
    let history = if history.is_empty() { NO_HISTORY } else { history };
    format!(
        "<role>
You are a Pokédex assistant covering every generation of the official games.
</role>

<grounding>
- The text inside <context> is the ONLY Pokémon knowledge you may use.
- Never guess numbers, names, effects, stats or mechanics the context does not support.
- If the context does not answer the question with confidence, say:
  \"I don't know based on the provided context.\"
- If sources disagree, say so and prefer the more specific or later-generation detail.
- Do not mention \"context\", \"chunks\", \"embeddings\" or \"vector store\" in the answer.
</grounding>

<conversation>
{history}
</conversation>

<context>
{context}
</context>

<question>
{query}
</question>

<style>
- Plain text, no XML tags.
- One concise paragraph of 2-5 sentences unless the user asks for a list or table.
- Include concrete numbers, move names, levels, types and conditions when available.
- State which generation or game the answer applies to when the context makes it clear.
</style>
"
    )
}
