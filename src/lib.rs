//! # Pokepedia
//!
//! Conversational question answering over a static Pokémon knowledge corpus.
//!
//! A request carries the user's question plus prior turns. The question is
//! rewritten into a standalone form, evidence is gathered by a recursive
//! retrieve → judge → refine loop over a dense vector index, and a language
//! model answers from that evidence only.
//!
//! ## Architecture
//!
//! ```text
//!  ┌──────────┐   ┌──────────┐   ┌───────────────────────────┐   ┌──────────┐
//!  │ history  │──▶│ rewrite  │──▶│ rcr loop                  │──▶│  answer  │
//!  │ trim/fmt │   │ (1 call) │   │ search ▸ judge ▸ refine   │   │ (1 call) │
//!  └──────────┘   └──────────┘   └────────────┬──────────────┘   └──────────┘
//!                                             ▼
//!                                   ┌───────────────────┐
//!                                   │ embedder + index  │
//!                                   │ + corpus metadata │
//!                                   └───────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pokepedia info                               # check corpus files
//! pokepedia search "bulbasaur level 1 moves"   # dense search only
//! pokepedia ask "What is Bulbasaur's first move's PP?" --trace
//! pokepedia serve                              # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Pipeline error taxonomy |
//! | [`models`] | Core data types |
//! | [`history`] | Conversation trimming and rendering |
//! | [`context`] | Evidence context assembly |
//! | [`embedding`] | Query embedding providers |
//! | [`index`] | Vector index and corpus metadata |
//! | [`retriever`] | Dense retrieval |
//! | [`llm`] | Language-model clients |
//! | [`prompts`] | Prompt text |
//! | [`rewrite`] | Standalone-question rewriting |
//! | [`rcr`] | Recursive contextual retrieval loop |
//! | [`answer`] | Final answer generation |
//! | [`service`] | Request pipeline facade |
//! | [`rate_limit`] | Fixed-window limiter for the HTTP layer |
//! | [`server`] | HTTP server |
//! | [`logging`] | Tracing subscriber setup |
//! | [`commands`] | CLI subcommand implementations |

pub mod answer;
pub mod commands;
pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod history;
pub mod index;
pub mod llm;
pub mod logging;
pub mod models;
pub mod prompts;
pub mod rate_limit;
pub mod rcr;
pub mod retriever;
pub mod rewrite;
pub mod server;
pub mod service;
