//! # Pokepedia CLI (`pokepedia`)
//!
//! The `pokepedia` binary serves the chat endpoint and offers a few local
//! commands for poking at the corpus without going through HTTP.
//!
//! ## Usage
//!
//! ```bash
//! pokepedia --config ./config/pokepedia.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pokepedia serve` | Start the HTTP chat server |
//! | `pokepedia ask "<question>"` | Answer one question through the full pipeline |
//! | `pokepedia search "<query>"` | Dense search only, no model calls |
//! | `pokepedia info` | Show corpus and index sizes |
//!
//! ## Examples
//!
//! ```bash
//! # Check that index and metadata line up
//! pokepedia info
//!
//! # Watch the retrieval loop work
//! pokepedia ask "What is the PP of Bulbasaur's first move?" --trace
//!
//! # Serve on the configured bind address
//! RUST_LOG=pokepedia=debug pokepedia serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pokepedia::{commands, config, logging, server};

/// Pokepedia: Pokémon question answering with recursive retrieval.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/pokepedia.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "pokepedia",
    about = "Pokémon question answering over a static corpus",
    version,
    long_about = "Pokepedia rewrites each question into a standalone query, gathers evidence \
    with a recursive retrieve/judge/refine loop over a dense vector index, and answers \
    from that evidence only."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pokepedia.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP chat server.
    ///
    /// Binds to `[server].bind` and serves `POST /chat` plus health routes.
    Serve,

    /// Answer a single question without history.
    Ask {
        /// The question to answer.
        question: String,

        /// Print the rewritten query and each retrieval loop before the answer.
        #[arg(long)]
        trace: bool,
    },

    /// Run a dense search and print the ranked chunks.
    Search {
        /// Search query text.
        query: String,

        /// Maximum number of results. Defaults to `[retrieval].search_limit`.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show corpus and index statistics.
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init("pokepedia=info,tower_http=info");

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ask { question, trace } => {
            commands::run_ask(&cfg, &question, trace).await?;
        }
        Commands::Search { query, limit } => {
            commands::run_search(&cfg, &query, limit).await?;
        }
        Commands::Info => {
            commands::run_info(&cfg)?;
        }
    }

    Ok(())
}
