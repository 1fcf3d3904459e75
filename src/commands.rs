//! CLI command implementations.
//!
//! Each `run_*` function backs one `pokepedia` subcommand and prints to stdout.

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::index::{Corpus, DocumentStore, FlatL2Index, VectorIndex};
use crate::rcr::RetrievalOutcome;
use crate::retriever::{snippet, DenseRetriever};
use crate::service::ChatService;

/// `pokepedia ask`: run one question through the full pipeline.
pub async fn run_ask(config: &Config, question: &str, trace: bool) -> Result<()> {
    let service = ChatService::load(config)?;
    let result = service.chat_detailed(question, &[]).await;

    if trace {
        println!("rewritten query: {}", result.rewritten_query);
        match &result.retrieval {
            Some(outcome) => print_trace(outcome),
            None => println!("retrieval failed"),
        }
        println!();
    }
    println!("{}", result.reply);
    Ok(())
}

fn print_trace(outcome: &RetrievalOutcome) {
    for step in &outcome.trace {
        println!("loop {}", step.iteration);
        println!("  query:       {}", step.query);
        println!("  new docs:    {}", step.new_docs);
        println!("  sufficient:  {}", step.sufficiency.trim());
        if let Some(refined) = &step.refined_query {
            println!("  next query:  {}", refined);
        }
    }
    println!(
        "state: {} ({} documents)",
        outcome.state.as_str(),
        outcome.evidence.len()
    );
}

/// `pokepedia search`: dense search only, no model calls.
pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let retriever = load_retriever(config)?;
    let limit = limit.unwrap_or(config.retrieval.search_limit);
    let results = retriever.search(query, limit).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (rank, doc) in results.iter().enumerate() {
        println!(
            "#{:<3} idx={:<6} score={:.4} {}",
            rank + 1,
            doc.idx,
            doc.score,
            doc.doc.header()
        );
        println!("     {}", snippet(&doc.doc.text, 160));
    }
    Ok(())
}

fn load_retriever(config: &Config) -> Result<DenseRetriever> {
    let embedder: Arc<dyn Embedder> = Arc::from(create_embedder(&config.embedding)?);
    let index = FlatL2Index::load(&config.corpus.index_path, index_dims(config, embedder.as_ref())?)?;
    let corpus = Corpus::load(&config.corpus.metadata_path)?;
    Ok(DenseRetriever::new(embedder, Arc::new(index), Arc::new(corpus)))
}

fn index_dims(config: &Config, embedder: &dyn Embedder) -> Result<usize> {
    match config.embedding.dims.unwrap_or_else(|| embedder.dims()) {
        0 => anyhow::bail!("embedding.dims must be set to read the vector index"),
        dims => Ok(dims),
    }
}

/// `pokepedia info`: report corpus and index sizes.
pub fn run_info(config: &Config) -> Result<()> {
    let embedder = create_embedder(&config.embedding)?;
    let index = FlatL2Index::load(&config.corpus.index_path, index_dims(config, embedder.as_ref())?)?;
    let corpus = Corpus::load(&config.corpus.metadata_path)?;

    println!("index:    {}", config.corpus.index_path.display());
    println!("  vectors: {}", index.len());
    println!("  dims:    {}", index.dims());
    println!("metadata: {}", config.corpus.metadata_path.display());
    println!("  chunks:  {}", corpus.len());
    println!("embedding: {}", config.embedding.provider);
    println!("llm:       {} ({})", config.llm.provider, config.llm.model);

    if index.len() != corpus.len() {
        println!(
            "warning: index has {} vectors but metadata has {} chunks",
            index.len(),
            corpus.len()
        );
    }
    Ok(())
}
