use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use docqa_core::config::Config;
use docqa_core::data_processor::{load_extracted_dir, load_jsonl};
use docqa_core::types::{ContextPassage, SearchResult};
use docqa_hybrid::{answer_cache_key, RetrievalService, SearchOptions};

/// Ingest extracted regulation documents and query them with hybrid retrieval.
#[derive(Parser, Debug)]
#[command(name = "docqa", version, about)]
struct Cli {
    /// Directory holding config.toml and its profile files
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chunk and index a directory of `.txt` extracts or a `.jsonl` file
    Ingest {
        path: PathBuf,
        /// Clear the collection before ingesting
        #[arg(long)]
        replace: bool,
    },
    /// Search the collection
    Search {
        query: String,
        #[arg(short = 'n', long)]
        n_results: Option<usize>,
        #[arg(long)]
        no_rerank: bool,
        #[arg(long)]
        threshold: Option<f32>,
        /// Scope the query to a department, e.g. 薬局
        #[arg(long)]
        department: Option<String>,
        /// Print the generation hand-off records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Number of stored chunks
    Count,
    /// Drop every stored chunk
    Clear,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn load_documents(path: &Path) -> anyhow::Result<Vec<docqa_core::types::Document>> {
    let is_jsonl = path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("jsonl"));
    if is_jsonl {
        load_jsonl(path)
    } else {
        load_extracted_dir(path)
    }
}

fn print_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No relevant passages found.");
        return;
    }
    for (rank, r) in results.iter().enumerate() {
        let preview: String = r.content.chars().take(120).collect::<String>().replace('\n', " ");
        let rerank = r.rerank_score.map(|s| format!(" rerank={s:.3}")).unwrap_or_default();
        println!(
            "{:>2}. {} [{}/{}] distance={:.3} keyword={}{}",
            rank + 1,
            r.metadata.filename,
            r.metadata.chunk_index + 1,
            r.metadata.total_chunks,
            r.distance,
            r.keyword_score,
            rerank
        );
        println!("    {preview}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::load_from(&cli.config_dir).context("loading configuration")?;
    let show_progress = matches!(cli.command, Command::Ingest { .. });
    let service = RetrievalService::open(&config, show_progress).await?;

    match cli.command {
        Command::Ingest { path, replace } => {
            let docs = load_documents(&path).with_context(|| format!("reading documents from {}", path.display()))?;
            if replace {
                service.clear().await?;
            }
            let written = service.add_documents(&docs).await?;
            info!(documents = docs.len(), chunks = written, "Ingest complete");
            println!("Ingested {} documents ({} chunks); collection now holds {}", docs.len(), written, service.count().await?);
        }
        Command::Search { query, n_results, no_rerank, threshold, department, json } => {
            let opts = SearchOptions {
                n_results,
                use_reranking: no_rerank.then_some(false),
                distance_threshold: threshold,
                department,
            };
            let results = service.search(&query, &opts).await?;
            if json {
                let passages: Vec<ContextPassage> = results.iter().map(SearchResult::to_context).collect();
                let out = serde_json::json!({
                    "query": query,
                    "cache_key": answer_cache_key(&query, &results),
                    "passages": passages,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print_results(&results);
            }
        }
        Command::Count => println!("{}", service.count().await?),
        Command::Clear => {
            service.clear().await?;
            println!("Collection cleared");
        }
    }
    service.close();
    Ok(())
}
