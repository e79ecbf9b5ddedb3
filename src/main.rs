//! # GreenRAG CLI (`grag`)
//!
//! The `grag` binary is the primary interface for GreenRAG. It provides
//! commands for index initialization, document ingestion, question
//! answering, raw retrieval, index statistics, and the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! grag --config ./config/grag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `grag init` | Create the vector index and run schema migrations |
//! | `grag ingest <path>` | Chunk, embed, and store one document |
//! | `grag ask "<question>"` | Answer a question from indexed context |
//! | `grag search "<query>"` | Show the top matching chunks without generating |
//! | `grag stats` | Show index record and document counts |
//! | `grag serve` | Start the HTTP server |

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use greenrag::config;
use greenrag::engine::Engine;
use greenrag::index::VectorIndex;
use greenrag::server;

/// GreenRAG CLI — a retrieval-augmented question answering engine for ESG
/// and sustainability documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/grag.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "grag",
    about = "GreenRAG — retrieval-augmented question answering over ESG and sustainability documents",
    version,
    long_about = "GreenRAG ingests unstructured documents (PDF, Markdown, plain text), chunks and \
    embeds them into a durable SQLite vector index, and answers natural-language questions by \
    retrieving the most similar chunks and conditioning a generative model on them."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/grag.toml`. Index, chunking, retrieval,
    /// provider, and server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/grag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the vector index.
    ///
    /// Creates the SQLite file and its tables. Idempotent — running it
    /// multiple times is safe.
    Init,

    /// Ingest one document.
    ///
    /// Extracts per-page text, chunks it, embeds every chunk, and appends
    /// the records to the index in one transaction. Re-ingesting the same
    /// document appends a second copy; the index never deduplicates.
    Ingest {
        /// Path to the document (`.pdf`, `.md`, `.txt`, or any text file).
        path: PathBuf,
    },

    /// Answer a question from indexed context.
    ///
    /// Retrieves the most similar chunks and conditions the configured
    /// generative model on them. With nothing relevant indexed, prints a
    /// fixed fallback without calling the model.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Show the top matching chunks for a query without generating.
    ///
    /// Useful for inspecting what context `ask` would be grounded on.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of chunks to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show index statistics.
    Stats,

    /// Start the HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and exposes
    /// `POST /ingest`, `POST /ask`, and `GET /health`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let index = VectorIndex::open(&cfg.index.path).await?;
            index.close().await;
            println!("Index initialized at {}", cfg.index.path.display());
        }
        Commands::Ingest { path } => {
            let engine = Engine::open(&cfg).await?;
            let summary = engine.ingest(&path).await?;
            println!("ingest {}", summary.document);
            println!("  pages: {}", summary.pages);
            println!("  chunks stored: {}", summary.chunk_count);
            println!("ok");
        }
        Commands::Ask { question } => {
            let engine = Engine::open(&cfg).await?;
            let answer = engine.ask(&question).await?;
            println!("{}", answer);
        }
        Commands::Search { query, limit } => {
            let engine = Engine::open(&cfg).await?;
            let k = limit.unwrap_or(cfg.retrieval.top_k);
            let results = engine.retrieve(&query, k).await?;

            if results.is_empty() {
                println!("No results.");
                return Ok(());
            }

            for (i, result) in results.iter().enumerate() {
                println!(
                    "{}. [{:.4}] {} (page {})",
                    i + 1,
                    result.score,
                    result.chunk.document,
                    result.chunk.page
                );
                println!(
                    "    excerpt: \"{}\"",
                    snippet(&result.chunk.text).replace('\n', " ")
                );
                println!("    id: {}", result.record_id);
                println!();
            }
        }
        Commands::Stats => {
            let index = VectorIndex::open(&cfg.index.path).await?;
            let records = index.count().await?;
            let documents = index.document_count().await?;
            let dims = index.dims().await?;
            let size = std::fs::metadata(&cfg.index.path).map(|m| m.len()).unwrap_or(0);

            println!("GreenRAG — Index Stats");
            println!("======================");
            println!();
            println!("  Index:      {}", cfg.index.path.display());
            println!("  Size:       {}", format_bytes(size));
            println!();
            println!("  Documents:  {}", documents);
            println!("  Records:    {}", records);
            match dims {
                Some(d) => println!("  Dims:       {}", d),
                None => println!("  Dims:       (no records yet)"),
            }
            index.close().await;
        }
        Commands::Serve => {
            let engine = Engine::open(&cfg).await?;
            server::run_server(Arc::new(engine)).await?;
        }
    }

    Ok(())
}

fn snippet(text: &str) -> &str {
    let mut end = text.len().min(160);
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }
    &text[..end]
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}
