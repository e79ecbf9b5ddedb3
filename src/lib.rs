//! # GreenRAG
//!
//! A retrieval-augmented question answering engine for ESG and
//! sustainability documents.
//!
//! GreenRAG ingests unstructured documents (PDF, Markdown, plain text),
//! chunks and embeds them into a durable SQLite vector index, and answers
//! natural-language questions by retrieving the most similar chunks and
//! conditioning a generative model on them.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌──────────┐
//! │ Extractor │──▶│   Pipeline    │──▶│  SQLite   │
//! │ PDF/text  │   │ Chunk+Embed  │   │ vectors   │
//! └───────────┘   └──────────────┘   └────┬─────┘
//!                                         │
//!                     ┌───────────────────┤
//!                     ▼                   ▼
//!                ┌──────────┐       ┌──────────┐
//!                │   CLI    │       │   HTTP   │
//!                │  (grag)  │       │  (JSON)  │
//!                └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! grag init                       # create the vector index
//! grag ingest ./docs/report.pdf   # chunk, embed, and store a document
//! grag ask "What is our scope 2 target?"
//! grag serve                      # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Document loading and page extraction |
//! | [`chunk`] | Overlapping text chunking |
//! | [`embedding`] | Embedding capability and providers |
//! | [`generation`] | Generation capability and providers |
//! | [`index`] | Durable vector index |
//! | [`engine`] | Dependency-injected pipeline context |
//! | [`ingest`] | Ingestion pipeline |
//! | [`answer`] | Retrieval and answer orchestration |
//! | [`server`] | HTTP server |
//! | [`error`] | Error taxonomy |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod extract;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod models;
pub mod server;

pub use engine::Engine;
pub use error::{RagError, Result};
