//! Ingestion pipeline orchestration.
//!
//! Coordinates the flow for one document: extract per-page text → chunk →
//! embed (batched, order-preserving) → insert into the vector index in a
//! single transaction. Nothing is written until every chunk has an
//! embedding, so a failure partway through leaves the index untouched and
//! the caller can retry the whole document. Re-ingestion appends
//! functionally redundant records; the index never deduplicates.

use std::path::Path;

use tracing::info;

use crate::chunk::chunk_page;
use crate::engine::Engine;
use crate::error::{RagError, Result};
use crate::extract;
use crate::models::{Chunk, IngestSummary};

pub(crate) async fn ingest_document(engine: &Engine, path: &Path) -> Result<IngestSummary> {
    let pages = extract::extract_pages(path)?;
    let document = extract::document_id(path);

    let chunking = &engine.config.chunking;
    let mut chunks: Vec<Chunk> = Vec::new();
    for page in &pages {
        chunks.extend(chunk_page(&document, page, chunking.max_chars, chunking.overlap_chars));
    }

    if chunks.is_empty() {
        info!(document = %document, chunk_count = 0, "ingested document (no text)");
        return Ok(IngestSummary {
            document,
            pages: pages.len(),
            chunk_count: 0,
        });
    }

    // Embed all chunks before touching the index.
    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(engine.config.embedding.batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let batch_vectors = engine.embedder.embed_batch(&texts).await?;
        if batch_vectors.len() != batch.len() {
            return Err(RagError::EmbeddingFailed {
                provider: engine.embedder.name().to_string(),
                message: format!(
                    "expected {} vectors, got {}",
                    batch.len(),
                    batch_vectors.len()
                ),
            });
        }
        vectors.extend(batch_vectors);
    }

    let records: Vec<(Chunk, Vec<f32>)> = chunks.into_iter().zip(vectors).collect();
    let chunk_count = engine.index.insert(&records).await?;

    info!(
        document = %document,
        pages = pages.len(),
        chunk_count,
        "ingested document"
    );

    Ok(IngestSummary {
        document,
        pages: pages.len(),
        chunk_count,
    })
}
