//! Core data types that flow through the ingestion and query pipeline.

use serde::Serialize;

/// One logical page of extracted document text.
///
/// Produced by the extractor and consumed by the chunker; never stored.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number within the source document.
    pub number: usize,
    /// Raw text of the page.
    pub text: String,
}

/// A bounded span of page text, the unit of embedding and retrieval.
///
/// Chunks are immutable once created. Provenance fields locate the chunk
/// in its source document; `hash` is a SHA-256 fingerprint of the text.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Source document identifier (file name).
    pub document: String,
    /// 1-based page the chunk was cut from.
    pub page: usize,
    /// Byte offset of the chunk within its page.
    pub offset: usize,
    /// Chunk text.
    pub text: String,
    /// SHA-256 hex digest of `text`.
    pub hash: String,
}

/// A retrieved chunk with its cosine similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// Record id assigned by the vector index.
    pub record_id: String,
    /// The stored chunk.
    pub chunk: Chunk,
    /// Cosine similarity in `[-1, 1]`, higher is closer.
    pub score: f32,
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    /// Source document identifier (file name).
    pub document: String,
    /// Number of pages extracted.
    pub pages: usize,
    /// Number of chunks embedded and stored.
    pub chunk_count: usize,
}
