//! End-to-end pipeline tests with test-double providers.
//!
//! Wires an [`Engine`] from deterministic in-process embedder/generator
//! doubles and a tempdir-backed index, then exercises the full ingest and
//! ask flows without any network or model dependency.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use greenrag::answer::NO_CONTEXT_FALLBACK;
use greenrag::config::{
    ChunkingConfig, Config, EmbeddingConfig, GenerationConfig, IndexConfig, RetrievalConfig,
    ServerConfig,
};
use greenrag::embedding::Embedder;
use greenrag::engine::Engine;
use greenrag::error::RagError;
use greenrag::generation::Generator;
use greenrag::index::VectorIndex;

const DIMS: usize = 8;

/// Deterministic embedding: identical text always maps to the identical
/// vector, so a query equal to an indexed chunk retrieves it first.
fn embed_text(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for (i, b) in text.bytes().enumerate() {
        v[i % DIMS] += f32::from(b) / 255.0;
    }
    v
}

struct StubEmbedder {
    calls: AtomicUsize,
}

impl StubEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> greenrag::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| embed_text(t)).collect())
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn dims(&self) -> usize {
        DIMS
    }
}

struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> greenrag::Result<Vec<Vec<f32>>> {
        Err(RagError::EmbeddingFailed {
            provider: "stub".to_string(),
            message: "simulated outage".to_string(),
        })
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn dims(&self) -> usize {
        DIMS
    }
}

/// Records every prompt it sees and returns a canned reply.
struct RecordingGenerator {
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    reply: String,
}

impl RecordingGenerator {
    fn new(reply: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            reply: reply.to_string(),
        }
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> greenrag::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> greenrag::Result<String> {
        Err(RagError::GenerationFailed {
            provider: "stub".to_string(),
            message: "simulated outage".to_string(),
        })
    }

    fn name(&self) -> &str {
        "stub"
    }
}

fn test_config(tmp: &TempDir) -> Config {
    Config {
        index: IndexConfig {
            path: tmp.path().join("data/index.sqlite"),
        },
        chunking: ChunkingConfig::default(),
        retrieval: RetrievalConfig::default(),
        embedding: EmbeddingConfig::default(),
        generation: GenerationConfig::default(),
        server: ServerConfig::default(),
    }
}

async fn test_engine(
    tmp: &TempDir,
    generator: Arc<dyn Generator>,
) -> (Engine, Arc<StubEmbedder>) {
    let config = test_config(tmp);
    let index = VectorIndex::open(&config.index.path).await.unwrap();
    let embedder = Arc::new(StubEmbedder::new());
    let engine = Engine::with_providers(&config, index, embedder.clone(), generator);
    (engine, embedder)
}

/// A three-page document of ~3000 characters, pages separated by form
/// feeds the way PDF extraction emits them.
fn three_page_document() -> String {
    let page = |n: usize| {
        format!("Page {} of the sustainability report. ", n).repeat(26) // ~1000 chars
    };
    format!("{}\u{0C}{}\u{0C}{}", page(1), page(2), page(3))
}

#[tokio::test]
async fn scenario_a_multipage_ingest() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(RecordingGenerator::new("unused"));
    let (engine, _) = test_engine(&tmp, generator).await;

    let doc = tmp.path().join("report.txt");
    fs::write(&doc, three_page_document()).unwrap();

    let summary = engine.ingest(&doc).await.unwrap();
    assert_eq!(summary.document, "report.txt");
    assert_eq!(summary.pages, 3);
    assert!(summary.chunk_count >= 4, "expected >= 4 chunks, got {}", summary.chunk_count);
    assert_eq!(engine.index().count().await.unwrap(), summary.chunk_count as i64);

    // Every stored chunk satisfies the length invariant.
    let all = engine
        .retrieve("sustainability report", summary.chunk_count)
        .await
        .unwrap();
    assert_eq!(all.len(), summary.chunk_count);
    for result in &all {
        assert!(result.chunk.text.len() <= 800);
        assert!((1..=3).contains(&result.chunk.page));
    }
}

#[tokio::test]
async fn scenario_b_empty_index_returns_fallback_without_generating() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(RecordingGenerator::new("should never be produced"));
    let (engine, _) = test_engine(&tmp, generator.clone()).await;

    let answer = engine.ask("What is the policy?").await.unwrap();
    assert_eq!(answer, NO_CONTEXT_FALLBACK);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn scenario_c_prompt_contains_retrieved_chunk_verbatim() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(RecordingGenerator::new("  Emissions dropped by 12%.  \n"));
    let (engine, _) = test_engine(&tmp, generator.clone()).await;

    let chunk_text = "Scope 1 emissions fell by twelve percent year over year.";
    let doc = tmp.path().join("emissions.txt");
    fs::write(&doc, chunk_text).unwrap();
    let summary = engine.ingest(&doc).await.unwrap();
    assert_eq!(summary.chunk_count, 1);

    // Asking with the chunk's exact text makes the query embedding equal
    // the stored embedding, so that chunk must be retrieved.
    let answer = engine.ask(chunk_text).await.unwrap();

    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[0].contains(chunk_text), "prompt missing chunk text: {}", prompts[0]);
    assert!(prompts[0].contains("ESG compliance expert"));
    // The response comes back trimmed.
    assert_eq!(answer, "Emissions dropped by 12%.");
}

#[tokio::test]
async fn reingestion_appends_without_dedup() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(RecordingGenerator::new("unused"));
    let (engine, _) = test_engine(&tmp, generator).await;

    let chunk_text = "Renewable share reached forty percent this quarter.";
    let doc = tmp.path().join("renewables.txt");
    fs::write(&doc, chunk_text).unwrap();

    let first = engine.ingest(&doc).await.unwrap();
    let second = engine.ingest(&doc).await.unwrap();
    assert_eq!(first.chunk_count, second.chunk_count);
    assert_eq!(
        engine.index().count().await.unwrap(),
        (first.chunk_count + second.chunk_count) as i64
    );

    // Both copies are independently retrievable.
    let results = engine.retrieve(chunk_text, 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk.text, chunk_text);
    assert_eq!(results[1].chunk.text, chunk_text);
    assert_ne!(results[0].record_id, results[1].record_id);
}

#[tokio::test]
async fn missing_document_fails_without_index_mutation() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(RecordingGenerator::new("unused"));
    let (engine, embedder) = test_engine(&tmp, generator).await;

    let err = engine.ingest(Path::new("/nonexistent.pdf")).await.unwrap_err();
    assert!(matches!(err, RagError::DocumentNotFound { .. }));
    assert_eq!(engine.index().count().await.unwrap(), 0);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn embedding_failure_commits_nothing() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let index = VectorIndex::open(&config.index.path).await.unwrap();
    let engine = Engine::with_providers(
        &config,
        index,
        Arc::new(FailingEmbedder),
        Arc::new(RecordingGenerator::new("unused")),
    );

    let doc = tmp.path().join("doc.txt");
    fs::write(&doc, "Some content that will never be embedded.").unwrap();

    let err = engine.ingest(&doc).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingFailed { .. }));
    assert_eq!(engine.index().count().await.unwrap(), 0);
}

#[tokio::test]
async fn generation_failure_surfaces_as_error() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    let index = VectorIndex::open(&config.index.path).await.unwrap();
    let embedder = Arc::new(StubEmbedder::new());
    let engine =
        Engine::with_providers(&config, index, embedder, Arc::new(FailingGenerator));

    let doc = tmp.path().join("doc.txt");
    fs::write(&doc, "Water usage fell below the audited threshold.").unwrap();
    engine.ingest(&doc).await.unwrap();

    let err = engine.ask("What about water usage?").await.unwrap_err();
    assert!(matches!(err, RagError::GenerationFailed { .. }));
}

#[tokio::test]
async fn empty_document_ingests_zero_chunks() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(RecordingGenerator::new("unused"));
    let (engine, embedder) = test_engine(&tmp, generator).await;

    let doc = tmp.path().join("empty.txt");
    fs::write(&doc, "").unwrap();

    let summary = engine.ingest(&doc).await.unwrap();
    assert_eq!(summary.chunk_count, 0);
    assert_eq!(engine.index().count().await.unwrap(), 0);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn index_survives_engine_restart() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);

    let chunk_text = "Board oversight of climate risk was formalized in March.";
    let doc = tmp.path().join("governance.txt");
    fs::write(&doc, chunk_text).unwrap();

    {
        let index = VectorIndex::open(&config.index.path).await.unwrap();
        let engine = Engine::with_providers(
            &config,
            index,
            Arc::new(StubEmbedder::new()),
            Arc::new(RecordingGenerator::new("unused")),
        );
        engine.ingest(&doc).await.unwrap();
        engine.index().close().await;
    }

    let index = VectorIndex::open(&config.index.path).await.unwrap();
    let engine = Engine::with_providers(
        &config,
        index,
        Arc::new(StubEmbedder::new()),
        Arc::new(RecordingGenerator::new("unused")),
    );
    let results = engine.retrieve(chunk_text, 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.text, chunk_text);
}

/// Minimal valid PDF containing the given phrase. Builds the body then an
/// xref table with correct byte offsets so pdf-extract can parse it.
fn minimal_pdf_with_phrase(phrase: &str) -> Vec<u8> {
    let stream = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET\n", phrase);
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!("4 0 obj << /Length {} >> stream\n{}endstream endobj\n", stream.len(), stream)
            .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

#[tokio::test]
async fn pdf_document_is_extracted_and_indexed() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(RecordingGenerator::new("unused"));
    let (engine, _) = test_engine(&tmp, generator).await;

    let doc = tmp.path().join("audit.pdf");
    fs::write(&doc, minimal_pdf_with_phrase("carbon audit passed")).unwrap();

    let summary = engine.ingest(&doc).await.unwrap();
    assert_eq!(summary.document, "audit.pdf");
    assert!(summary.chunk_count >= 1);

    let results = engine.retrieve("carbon audit passed", 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].chunk.text.contains("carbon audit passed"));
}

#[tokio::test]
async fn corrupt_pdf_is_unreadable() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(RecordingGenerator::new("unused"));
    let (engine, _) = test_engine(&tmp, generator).await;

    let doc = tmp.path().join("broken.pdf");
    fs::write(&doc, b"not a pdf at all").unwrap();

    let err = engine.ingest(&doc).await.unwrap_err();
    assert!(matches!(err, RagError::UnreadableDocument { .. }));
    assert_eq!(engine.index().count().await.unwrap(), 0);
}
