//! The query engine: a dependency-injected context object.
//!
//! [`Engine`] owns the embedder, generator, and vector index handles and
//! exposes the two pipeline entry points, `ingest` and `ask`. Collaborators
//! are injected explicitly — there is no ambient global state — so tests
//! swap in doubles via [`Engine::with_providers`].

use std::path::Path;
use std::sync::Arc;

use crate::answer;
use crate::config::Config;
use crate::embedding::{self, Embedder};
use crate::error::Result;
use crate::generation::{self, Generator};
use crate::index::VectorIndex;
use crate::ingest;
use crate::models::{IngestSummary, ScoredChunk};

/// Shared pipeline state: configuration plus the three capability handles.
///
/// `Send + Sync`; wrap in an [`Arc`] to share across server handlers or
/// tasks. Ingestion and querying are independent apart from the index.
pub struct Engine {
    pub(crate) config: Config,
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) generator: Arc<dyn Generator>,
    pub(crate) index: VectorIndex,
}

impl Engine {
    /// Build an engine from configuration: instantiate the configured
    /// providers and open the persisted index.
    pub async fn open(config: &Config) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = embedding::create_embedder(&config.embedding)?.into();
        let generator: Arc<dyn Generator> =
            generation::create_generator(&config.generation)?.into();
        let index = VectorIndex::open(&config.index.path).await?;

        Ok(Self {
            config: config.clone(),
            embedder,
            generator,
            index,
        })
    }

    /// Build an engine around explicit collaborators.
    ///
    /// This is the seam for test doubles and custom providers.
    pub fn with_providers(
        config: &Config,
        index: VectorIndex,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            config: config.clone(),
            embedder,
            generator,
            index,
        }
    }

    /// Ingest one document: extract, chunk, embed, and store.
    pub async fn ingest(&self, path: &Path) -> Result<IngestSummary> {
        ingest::ingest_document(self, path).await
    }

    /// Answer a question from indexed context, or return the fixed
    /// fallback when nothing relevant is stored.
    pub async fn ask(&self, question: &str) -> Result<String> {
        answer::answer(self, question).await
    }

    /// Retrieve the top-`k` chunks for a question without generating.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        answer::retrieve(self, question, k).await
    }

    /// The underlying vector index.
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// The engine's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}
