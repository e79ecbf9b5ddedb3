//! Retrieval and answer orchestration.
//!
//! `retrieve` embeds the question and asks the vector index for the
//! closest chunks — no re-ranking, the index's cosine ordering stands.
//! `answer` turns retrieved chunks into a single prompt and makes one
//! generation call. An empty retrieval short-circuits to a fixed fallback
//! without calling the generator at all. Each question is answered
//! independently; there is no conversation state.

use tracing::info;

use crate::engine::Engine;
use crate::error::Result;
use crate::models::ScoredChunk;

/// Returned when the index holds nothing relevant to ground an answer.
pub const NO_CONTEXT_FALLBACK: &str =
    "No relevant context found in the indexed documents. Ingest more documents and try again.";

pub(crate) async fn retrieve(
    engine: &Engine,
    question: &str,
    k: usize,
) -> Result<Vec<ScoredChunk>> {
    let query_vector = engine.embedder.embed_query(question).await?;
    engine.index.search(&query_vector, k).await
}

pub(crate) async fn answer(engine: &Engine, question: &str) -> Result<String> {
    let results = retrieve(engine, question, engine.config.retrieval.top_k).await?;

    if results.is_empty() {
        info!("no indexed context for question, returning fallback");
        return Ok(NO_CONTEXT_FALLBACK.to_string());
    }

    let context: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
    let prompt = build_prompt(&context.join("\n\n"), question);

    let response = engine.generator.generate(&prompt).await?;
    info!(chunks = results.len(), "generated answer");

    Ok(response.trim().to_string())
}

/// Assemble the single-shot prompt: role instruction, retrieved context,
/// question.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an ESG compliance expert.\n\
         Based on the following documents, answer this question precisely.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question:\n\
         {question}\n\
         \n\
         Provide a clear, well-structured explanation.\n"
    )
}
