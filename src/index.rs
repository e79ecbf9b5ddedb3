//! Durable SQLite-backed vector index.
//!
//! Stores one row per embedding record: chunk text, provenance metadata,
//! and the vector as a little-endian f32 BLOB. The index is append-only —
//! records are never mutated in place — and cumulative across process
//! lifetimes. Search is an exact cosine-similarity scan over all records.
//!
//! The first inserted record establishes the index dimensionality (kept in
//! `index_meta`); every later vector must match it. Inserts run in a
//! single transaction, so a failed batch commits nothing.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use crate::error::{RagError, Result};
use crate::models::{Chunk, ScoredChunk};

/// Handle to the persisted vector index.
///
/// Open once per process and share; sqlx's pool serializes writes, and
/// readers may observe pre- or post-insert state while an insert runs.
pub struct VectorIndex {
    pool: SqlitePool,
}

impl VectorIndex {
    /// Open (creating if absent) the index at `path` and run migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| RagError::IndexUnavailable {
                    message: format!("cannot create {}: {}", parent.display(), e),
                })?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| RagError::IndexUnavailable {
                message: e.to_string(),
            })?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let index = Self { pool };
        index.migrate().await?;
        Ok(index)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                id TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                page INTEGER NOT NULL,
                page_offset INTEGER NOT NULL,
                text TEXT NOT NULL,
                hash TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_document ON records(document)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Append a batch of (chunk, vector) records in one transaction.
    ///
    /// Assigns each record a UUID and returns the count inserted. Fails
    /// `DimensionMismatch` — committing nothing — if any vector's length
    /// disagrees with the established dimensionality, or is zero.
    pub async fn insert(&self, records: &[(Chunk, Vec<f32>)]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let expected = match self.dims().await? {
            Some(d) => d,
            None => records[0].1.len(),
        };
        for (_, vector) in records {
            if vector.len() != expected || vector.is_empty() {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO index_meta (key, value) VALUES ('dims', ?)")
            .bind(expected.to_string())
            .execute(&mut *tx)
            .await?;

        // Another writer may have established the dimensionality first.
        let stored: String = sqlx::query_scalar("SELECT value FROM index_meta WHERE key = 'dims'")
            .fetch_one(&mut *tx)
            .await?;
        let stored: usize = stored.parse().unwrap_or(0);
        if stored != expected {
            return Err(RagError::DimensionMismatch {
                expected: stored,
                actual: expected,
            });
        }

        for (chunk, vector) in records {
            sqlx::query(
                r#"
                INSERT INTO records (id, document, page, page_offset, text, hash, embedding, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&chunk.document)
            .bind(chunk.page as i64)
            .bind(chunk.offset as i64)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .bind(vec_to_blob(vector))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(count = records.len(), dims = expected, "inserted records");
        Ok(records.len())
    }

    /// Return the `k` records most similar to `query`, best first.
    ///
    /// Exact ties order by ascending record id so results are stable
    /// across runs. Fewer than `k` records returns all of them; an empty
    /// index returns an empty Vec.
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT id, document, page, page_offset, text, hash, embedding FROM records",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<ScoredChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vector = blob_to_vec(&blob);
                let page: i64 = row.get("page");
                let offset: i64 = row.get("page_offset");
                ScoredChunk {
                    record_id: row.get("id"),
                    chunk: Chunk {
                        document: row.get("document"),
                        page: page as usize,
                        offset: offset as usize,
                        text: row.get("text"),
                        hash: row.get("hash"),
                    },
                    score: cosine_similarity(query, &vector),
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.record_id.cmp(&b.record_id))
        });
        scored.truncate(k);

        Ok(scored)
    }

    /// Dimensionality established by the first insert, if any.
    pub async fn dims(&self) -> Result<Option<usize>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM index_meta WHERE key = 'dims'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.and_then(|v| v.parse().ok()))
    }

    /// Total number of stored records.
    pub async fn count(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await?)
    }

    /// Number of distinct source documents.
    pub async fn document_count(&self) -> Result<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(DISTINCT document) FROM records")
                .fetch_one(&self.pool)
                .await?,
        )
    }

    /// Close the underlying pool. Only needed when reopening in-process.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Encode a float vector as a BLOB of little-endian f32 bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity between two vectors, in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
