//! SQLite-backed vector index.
//!
//! Chunks and their embeddings are stored in one table; cosine similarity is
//! computed in Rust over a full scan. That keeps the store dependency-free
//! beyond SQLite itself and is adequate for a few hundred thousand chunks.

use super::{cosine_similarity, rank_by_score, EmbeddedChunk, VectorIndex};
use crate::error::{Result, VidragError};
use crate::retrieval::{Chunk, ScoreKind, ScoredCandidate, StartTime};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        source_id TEXT NOT NULL,
        text TEXT NOT NULL,
        start_seconds REAL,
        start_label TEXT,
        page INTEGER,
        chunk_index INTEGER NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_source_id ON chunks(source_id);
"#;

const SELECT_COLUMNS: &str =
    "SELECT id, source_id, text, start_seconds, start_label, page, chunk_index, embedding FROM chunks";

/// SQLite-based vector index.
pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
}

impl SqliteVectorIndex {
    /// Open (or create) a vector index at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL lets searches proceed while an ingest transaction is open
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector index at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector index (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| VidragError::Index(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<EmbeddedChunk> {
        let id_str: String = row.get(0)?;
        let id = Uuid::parse_str(&id_str)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

        let start_seconds: Option<f64> = row.get(3)?;
        let start_label: Option<String> = row.get(4)?;
        let start_time = match (start_seconds, start_label) {
            (Some(secs), _) => Some(StartTime::Seconds(secs)),
            (None, Some(label)) => Some(StartTime::Label(label)),
            (None, None) => None,
        };

        let embedding_bytes: Vec<u8> = row.get(7)?;

        Ok(EmbeddedChunk {
            chunk: Chunk {
                id,
                source_id: row.get(1)?,
                text: row.get(2)?,
                start_time,
                page: row.get(5)?,
                chunk_index: row.get(6)?,
            },
            embedding: Self::bytes_to_embedding(&embedding_bytes),
        })
    }

    fn load_entries(conn: &Connection) -> Result<Vec<EmbeddedChunk>> {
        let mut stmt = conn.prepare(&format!("{} ORDER BY source_id, chunk_index", SELECT_COLUMNS))?;
        let rows = stmt.query_map([], Self::row_to_entry)?;
        let entries = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn upsert_batch(&self, entries: &[EmbeddedChunk]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let indexed_at = Utc::now().to_rfc3339();

        for entry in entries {
            let chunk = &entry.chunk;
            let (start_seconds, start_label) = match &chunk.start_time {
                Some(StartTime::Seconds(secs)) => (Some(*secs), None),
                Some(StartTime::Label(label)) => (None, Some(label.as_str())),
                None => (None, None),
            };

            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunks
                (id, source_id, text, start_seconds, start_label, page, chunk_index, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    chunk.id.to_string(),
                    chunk.source_id,
                    chunk.text,
                    start_seconds,
                    start_label,
                    chunk.page,
                    chunk.chunk_index,
                    Self::embedding_to_bytes(&entry.embedding),
                    indexed_at,
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch upserted {} chunks", entries.len());
        Ok(entries.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredCandidate>> {
        let conn = self.lock()?;
        let entries = Self::load_entries(&conn)?;

        let results: Vec<ScoredCandidate> = entries
            .into_iter()
            .map(|entry| {
                let score = cosine_similarity(query_embedding, &entry.embedding);
                ScoredCandidate::new(entry.chunk, score, ScoreKind::Cosine)
            })
            .collect();

        let results = rank_by_score(results, limit);
        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn delete(&self, ids: &[Uuid]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let mut deleted = 0;
        for id in ids {
            deleted += tx.execute("DELETE FROM chunks WHERE id = ?1", params![id.to_string()])?;
        }

        tx.commit()?;
        info!("Deleted {} chunks", deleted);
        Ok(deleted)
    }

    async fn chunks(&self) -> Result<Vec<Chunk>> {
        let conn = self.lock()?;
        Ok(Self::load_entries(&conn)?
            .into_iter()
            .map(|entry| entry.chunk)
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_vector_index() {
        let index = SqliteVectorIndex::in_memory().unwrap();

        let chunk = Chunk::new("video1", "This is test content", 0)
            .with_start_seconds(42.0)
            .with_page(3);
        let entry = EmbeddedChunk {
            chunk: chunk.clone(),
            embedding: vec![1.0, 0.0, 0.0],
        };

        index.upsert_batch(&[entry]).await.unwrap();
        assert_eq!(index.len().await.unwrap(), 1);

        let results = index.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert_eq!(results[0].chunk, chunk);

        let deleted = index.delete(&[chunk.id]).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(index.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_label_start_time_round_trips() {
        let index = SqliteVectorIndex::in_memory().unwrap();
        let chunk = Chunk::new("doc", "labelled", 0)
            .with_start_time(Some(StartTime::Label("intro".to_string())));

        index
            .upsert_batch(&[EmbeddedChunk {
                chunk: chunk.clone(),
                embedding: vec![0.5, 0.5],
            }])
            .await
            .unwrap();

        let chunks = index.chunks().await.unwrap();
        assert_eq!(chunks, vec![chunk]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.db");

        let chunk = Chunk::new("video1", "persisted", 0);
        {
            let index = SqliteVectorIndex::new(&path).unwrap();
            index
                .upsert_batch(&[EmbeddedChunk {
                    chunk: chunk.clone(),
                    embedding: vec![0.0, 1.0],
                }])
                .await
                .unwrap();
        }

        let reopened = SqliteVectorIndex::new(&path).unwrap();
        let ids = reopened.chunk_ids().await.unwrap();
        assert!(ids.contains(&chunk.id));
    }
}
