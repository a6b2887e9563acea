//! SQLite-backed [`VectorStore`] implementation.
//!
//! Vectors live in the `vector_entries` table as little-endian `f32` BLOBs.
//! Similarity search loads candidate rows (narrowed in SQL by a
//! [`DocumentFilter`] when one is given) and scores them with brute-force
//! cosine similarity on the blocking thread pool.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use docqa_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use docqa_core::models::{Metadata, NewChunk, RetrievedChunk};
use docqa_core::store::{top_k, DocumentFilter, VectorStore};

/// SQLite implementation of the [`VectorStore`] trait.
pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Append `WHERE document_id IN (?, ?, …)` for a filter.
fn push_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: Option<&'a DocumentFilter>) {
    if let Some(filter) = filter {
        builder.push(" WHERE document_id IN (");
        let mut separated = builder.separated(", ");
        for id in filter.ids() {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");
    }
}

struct Candidate {
    id: String,
    text: String,
    metadata_json: String,
    embedding: Vec<u8>,
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn add_chunks(&self, chunks: Vec<NewChunk>) -> Result<Vec<String>> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(chunks.len());

        for chunk in &chunks {
            let id = Uuid::new_v4().to_string();
            let metadata_json = serde_json::to_string(&chunk.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO vector_entries (id, document_id, chunk_index, text, metadata_json, embedding)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(&chunk.document_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&metadata_json)
            .bind(vec_to_blob(&chunk.embedding))
            .execute(&mut *tx)
            .await?;
            ids.push(id);
        }

        tx.commit().await?;
        Ok(ids)
    }

    async fn similarity_search(
        &self,
        query_vec: &[f32],
        k: usize,
        filter: Option<&DocumentFilter>,
    ) -> Result<Vec<RetrievedChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, text, metadata_json, embedding FROM vector_entries");
        push_filter(&mut builder, filter);

        let rows = builder.build().fetch_all(&self.pool).await?;
        let candidates: Vec<Candidate> = rows
            .iter()
            .map(|row| Candidate {
                id: row.get("id"),
                text: row.get("text"),
                metadata_json: row.get("metadata_json"),
                embedding: row.get("embedding"),
            })
            .collect();

        let query_vec = query_vec.to_vec();
        let scored = tokio::task::spawn_blocking(move || -> Result<Vec<RetrievedChunk>> {
            let mut scored = Vec::with_capacity(candidates.len());
            for c in candidates {
                let metadata: Metadata = serde_json::from_str(&c.metadata_json)?;
                let score = cosine_similarity(&query_vec, &blob_to_vec(&c.embedding));
                scored.push(RetrievedChunk {
                    id: c.id,
                    text: c.text,
                    metadata,
                    score,
                });
            }
            Ok(top_k(scored, k))
        })
        .await??;

        Ok(scored)
    }

    async fn count(&self, filter: Option<&DocumentFilter>) -> Result<usize> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM vector_entries");
        push_filter(&mut builder, filter);
        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count as usize)
    }
}
