//! In-memory [`VectorStore`] implementation for testing and embedding in
//! other processes.
//!
//! Uses a `Vec` behind `std::sync::RwLock`. Similarity search is brute-force
//! cosine similarity over all stored vectors.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::embedding::cosine_similarity;
use crate::models::{Metadata, NewChunk, RetrievedChunk};

use super::{top_k, DocumentFilter, VectorStore};

struct StoredEntry {
    id: String,
    text: String,
    metadata: Metadata,
    vector: Vec<f32>,
}

/// In-memory vector store.
pub struct InMemoryVectorStore {
    entries: RwLock<Vec<StoredEntry>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory vector store lock poisoned")
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add_chunks(&self, chunks: Vec<NewChunk>) -> Result<Vec<String>> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        let mut ids = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let id = Uuid::new_v4().to_string();
            entries.push(StoredEntry {
                id: id.clone(),
                text: chunk.text,
                metadata: chunk.metadata,
                vector: chunk.embedding,
            });
            ids.push(id);
        }
        Ok(ids)
    }

    async fn similarity_search(
        &self,
        query_vec: &[f32],
        k: usize,
        filter: Option<&DocumentFilter>,
    ) -> Result<Vec<RetrievedChunk>> {
        let entries = self.entries.read().map_err(poisoned)?;
        let candidates: Vec<RetrievedChunk> = entries
            .iter()
            .filter(|e| filter.map_or(true, |f| f.matches(&e.metadata)))
            .map(|e| RetrievedChunk {
                id: e.id.clone(),
                text: e.text.clone(),
                metadata: e.metadata.clone(),
                score: cosine_similarity(query_vec, &e.vector),
            })
            .collect();
        Ok(top_k(candidates, k))
    }

    async fn count(&self, filter: Option<&DocumentFilter>) -> Result<usize> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries
            .iter()
            .filter(|e| filter.map_or(true, |f| f.matches(&e.metadata)))
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DOCUMENT_ID_KEY;
    use serde_json::json;

    fn chunk(doc: &str, index: i64, vector: Vec<f32>) -> NewChunk {
        let mut metadata = Metadata::new();
        metadata.insert(DOCUMENT_ID_KEY.into(), json!(doc));
        NewChunk {
            document_id: doc.into(),
            chunk_index: index,
            text: format!("{} #{}", doc, index),
            metadata,
            embedding: vector,
        }
    }

    #[tokio::test]
    async fn test_add_returns_one_id_per_chunk() {
        let store = InMemoryVectorStore::new();
        let ids = store
            .add_chunks(vec![chunk("d1", 0, vec![1.0, 0.0]), chunk("d1", 1, vec![0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(store.count(None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_search_empty_store() {
        let store = InMemoryVectorStore::new();
        let hits = store.similarity_search(&[1.0, 0.0], 3, None).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_search_ranks_and_filters() {
        let store = InMemoryVectorStore::new();
        store
            .add_chunks(vec![
                chunk("d1", 0, vec![1.0, 0.0]),
                chunk("d2", 0, vec![0.9, 0.1]),
                chunk("d3", 0, vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let hits = store.similarity_search(&[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document_id(), Some("d1"));
        assert_eq!(hits[1].document_id(), Some("d2"));

        let filter = DocumentFilter::from_ids(["d2", "d3"]).unwrap();
        let hits = store
            .similarity_search(&[1.0, 0.0], 10, Some(&filter))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| filter.matches(&h.metadata)));
        assert_eq!(hits[0].document_id(), Some("d2"));
        assert_eq!(store.count(Some(&filter)).await.unwrap(), 2);
    }
}
