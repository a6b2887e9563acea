//! Question → nearest chunks.
//!
//! The [`Retriever`] embeds a question with the configured
//! [`EmbeddingProvider`] and issues a similarity query against a
//! [`VectorStore`], optionally restricted to a set of document ids.

use std::sync::Arc;

use anyhow::Result;

use crate::embedding::EmbeddingProvider;
use crate::models::RetrievedChunk;
use crate::store::{DocumentFilter, VectorStore};

/// Default number of chunks fed to the generator.
pub const DEFAULT_TOP_K: usize = 3;

/// Similarity retriever over an explicit store and embedder.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    /// Return up to `k` chunks nearest to `question`.
    ///
    /// With `filter`, only chunks of the listed documents are eligible.
    /// An empty store, or a filter matching nothing, yields an empty vector.
    pub async fn retrieve(
        &self,
        question: &str,
        filter: Option<&DocumentFilter>,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_vec = self.embedder.embed_query(question).await?;
        let hits = self.store.similarity_search(&query_vec, k, filter).await?;
        tracing::debug!(
            k,
            restricted_to = ?filter.map(|f| f.len()),
            hits = hits.len(),
            "similarity search complete"
        );
        Ok(hits)
    }
}
