//! Vector storage abstraction for docqa.
//!
//! The [`VectorStore`] trait defines the two operations the pipeline needs
//! from a vector database: persisting tagged, embedded chunks and answering
//! nearest-neighbour queries, optionally restricted by a [`DocumentFilter`].
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::collections::BTreeSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Metadata, NewChunk, RetrievedChunk, DOCUMENT_ID_KEY};

/// Restricts a similarity query to chunks whose `document_id` metadata is a
/// member of a non-empty id set.
///
/// This is the only filter shape the pipeline supports. Stores translate it
/// to their own query language via [`ids`](DocumentFilter::ids) or test
/// candidates with [`matches`](DocumentFilter::matches).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFilter {
    ids: BTreeSet<String>,
}

impl DocumentFilter {
    /// Build a filter from a list of document ids.
    ///
    /// Returns `None` for an empty list: no ids means an unrestricted query.
    pub fn from_ids<I, S>(ids: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: BTreeSet<String> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            None
        } else {
            Some(Self { ids })
        }
    }

    /// Document ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, document_id: &str) -> bool {
        self.ids.contains(document_id)
    }

    /// Whether a chunk's metadata satisfies the membership predicate.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        metadata
            .get(DOCUMENT_ID_KEY)
            .and_then(|v| v.as_str())
            .is_some_and(|id| self.contains(id))
    }
}

/// Abstract vector storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`add_chunks`](VectorStore::add_chunks) | Persist embedded chunks, returning assigned ids |
/// | [`similarity_search`](VectorStore::similarity_search) | Top-k nearest chunks, optionally filtered |
/// | [`count`](VectorStore::count) | Number of stored chunks matching a filter |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Persist chunks and return one store-assigned id per chunk, in order.
    async fn add_chunks(&self, chunks: Vec<NewChunk>) -> Result<Vec<String>>;

    /// Return at most `k` chunks ordered by descending cosine similarity to
    /// `query_vec`. With a filter, only chunks whose `document_id` is in the
    /// filter's set are considered.
    async fn similarity_search(
        &self,
        query_vec: &[f32],
        k: usize,
        filter: Option<&DocumentFilter>,
    ) -> Result<Vec<RetrievedChunk>>;

    /// Count stored chunks, optionally restricted by a filter.
    async fn count(&self, filter: Option<&DocumentFilter>) -> Result<usize>;
}

/// Sort candidates by descending score and keep the best `k`.
///
/// Shared by store implementations that score in application code.
pub fn top_k(mut candidates: Vec<RetrievedChunk>, k: usize) -> Vec<RetrievedChunk> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(k);
    candidates
}
