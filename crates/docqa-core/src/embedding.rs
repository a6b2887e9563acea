//! The embedder seam, plus the vector helpers shared by both stores.
//!
//! Vectors are persisted as little-endian `f32` blobs and compared with
//! cosine similarity; higher means more similar.
//!
//! Concrete network-backed providers (OpenAI, Ollama, fastembed) live in the
//! `docqa` app crate. [`HashEmbedder`] is a deterministic, dependency-free
//! provider used offline and in tests.

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Turns text into fixed-width vectors.
///
/// A provider is constructed once at startup and shared behind an `Arc`
/// by every pipeline invocation.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier recorded with every stored vector.
    fn model_name(&self) -> &str;
    /// Width of every vector this provider returns.
    fn dims(&self) -> usize;

    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed one question. Providers with distinct query encoders override this.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Embedder returned no vector for the query"))
    }
}

/// Feature-hashing embedder: each lowercase word is hashed into one of
/// `dims` buckets and the resulting count vector is L2-normalized.
///
/// Texts that share words get a positive cosine similarity, which is enough
/// for offline use and deterministic tests.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let digest = Sha256::digest(word.to_lowercase().as_bytes());
            let bucket = u64::from_le_bytes([
                digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6],
                digest[7],
            ]) as usize
                % self.dims;
            v[bucket] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash"
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Pack a vector into the blob stored in `vector_entries.embedding`.
///
/// # Example
///
/// ```rust
/// use docqa_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let query = vec![0.5f32, -1.0, 0.25, 2.0];
/// let stored = vec_to_blob(&query);
/// assert_eq!(stored.len(), 16);
/// assert_eq!(blob_to_vec(&stored), query);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Inverse of [`vec_to_blob`]. Trailing bytes short of a full `f32` are dropped.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`. Mismatched widths, empty input and
/// zero vectors all score `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, sq_a, sq_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(d, na, nb), (x, y)| {
            (d + x * y, na + x * x, nb + y * y)
        });

    let denom = sq_a.sqrt() * sq_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
