//! Document-to-vector and question-to-answer pipelines.
//!
//! These functions wire the pure pieces ([`Chunker`], [`tag_chunk`],
//! [`build_prompt`], [`extract_answer`]) to the opaque collaborators
//! ([`EmbeddingProvider`], [`VectorStore`], [`AnswerGenerator`]). They hold
//! no state; relational bookkeeping is the caller's job.
//!
//! Failures from any collaborator propagate unchanged. There are no retries
//! and no partial-result recovery.

use anyhow::{bail, Result};
use serde::Serialize;

use crate::chunk::Chunker;
use crate::embedding::EmbeddingProvider;
use crate::generate::AnswerGenerator;
use crate::models::{Metadata, NewChunk, Source};
use crate::prompt::{build_prompt, extract_answer};
use crate::retrieve::Retriever;
use crate::store::{DocumentFilter, VectorStore};
use crate::tag::{ensure_document_id, tag_chunk};

/// Fixed answer returned when retrieval finds nothing.
pub const NO_RELEVANT_DOCUMENTS: &str = "No relevant documents found to answer your question.";

/// Outcome of indexing one document into the vector store.
#[derive(Debug, Clone)]
pub struct IndexedDocument {
    pub document_id: String,
    /// The chunk texts, in index order.
    pub chunks: Vec<String>,
    /// Store-assigned ids, parallel to `chunks`.
    pub vector_ids: Vec<String>,
}

/// Chunk, tag, embed and store one document.
///
/// `metadata` receives a minted `document_id` when it has none; the same id
/// is written into every chunk. Empty content stores nothing and returns an
/// empty chunk list.
pub async fn index_document(
    chunker: &Chunker,
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
    content: &str,
    metadata: &mut Metadata,
) -> Result<IndexedDocument> {
    let document_id = ensure_document_id(metadata);
    let texts = chunker.split(content);

    if texts.is_empty() {
        return Ok(IndexedDocument {
            document_id,
            chunks: Vec::new(),
            vector_ids: Vec::new(),
        });
    }

    let vectors = embedder.embed(&texts).await?;
    if vectors.len() != texts.len() {
        bail!(
            "embedding provider returned {} vectors for {} chunks",
            vectors.len(),
            texts.len()
        );
    }

    let new_chunks: Vec<NewChunk> = texts
        .iter()
        .zip(vectors)
        .enumerate()
        .map(|(i, (text, embedding))| NewChunk {
            document_id: document_id.clone(),
            chunk_index: i as i64,
            text: text.clone(),
            metadata: tag_chunk(metadata, i),
            embedding,
        })
        .collect();

    let vector_ids = store.add_chunks(new_chunks).await?;
    tracing::debug!(
        document_id = %document_id,
        chunks = texts.len(),
        model = embedder.model_name(),
        "document indexed"
    );

    Ok(IndexedDocument {
        document_id,
        chunks: texts,
        vector_ids,
    })
}

/// Answer plus the ordered chunk sources it was generated from.
#[derive(Debug, Clone, Serialize)]
pub struct QaAnswer {
    pub answer: String,
    pub sources: Vec<Source>,
}

impl QaAnswer {
    /// The defined response for a question with no matching chunks.
    pub fn no_relevant_documents() -> Self {
        Self {
            answer: NO_RELEVANT_DOCUMENTS.to_string(),
            sources: Vec::new(),
        }
    }
}

/// Retrieve, prompt, generate and extract.
pub async fn answer_question(
    retriever: &Retriever,
    generator: &dyn AnswerGenerator,
    question: &str,
    filter: Option<&DocumentFilter>,
    k: usize,
) -> Result<QaAnswer> {
    let hits = retriever.retrieve(question, filter, k).await?;
    if hits.is_empty() {
        return Ok(QaAnswer::no_relevant_documents());
    }

    let contexts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
    let prompt = build_prompt(&contexts, question);
    let output = generator.generate(&prompt).await?;

    let extraction = extract_answer(&output);
    if !extraction.marker_found {
        tracing::warn!(
            model = generator.model_name(),
            "generation output has no answer marker; returning raw output"
        );
    }

    Ok(QaAnswer {
        answer: extraction.answer,
        sources: hits.iter().map(|h| h.source()).collect(),
    })
}
