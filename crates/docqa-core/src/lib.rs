//! # docqa core
//!
//! Runtime-agnostic logic for docqa: data models, chunking, metadata
//! tagging, the vector store and collaborator traits, retrieval, prompt
//! construction and the two pipelines built from them.
//!
//! This crate contains no tokio runtime, sqlx, HTTP client, or filesystem
//! I/O. The `docqa` app crate supplies the concrete collaborators.
//!
//! ```text
//! ingest: text ─▶ Chunker ─▶ tag_chunk ─▶ EmbeddingProvider ─▶ VectorStore
//! query:  question ─▶ Retriever ─▶ build_prompt ─▶ AnswerGenerator ─▶ extract_answer
//! ```

pub mod chunk;
pub mod embedding;
pub mod generate;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod retrieve;
pub mod store;
pub mod tag;
