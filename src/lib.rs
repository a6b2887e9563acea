//! # docqa
//!
//! A minimal retrieval-augmented question-answering backend. Users submit
//! documents; docqa chunks and embeds them into a vector store and answers
//! later questions from the most similar chunks.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────┐   ┌──────────────────┐
//! │ HTTP/CLI │──▶│ ingest / qa       │──▶│ SQLite           │
//! │          │   │ chunk+tag+embed   │   │ catalog + vectors│
//! └──────────┘   │ retrieve+generate │   └──────────────────┘
//!                └───────────────────┘
//! ```
//!
//! The pure pipeline (chunking, tagging, retrieval, prompt construction)
//! lives in `docqa-core`; this crate supplies configuration, SQLite
//! persistence, network providers, the HTTP API and the CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`catalog`] | Users, documents, chunk records, selections |
//! | [`vector_store`] | SQLite-backed vector store |
//! | [`embedding`] | Embedding providers |
//! | [`generation`] | Answer generators |
//! | [`context`] | Collaborators built once at startup |
//! | [`ingest`] | Document ingestion |
//! | [`qa`] | Question answering and document selection |
//! | [`server`] | HTTP API |

pub mod catalog;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod qa;
pub mod server;
pub mod vector_store;
