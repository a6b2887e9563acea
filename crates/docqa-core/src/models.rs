//! Core data models used throughout docqa.
//!
//! These types represent the chunks, metadata and retrieval results that flow
//! through the ingestion and question-answering pipeline. Relational rows
//! (users, documents, selections) live in the application crate.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arbitrary caller-supplied key/value metadata attached to every chunk.
pub type Metadata = Map<String, Value>;

/// Metadata key carrying the owning document's identifier.
pub const DOCUMENT_ID_KEY: &str = "document_id";

/// Metadata key carrying the zero-based chunk position within its document.
pub const CHUNK_ID_KEY: &str = "chunk_id";

/// Metadata key carrying the document title.
pub const TITLE_KEY: &str = "title";

/// Metadata key carrying the owning user's identifier.
pub const USER_ID_KEY: &str = "user_id";

/// A chunk ready to be written to a vector store: text, tagged metadata and
/// its embedding vector.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

/// A chunk returned from a similarity query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Vector-store-assigned identifier.
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    /// Cosine similarity against the query vector (higher = closer).
    pub score: f32,
}

impl RetrievedChunk {
    /// The `document_id` metadata field, if present as a string.
    pub fn document_id(&self) -> Option<&str> {
        self.metadata.get(DOCUMENT_ID_KEY).and_then(Value::as_str)
    }

    /// Build the source reference reported alongside an answer.
    pub fn source(&self) -> Source {
        Source {
            document_id: self.metadata.get(DOCUMENT_ID_KEY).cloned().unwrap_or(Value::Null),
            title: self.metadata.get(TITLE_KEY).cloned().unwrap_or(Value::Null),
            chunk_id: self.metadata.get(CHUNK_ID_KEY).cloned().unwrap_or(Value::Null),
        }
    }
}

/// One entry of the ordered source list returned with an answer.
///
/// Fields are copied verbatim from chunk metadata; missing keys serialize as
/// `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub document_id: Value,
    pub title: Value,
    pub chunk_id: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_copies_metadata_fields() {
        let mut metadata = Metadata::new();
        metadata.insert(DOCUMENT_ID_KEY.into(), json!("doc-1"));
        metadata.insert(TITLE_KEY.into(), json!("Handbook"));
        metadata.insert(CHUNK_ID_KEY.into(), json!(2));
        let chunk = RetrievedChunk {
            id: "v1".into(),
            text: "text".into(),
            metadata,
            score: 0.5,
        };
        assert_eq!(chunk.document_id(), Some("doc-1"));
        assert_eq!(
            chunk.source(),
            Source {
                document_id: json!("doc-1"),
                title: json!("Handbook"),
                chunk_id: json!(2),
            }
        );
    }

    #[test]
    fn test_source_missing_fields_are_null() {
        let chunk = RetrievedChunk {
            id: "v1".into(),
            text: "text".into(),
            metadata: Metadata::new(),
            score: 0.0,
        };
        let source = chunk.source();
        assert!(source.document_id.is_null());
        assert!(source.title.is_null());
        assert!(source.chunk_id.is_null());
    }
}
