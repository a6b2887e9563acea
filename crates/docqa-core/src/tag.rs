//! Chunk metadata tagging.
//!
//! Every chunk written to the vector store carries the caller's metadata
//! plus its position (`chunk_id`) and the owning `document_id`. The document
//! id is minted once per document by [`ensure_document_id`] and then copied
//! into every chunk by [`tag_chunk`].

use serde_json::Value;
use uuid::Uuid;

use crate::models::{Metadata, CHUNK_ID_KEY, DOCUMENT_ID_KEY};

/// Return a copy of `base` with `chunk_id` set to `index`.
///
/// `base` is never mutated. Every other key passes through unchanged; a
/// `chunk_id` already present in `base` is overwritten in the copy.
pub fn tag_chunk(base: &Metadata, index: usize) -> Metadata {
    let mut tagged = base.clone();
    tagged.insert(CHUNK_ID_KEY.to_string(), Value::from(index as u64));
    tagged
}

/// Make sure `metadata` carries a `document_id`, minting a UUID v4 when it
/// is absent, null, or an empty string. Returns the id in effect.
///
/// Call once per document, before tagging its chunks.
pub fn ensure_document_id(metadata: &mut Metadata) -> String {
    if let Some(Value::String(existing)) = metadata.get(DOCUMENT_ID_KEY) {
        if !existing.is_empty() {
            return existing.clone();
        }
    }
    let id = Uuid::new_v4().to_string();
    metadata.insert(DOCUMENT_ID_KEY.to_string(), Value::String(id.clone()));
    id
}
