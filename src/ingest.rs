//! Document ingestion.
//!
//! ```text
//! request ─▶ validate ─▶ index_document (chunk, tag, embed, vector write)
//!                      ─▶ catalog::insert_document (one SQL transaction)
//! ```
//!
//! Unknown users and caller-supplied document ids that are already taken
//! are rejected before anything is written.
//!
//! Vector entries are written before the relational rows. When the
//! relational transaction fails, the vector entries stay behind as orphans;
//! that is logged at `error` level and not remediated.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use docqa_core::models::{Metadata, TITLE_KEY, USER_ID_KEY};
use docqa_core::pipeline::index_document;
use docqa_core::tag::ensure_document_id;

use crate::catalog::{self, ChunkRecord};
use crate::context::AppContext;
use crate::error::{ServiceError, ServiceResult};

const OPERATION: &str = "document ingestion";

/// One document to ingest.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    pub title: String,
    pub content: String,
    pub user_id: String,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub document_id: String,
    pub chunks_processed: usize,
    pub vector_ids: Vec<String>,
}

/// Base chunk metadata: title and user id first, then the caller's keys,
/// which win on collision.
fn base_metadata(request: &IngestRequest) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(TITLE_KEY.to_string(), Value::from(request.title.clone()));
    metadata.insert(USER_ID_KEY.to_string(), Value::from(request.user_id.clone()));
    for (k, v) in &request.metadata {
        metadata.insert(k.clone(), v.clone());
    }
    metadata
}

fn validate(request: &IngestRequest) -> ServiceResult<()> {
    if request.title.trim().is_empty() {
        return Err(ServiceError::Invalid("title must not be empty".to_string()));
    }
    if request.content.is_empty() {
        return Err(ServiceError::Invalid("content must not be empty".to_string()));
    }
    if request.user_id.trim().is_empty() {
        return Err(ServiceError::Invalid("user_id must not be empty".to_string()));
    }
    Ok(())
}

/// Ingest one document into both stores.
pub async fn ingest_document(
    ctx: &AppContext,
    request: &IngestRequest,
) -> ServiceResult<IngestOutcome> {
    validate(request)?;

    let user_known = catalog::user_exists(&ctx.pool, &request.user_id)
        .await
        .map_err(|e| ServiceError::internal(OPERATION, e))?;
    if !user_known {
        return Err(ServiceError::Invalid(format!(
            "unknown user_id: {}",
            request.user_id
        )));
    }

    // A caller-chosen id that already names a document would file this
    // content's vectors under the existing document.
    let mut metadata = base_metadata(request);
    let document_id = ensure_document_id(&mut metadata);
    let taken = catalog::document_exists(&ctx.pool, &document_id)
        .await
        .map_err(|e| ServiceError::internal(OPERATION, e))?;
    if taken {
        return Err(ServiceError::Conflict(format!(
            "document_id already exists: {}",
            document_id
        )));
    }

    let indexed = index_document(
        &ctx.chunker,
        ctx.embedder.as_ref(),
        ctx.store.as_ref(),
        &request.content,
        &mut metadata,
    )
    .await
    .map_err(|e| ServiceError::internal(OPERATION, e))?;

    let records: Vec<ChunkRecord> = indexed
        .vector_ids
        .iter()
        .zip(&indexed.chunks)
        .enumerate()
        .map(|(i, (id, text))| ChunkRecord {
            id: id.clone(),
            chunk_index: i as i64,
            content: text.clone(),
        })
        .collect();

    if let Err(e) = catalog::insert_document(
        &ctx.pool,
        &indexed.document_id,
        &request.title,
        &request.user_id,
        &records,
    )
    .await
    {
        tracing::error!(
            document_id = %indexed.document_id,
            orphaned_vectors = indexed.vector_ids.len(),
            error = %e,
            "relational write failed after vector write; vector entries orphaned"
        );
        return Err(ServiceError::internal(
            OPERATION,
            e.context("Database error"),
        ));
    }

    tracing::info!(
        document_id = %indexed.document_id,
        chunks = indexed.chunks.len(),
        "document ingested"
    );

    Ok(IngestOutcome {
        document_id: indexed.document_id,
        chunks_processed: indexed.vector_ids.len(),
        vector_ids: indexed.vector_ids,
    })
}

/// Ingest documents one after another. The first failure aborts the batch;
/// documents ingested before it stay ingested.
pub async fn ingest_batch(
    ctx: &AppContext,
    requests: &[IngestRequest],
) -> ServiceResult<Vec<IngestOutcome>> {
    if requests.is_empty() {
        return Err(ServiceError::Invalid("documents must not be empty".to_string()));
    }
    let mut outcomes = Vec::with_capacity(requests.len());
    for (position, request) in requests.iter().enumerate() {
        let outcome = ingest_document(ctx, request).await.inspect_err(|e| {
            tracing::warn!(position, completed = outcomes.len(), error = %e, "batch aborted");
        })?;
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

/// CLI entry point: `docqa ingest <file> --title <t> --user <id> [--meta k=v]…`.
pub async fn run_ingest(
    ctx: &AppContext,
    file: &Path,
    title: Option<String>,
    user_id: String,
    meta: Vec<(String, String)>,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file.display(), e))?;
    let title = title.unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| file.display().to_string())
    });
    let metadata: Metadata = meta
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    let request = IngestRequest {
        title,
        content,
        user_id,
        metadata,
    };
    let outcome = ingest_document(ctx, &request)
        .await
        .map_err(|e| anyhow::anyhow!("{:#}", e))?;

    println!("document_id: {}", outcome.document_id);
    println!("chunks processed: {}", outcome.chunks_processed);
    Ok(())
}
