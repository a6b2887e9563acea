//! Question answering and document selection.

use serde::{Deserialize, Serialize};

use docqa_core::pipeline::{answer_question, QaAnswer};
use docqa_core::store::DocumentFilter;

use crate::catalog;
use crate::context::AppContext;
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
    /// Restrict retrieval to these documents. Absent or empty means all.
    #[serde(default)]
    pub document_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectionRequest {
    pub document_ids: Vec<String>,
    /// When present, the selection is recorded for this user.
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionOutcome {
    pub status: &'static str,
    pub selected_documents: Vec<String>,
}

/// Answer `request.question` from retrieved chunks.
///
/// Unknown ids in `document_ids` are not an error: they simply match no
/// chunks, and a filter matching nothing yields the fixed no-documents answer.
pub async fn ask(ctx: &AppContext, request: &QuestionRequest) -> ServiceResult<QaAnswer> {
    if request.question.trim().is_empty() {
        return Err(ServiceError::Invalid("question must not be empty".to_string()));
    }

    let filter = request
        .document_ids
        .as_ref()
        .and_then(|ids| DocumentFilter::from_ids(ids.iter().cloned()));

    answer_question(
        &ctx.retriever,
        ctx.generator.as_ref(),
        &request.question,
        filter.as_ref(),
        ctx.top_k,
    )
    .await
    .map_err(|e| ServiceError::internal("question answering", e))
}

/// Validate that every id names an existing document and, with a user id,
/// record the selection. Nothing is recorded when any id is missing or the
/// user is unknown.
pub async fn select_documents(
    ctx: &AppContext,
    request: &SelectionRequest,
) -> ServiceResult<SelectionOutcome> {
    if request.document_ids.is_empty() {
        return Err(ServiceError::Invalid(
            "document_ids must not be empty".to_string(),
        ));
    }

    let missing = catalog::find_missing_documents(&ctx.pool, &request.document_ids)
        .await
        .map_err(|e| ServiceError::internal("document selection", e))?;
    if !missing.is_empty() {
        return Err(ServiceError::DocumentsNotFound(missing));
    }

    if let Some(user_id) = &request.user_id {
        let user_known = catalog::user_exists(&ctx.pool, user_id)
            .await
            .map_err(|e| ServiceError::internal("document selection", e))?;
        if !user_known {
            return Err(ServiceError::Invalid(format!("unknown user_id: {}", user_id)));
        }
        catalog::record_selection(&ctx.pool, user_id, &request.document_ids)
            .await
            .map_err(|e| ServiceError::internal("document selection", e))?;
        tracing::info!(user_id = %user_id, count = request.document_ids.len(), "selection recorded");
    }

    Ok(SelectionOutcome {
        status: "success",
        selected_documents: request.document_ids.clone(),
    })
}

/// CLI entry point for `docqa ask`.
pub async fn run_ask(ctx: &AppContext, question: String, docs: Vec<String>) -> anyhow::Result<()> {
    let request = QuestionRequest {
        question,
        document_ids: Some(docs),
    };
    let answer = ask(ctx, &request)
        .await
        .map_err(|e| anyhow::anyhow!("{:#}", e))?;

    println!("{}", answer.answer);
    if !answer.sources.is_empty() {
        println!();
        println!("Sources:");
        for source in &answer.sources {
            println!(
                "  - {} (document {}, chunk {})",
                plain(&source.title),
                plain(&source.document_id),
                source.chunk_id
            );
        }
    }
    Ok(())
}

fn plain(value: &serde_json::Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

/// CLI entry point for `docqa select`.
pub async fn run_select(
    ctx: &AppContext,
    document_ids: Vec<String>,
    user_id: Option<String>,
) -> anyhow::Result<()> {
    let request = SelectionRequest {
        document_ids,
        user_id,
    };
    let outcome = select_documents(ctx, &request)
        .await
        .map_err(|e| anyhow::anyhow!("{:#}", e))?;
    println!("selected: {}", outcome.selected_documents.join(", "));
    Ok(())
}
