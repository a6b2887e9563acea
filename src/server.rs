//! HTTP API server.
//!
//! Exposes user registration, document ingestion, question answering and
//! document selection as a JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/users` | Register a user |
//! | `POST` | `/documents` | Ingest one document |
//! | `POST` | `/documents/batch` | Ingest several documents sequentially |
//! | `GET`  | `/documents/{id}` | Document summary with chunk count |
//! | `POST` | `/qa` | Answer a question, optionally restricted to documents |
//! | `POST` | `/documents/select` | Validate (and optionally record) a selection |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! The `POST` routes also answer on their trailing-slash form.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "Documents not found: a, b" } }
//! ```
//!
//! Error codes: `bad_request` (400, including malformed JSON bodies),
//! `not_found` (404), `conflict` (409), `internal` (500).

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use docqa_core::pipeline::QaAnswer;

use crate::catalog::{self, DocumentSummary, User};
use crate::context::AppContext;
use crate::error::ServiceError;
use crate::ingest::{ingest_batch, ingest_document, IngestOutcome, IngestRequest};
use crate::qa::{ask, select_documents, QuestionRequest, SelectionOutcome, SelectionRequest};

/// Build the router over a ready [`AppContext`].
pub fn router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/users", post(handle_create_user))
        .route("/users/", post(handle_create_user))
        .route("/documents", post(handle_ingest))
        .route("/documents/", post(handle_ingest))
        .route("/documents/batch", post(handle_ingest_batch))
        .route("/documents/select", post(handle_select))
        .route("/documents/select/", post(handle_select))
        .route("/documents/{id}", get(handle_get_document))
        .route("/qa", post(handle_qa))
        .route("/qa/", post(handle_qa))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}

/// Bind to `bind` and serve until the process is terminated.
pub async fn run_server(ctx: AppContext, bind: &str) -> anyhow::Result<()> {
    let app = router(ctx);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %bind, "docqa server listening");
    println!("docqa server listening on http://{}", bind);
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: rejection.body_text(),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::DocumentsNotFound(_) => not_found(err.to_string()),
            ServiceError::Invalid(message) => AppError {
                status: StatusCode::BAD_REQUEST,
                code: "bad_request",
                message,
            },
            ServiceError::Conflict(message) => AppError {
                status: StatusCode::CONFLICT,
                code: "conflict",
                message,
            },
            ServiceError::Internal(e) => {
                let message = format!("{:#}", e);
                tracing::error!(error = %message, "request failed");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal",
                    message,
                }
            }
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /users ============

#[derive(Deserialize)]
struct CreateUserRequest {
    username: String,
    email: String,
}

async fn handle_create_user(
    State(ctx): State<AppContext>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let Json(req) = body?;
    if req.username.trim().is_empty() || req.email.trim().is_empty() {
        return Err(ServiceError::Invalid("username and email must not be empty".into()).into());
    }
    let user = catalog::create_user(&ctx.pool, &req.username, &req.email).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

// ============ POST /documents ============

#[derive(Serialize)]
struct IngestResponse {
    status: &'static str,
    #[serde(flatten)]
    outcome: IngestOutcome,
}

async fn handle_ingest(
    State(ctx): State<AppContext>,
    body: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestResponse>), AppError> {
    let Json(req) = body?;
    let outcome = ingest_document(&ctx, &req).await?;
    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            status: "success",
            outcome,
        }),
    ))
}

// ============ POST /documents/batch ============

#[derive(Deserialize)]
struct BatchRequest {
    documents: Vec<IngestRequest>,
}

#[derive(Serialize)]
struct BatchResponse {
    status: &'static str,
    results: Vec<IngestOutcome>,
}

async fn handle_ingest_batch(
    State(ctx): State<AppContext>,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BatchResponse>), AppError> {
    let Json(req) = body?;
    let results = ingest_batch(&ctx, &req.documents).await?;
    Ok((
        StatusCode::CREATED,
        Json(BatchResponse {
            status: "success",
            results,
        }),
    ))
}

// ============ GET /documents/{id} ============

async fn handle_get_document(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<DocumentSummary>, AppError> {
    let summary = catalog::get_document_summary(&ctx.pool, &id)
        .await
        .map_err(|e| ServiceError::internal("document lookup", e))?
        .ok_or_else(|| ServiceError::DocumentsNotFound(vec![id]))?;
    Ok(Json(summary))
}

// ============ POST /qa ============

async fn handle_qa(
    State(ctx): State<AppContext>,
    body: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<QaAnswer>, AppError> {
    let Json(req) = body?;
    Ok(Json(ask(&ctx, &req).await?))
}

// ============ POST /documents/select ============

async fn handle_select(
    State(ctx): State<AppContext>,
    body: Result<Json<SelectionRequest>, JsonRejection>,
) -> Result<Json<SelectionOutcome>, AppError> {
    let Json(req) = body?;
    Ok(Json(select_documents(&ctx, &req).await?))
}
