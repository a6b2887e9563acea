use thiserror::Error;

/// Failures surfaced by the service operations shared by the HTTP API and
/// the CLI.
///
/// `Internal` wraps collaborator failures (database, embedding, vector
/// store, generation) with the underlying message attached; format it with
/// `{:#}` to include the whole context chain.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Documents not found: {}", .0.join(", "))]
    DocumentsNotFound(Vec<String>),
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    /// Wrap a collaborator failure under an operation-level message, e.g.
    /// `Error during question answering: <cause>`.
    pub fn internal(operation: &str, err: anyhow::Error) -> Self {
        ServiceError::Internal(err.context(format!("Error during {}", operation)))
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
