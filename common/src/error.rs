use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

/// Failure taxonomy shared by the ledger, the orchestrator and the
/// reconciler. The `ResponseError` impl is what the HTTP handlers rely on.
#[derive(Debug, Error)]
pub enum VtuError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Insufficient balance")]
    InsufficientFunds,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Provider error: {0}")]
    Provider(String),

    /// Money moved but a compensating write could not be applied. Always
    /// logged at error level and queued for background retry, never folded
    /// into a normal response.
    #[error("Wallet consistency fault: {0}")]
    Consistency(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ResponseError for VtuError {
    fn status_code(&self) -> StatusCode {
        match self {
            VtuError::InvalidRequest(_) | VtuError::InsufficientFunds => StatusCode::BAD_REQUEST,
            VtuError::Unauthorized => StatusCode::UNAUTHORIZED,
            VtuError::NotFound(_) => StatusCode::NOT_FOUND,
            VtuError::Provider(_) => StatusCode::BAD_GATEWAY,
            VtuError::Consistency(_) | VtuError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Internal faults are logged in full but answered generically.
        // Provider failures keep their detail, callers need it to retry.
        let body = match self {
            VtuError::Consistency(_) | VtuError::Database(_) => {
                log::error!("Request failed: {self}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": body }))
    }
}
