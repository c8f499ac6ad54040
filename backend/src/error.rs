use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shared::ErrorResponse;
use thiserror::Error;

/// Error taxonomy surfaced by every service and repository.
///
/// Failed operations leave all entities unchanged; callers receive the
/// specific kind rather than a generic failure.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("insufficient funds in account {account_id}")]
    InsufficientFunds { account_id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("corrupt stored value: {0}")]
    Decode(String),
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Machine-readable kind used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::NotFound { .. } => "not_found",
            LedgerError::InvalidInput(_) => "invalid_input",
            LedgerError::InvalidState(_) => "invalid_state",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::Conflict(_) => "conflict",
            LedgerError::Storage(_) | LedgerError::Decode(_) => "storage",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            LedgerError::InvalidState(_) => StatusCode::CONFLICT,
            LedgerError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LedgerError::Conflict(_) => StatusCode::CONFLICT,
            LedgerError::Storage(_) | LedgerError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {self}");
        }
        let body = ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(LedgerError::not_found("account", "a1").kind(), "not_found");
        assert_eq!(
            LedgerError::InsufficientFunds {
                account_id: "a1".to_string()
            }
            .kind(),
            "insufficient_funds"
        );
        assert_eq!(
            LedgerError::InvalidState("already settled".to_string()).kind(),
            "invalid_state"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            LedgerError::not_found("user", "u1").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LedgerError::Conflict("duplicate email".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            LedgerError::InvalidInput("amount must be positive".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
