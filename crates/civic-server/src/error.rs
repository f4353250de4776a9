use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use civic_shared::TransitionError;
use civic_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Authentication(String),

    #[error("Forbidden: {0}")]
    Authorization(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    /// A collaborator (the store, a blocking task) failed.  The cause is
    /// logged; clients only see a generic message.
    #[error("Internal error: {0}")]
    Dependency(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ServerError::Authorization(_) => StatusCode::FORBIDDEN,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::Dependency(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert a store failure, naming the missing record for 404s.
    pub fn from_store(what: &'static str, e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ServerError::NotFound(what),
            other => other.into(),
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ServerError::NotFound("Record"),
            StoreError::Invalid(msg) => ServerError::Validation(msg.to_string()),
            StoreError::Forbidden(msg) => ServerError::Authorization(msg.to_string()),
            StoreError::Conflict(t) => t.into(),
            other => ServerError::Dependency(other.to_string()),
        }
    }
}

impl From<TransitionError> for ServerError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::NothingPending => ServerError::NotFound("Pending resolution"),
            other => ServerError::Conflict(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ServerError::Dependency(cause) => {
                tracing::error!(error = %cause, "request failed in a dependency");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "code": status.as_u16(),
            "success": false,
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
