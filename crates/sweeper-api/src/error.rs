use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("a cleanup run is already in progress")]
    RunInProgress,

    #[error("insufficient permissions")]
    PermissionDenied { reasons: Vec<String> },

    #[error("upstream API failure: {0}")]
    Upstream(sweeper_pages::TransportError),

    #[error("{0}")]
    Internal(String),
}

impl From<sweeper_pages::Error> for ApiError {
    fn from(err: sweeper_pages::Error) -> Self {
        match err {
            sweeper_pages::Error::PermissionDenied { reasons } => {
                ApiError::PermissionDenied { reasons }
            }
            sweeper_pages::Error::Transport(e) => ApiError::Upstream(e),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::RunInProgress => StatusCode::CONFLICT,
            ApiError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let reasons = match &self {
            ApiError::PermissionDenied { reasons } => reasons.clone(),
            ApiError::Upstream(e) => e.reasons.clone(),
            _ => Vec::new(),
        };

        (
            status,
            Json(serde_json::json!({
                "error": self.to_string(),
                "reasons": reasons,
            })),
        )
            .into_response()
    }
}
