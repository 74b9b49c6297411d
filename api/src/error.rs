use std::sync::Arc;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// JSON error response structure.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// The central error type used for HTTP responses.
///
/// Storage failures are deliberately opaque: the client sees a generic
/// message while the underlying error is logged by the response middleware
/// in `main`.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("bad request")]
    BadRequest(&'static str),

    /// Scheduling conflict, surfaced as 409.
    #[error("conflict")]
    Conflict(String),

    /// Missing or malformed `X-Staff-Id` header.
    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error")]
    Internal(
        #[source]
        #[from]
        eyre::Report,
    ),

    /// Database error
    #[error("database error")]
    Database(#[source] sqlx::Error),
}

impl From<db::Error> for AppError {
    fn from(err: db::Error) -> Self {
        match err {
            db::Error::Validation(msg) => AppError::BadRequest(msg),
            db::Error::Conflict(conflict) => {
                AppError::Conflict(format!("Scheduling Conflict: {conflict}"))
            }
            db::Error::NotFound => AppError::NotFound,
            db::Error::Database(err) => AppError::Database(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Internal(..) | AppError::Database(..) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
            AppError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, (*msg).to_string()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "missing or invalid staff identity".to_string(),
            ),
        };

        let mut response = (status, Json(ErrorResponse { error: message })).into_response();

        response.extensions_mut().insert(Arc::new(self));

        response
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_message(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        parsed["error"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            AppError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::BadRequest("missing required fields")
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Conflict("Scheduling Conflict: x".to_string())
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn internal_errors_are_opaque_to_the_client() {
        let err = AppError::Internal(eyre::eyre!("connection pool exhausted: secret detail"));
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_message(response).await, "internal server error");
    }

    #[tokio::test]
    async fn domain_errors_map_onto_http_errors() {
        let err: AppError = db::Error::Validation("reason is required for cancellation").into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_message(response).await,
            "reason is required for cancellation"
        );

        let err: AppError = db::Error::NotFound.into();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
