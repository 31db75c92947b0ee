use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nr_core::{Error, ErrorKind};
use serde_json::json;

/// Wraps [`Error`] so handlers can return it directly.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::NotEmbedded => StatusCode::CONFLICT,
        ErrorKind::DimensionMismatch => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::EmptyIndex => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::ProviderTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::ProviderError => StatusCode::BAD_GATEWAY,
        ErrorKind::FeedError | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        let body = json!({
            "status": "error",
            "kind": kind,
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
