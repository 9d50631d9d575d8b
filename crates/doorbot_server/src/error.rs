//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use doorbot_core::DoorbotError;

/// Handler error: a core error rendered as `{ "error": ... }` with the
/// status from [`DoorbotError::http_status`].
#[derive(Debug)]
pub struct AppError(pub DoorbotError);

impl From<DoorbotError> for AppError {
    fn from(err: DoorbotError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, retryable = self.0.is_retryable(), "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_is_bad_request() {
        let resp = AppError(DoorbotError::InvalidInput("no actor".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_is_internal_error() {
        let resp = AppError(DoorbotError::Storage(anyhow::anyhow!("locked"))).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn timeout_is_unavailable() {
        let resp =
            AppError(DoorbotError::Timeout(std::time::Duration::from_secs(1))).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
