//! HTTP error mapping.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use durian_common::DurianError;
use durian_fx::FxError;

/// Errors returned from route handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DurianError),

    #[error(transparent)]
    Fx(#[from] FxError),

    /// Request body or parameters could not be read.
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(e) => match e {
                DurianError::InvalidRequest { .. } | DurianError::InvalidAmount(_) => {
                    StatusCode::BAD_REQUEST
                }
                DurianError::Forbidden(_) => StatusCode::FORBIDDEN,
                DurianError::OfframpNotFound(_) => StatusCode::NOT_FOUND,
                DurianError::InvalidTransition { .. } | DurianError::ConcurrentModification(_) => {
                    StatusCode::CONFLICT
                }
                DurianError::DatabaseError(_)
                | DurianError::ConfigurationError(_)
                | DurianError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Fx(e) => match e {
                FxError::InvalidAmount(_) | FxError::CurrencyMismatch { .. } => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable error code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Domain(e) => e.error_code(),
            ApiError::Fx(FxError::InvalidAmount(_)) => "INVALID_AMOUNT",
            ApiError::Fx(FxError::CurrencyMismatch { .. }) => "CURRENCY_MISMATCH",
            ApiError::Fx(_) => "INTERNAL_ERROR",
            ApiError::BadRequest(_) => "INVALID_REQUEST",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            error!(error = %self, code = self.code(), "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (
            status,
            Json(json!({
                "error": self.code(),
                "message": message,
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use durian_common::{OfframpRequestId, OfframpStatus};
    use http_body_util::BodyExt;

    async fn body_of(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_mapping() {
        let transition: ApiError = DurianError::InvalidTransition {
            from: OfframpStatus::Fulfilled,
            to: OfframpStatus::Processing,
        }
        .into();
        assert_eq!(transition.status(), StatusCode::CONFLICT);

        let conflict: ApiError = DurianError::ConcurrentModification(OfframpRequestId::new()).into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let missing: ApiError = DurianError::OfframpNotFound(OfframpRequestId::new()).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let forbidden: ApiError = DurianError::Forbidden("nope".into()).into();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let amount: ApiError = FxError::InvalidAmount("0".into()).into();
        assert_eq!(amount.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_server_errors_hide_detail() {
        let (status, body) =
            body_of(DurianError::DatabaseError("connection refused to 10.0.0.5".into()).into())
                .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "DATABASE_ERROR");
        assert_eq!(body["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_client_errors_carry_message() {
        let (status, body) = body_of(
            DurianError::InvalidTransition {
                from: OfframpStatus::Fulfilled,
                to: OfframpStatus::Processing,
            }
            .into(),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "INVALID_TRANSITION");
        assert_eq!(body["message"], "Invalid transition from fulfilled to processing");
    }
}
