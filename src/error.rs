/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - IdentityError を統一的に変換 (provider 側の詳細は log のみ)
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::identity::IdentityError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Neither an access token nor a refresh token was supplied.
    #[error("login information is missing or invalid, please sign in again")]
    Unauthenticated,
    /// A refresh token was supplied but could not be exchanged.
    #[error("refresh token is invalid, please sign in again")]
    InvalidRefreshCredential,
    #[error("{code}: {message}")]
    BadRequest { code: &'static str, message: String },
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::InvalidRefreshCredential | AppError::BadRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = match &self {
            AppError::BadRequest { code, .. } => *code,
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::InvalidRefreshCredential => "INVALID_REFRESH_TOKEN",
            AppError::Internal => "INTERNAL_SERVER_ERROR",
        };
        let message = match self {
            AppError::BadRequest { message, .. } => message,
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<IdentityError> for AppError {
    fn from(e: IdentityError) -> Self {
        // Callers that care about provider rejections match on them before converting.
        tracing::error!(error = %e, "identity provider call failed");
        AppError::Internal
    }
}
