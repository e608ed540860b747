//! Application error type and its HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::core::llm::LLMError;
use crate::core::session::StoreError;
use crate::core::stt::STTError;
use crate::core::tts::TTSError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Startup configuration the services cannot be built from
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<TTSError> for AppError {
    fn from(err: TTSError) -> Self {
        AppError::Configuration(format!("Speech synthesizer: {err}"))
    }
}

impl From<STTError> for AppError {
    fn from(err: STTError) -> Self {
        AppError::Configuration(format!("Speech recognizer: {err}"))
    }
}

impl From<LLMError> for AppError {
    fn from(err: LLMError) -> Self {
        AppError::Configuration(format!("Language model: {err}"))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => AppError::NotFound(format!("Call {id}")),
            other => AppError::Internal(format!("Call store: {other}")),
        }
    }
}
