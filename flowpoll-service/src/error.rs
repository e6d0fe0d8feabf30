//! HTTP error mapping for trigger routes

use fp_core::Error;
use fp_http::axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ApiError {
    #[error("Invalid HTTP method")]
    InvalidMethod,

    #[error(transparent)]
    Core(#[from] Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidMethod => StatusCode::BAD_REQUEST,
            ApiError::Core(err) => match err {
                Error::MissingExecution | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                Error::UnknownExecution(_) => StatusCode::NOT_FOUND,
                Error::EngineApi { status, .. } => StatusCode::from_u16(*status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY),
                Error::EngineTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                Error::EngineUnavailable(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

/// Bodies are plain text, matching the success responses
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
