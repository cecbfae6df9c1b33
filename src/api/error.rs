//! Error type shared by the HTTP handlers.
//!
//! Every variant renders as `{"error": "<message>"}` with the matching status
//! code. Stack traces and transport details are never exposed.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::backend;

pub const INTERNAL_SERVER_ERROR: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed client input.
    #[error("{0}")]
    ClientInput(String),
    #[error("{0}")]
    MethodNotAllowed(&'static str),
    /// The backend reported an error; the message is passed through.
    #[error("{0}")]
    Backend(String),
    #[error("Server configuration error")]
    Configuration,
    #[error("{}", .0.as_deref().unwrap_or(INTERNAL_SERVER_ERROR))]
    Unexpected(Option<String>),
}

impl ApiError {
    pub fn client_input(message: impl Into<String>) -> Self {
        Self::ClientInput(message.into())
    }

    /// Convert a backend failure: messages reported by the backend become
    /// [`ApiError::Backend`] (falling back to `default` when empty). Transport,
    /// decoding and URL failures only ever surface as `default`; their text
    /// names the backend URL and query and stays in the logs.
    pub fn from_backend(err: &backend::Error, default: &str) -> Self {
        match err {
            backend::Error::Api { message, .. } => Self::Backend(
                message
                    .as_deref()
                    .filter(|m| !m.is_empty())
                    .unwrap_or(default)
                    .to_string(),
            ),
            _ => Self::Unexpected(Some(default.to_string())),
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::ClientInput(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Backend(_) | Self::Configuration | Self::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
