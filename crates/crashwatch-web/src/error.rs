//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crashwatch_core::{SourceError, UtcDateTime, ValidationError};

use crate::types::{ErrorResponse, QuoteErrorResponse};

#[derive(Debug, Error)]
pub enum WebError {
    /// Unknown indicator key or instrument (404).
    #[error(transparent)]
    NotFound(#[from] ValidationError),

    /// Every provider on the quote route failed (500, zeroed quote body).
    #[error("quote unavailable: {0}")]
    Quote(SourceError),

    #[error("failed to bind '{addr}': {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(error) => (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: error.to_string(),
                }),
            )
                .into_response(),
            Self::Quote(error) => {
                tracing::warn!(
                    provider = %error.provider(),
                    code = error.code(),
                    "serving zeroed quote after provider failure"
                );
                let body = QuoteErrorResponse {
                    error: error.summary(),
                    value: 0.0,
                    change: 0.0,
                    change_percent: 0.0,
                    timestamp: UtcDateTime::now().format_rfc3339(),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            Self::Bind { .. } | Self::Serve(_) => {
                tracing::error!(error = %self, "server failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: String::from("internal server error"),
                    }),
                )
                    .into_response()
            }
        }
    }
}
