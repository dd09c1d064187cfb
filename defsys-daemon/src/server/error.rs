//! Error responses.
//!
//! The frontend matches on fixed plain-text bodies, so every error maps to
//! one status code and one message. Details only go to the log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::render::RenderError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed path or query parameters.
    #[error("Wrong Parameters")]
    WrongParameters,

    /// The lookup succeeded but found nothing, default strain included.
    #[error("No Results")]
    NoResults,

    /// A static file is missing, default strain included.
    #[error("No Results")]
    NotFound,

    #[error("Failed to generate phylogenetic tree")]
    Render(#[from] RenderError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::WrongParameters | ApiError::NoResults => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Render(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Render(e) => tracing::error!("Tree render failed: {}", e),
            ApiError::Internal(e) => tracing::error!("Request failed: {:#}", e),
            _ => tracing::debug!("Request rejected: {}", self),
        }
        (self.status(), self.to_string()).into_response()
    }
}
