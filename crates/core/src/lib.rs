pub mod config;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// The only body ever returned to clients when a card cannot be produced.
pub const FAILURE_MESSAGE: &str = "Failed to generate the image";

/// The request path does not describe a card.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid URL format: {0}")]
    InvalidPathFormat(String),
    #[error("title is not valid percent-encoded UTF-8: {0}")]
    InvalidEncoding(String),
    #[error("scale factor out of range: {0}")]
    InvalidScale(String),
}

/// Layout serialization, rasterization or encoding failed.
#[derive(Debug, thiserror::Error)]
#[error("{0:#}")]
pub struct RenderError(#[from] pub anyhow::Error);

#[derive(Debug, thiserror::Error)]
pub enum CardError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl IntoResponse for CardError {
    fn into_response(self) -> Response {
        match &self {
            Self::Parse(err) => tracing::error!("Rejected card request: {err}"),
            Self::Render(err) => tracing::error!("Error generating image: {err}"),
        }
        (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_MESSAGE).into_response()
    }
}
