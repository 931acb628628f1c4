use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing, unverifiable, or unresolvable credential. The message is the
    /// full client-visible body text.
    #[error("{0}")]
    Unauthenticated(String),

    /// An upstream dependency failed in a way that is fatal to the request.
    #[error("{service} request failed: {cause}")]
    Upstream { service: &'static str, cause: String },

    /// One author's post fetch failed while the rest of the fan-out
    /// succeeded. Handled inside the aggregator, never returned to clients.
    #[error("posts fetch for author {author} failed: {cause}")]
    PartialUpstream { author: String, cause: String },
}

impl AppError {
    pub fn upstream(service: &'static str, cause: impl Into<String>) -> Self {
        Self::Upstream {
            service,
            cause: cause.into(),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let code = self.status_code();
        HttpResponse::build(code).json(ErrorResponse {
            error: self.to_string(),
            code: code.as_u16(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Upstream { .. } | AppError::PartialUpstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}
