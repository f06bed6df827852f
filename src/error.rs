use std::result;

use thiserror::Error;

/// Error types for PubMed retrieval operations
#[derive(Error, Debug)]
pub enum PubMedError {
    /// Transport-level failure (connection, timeout, body read)
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Retry budget exhausted while the API kept answering 429
    #[error("Rate limit exceeded{} after {retries} retries", context_suffix(.context))]
    RateLimitExceeded {
        context: Option<String>,
        retries: u32,
    },

    /// Non-success, non-429 HTTP status; never retried
    #[error("HTTP error {status} {status_text}{}", context_suffix(.context))]
    HttpError {
        status: u16,
        status_text: String,
        context: Option<String>,
    },

    /// Upstream response is missing something later calls depend on
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    /// NCBI reported an error inside a 200 OK envelope
    #[error("API error: {message}")]
    ApiError { message: String },
}

pub type Result<T> = result::Result<T, PubMedError>;

fn context_suffix(context: &Option<String>) -> String {
    match context {
        Some(label) => format!(" ({label})"),
        None => String::new(),
    }
}

impl PubMedError {
    /// Whether the transport may retry after this error.
    ///
    /// Only rate limiting and network faults are transient. Everything the
    /// transport raises itself has already been through the retry loop.
    pub fn is_retryable(&self) -> bool {
        match self {
            PubMedError::RequestError(err) => !err.is_builder() && !err.is_decode(),
            PubMedError::RateLimitExceeded { .. }
            | PubMedError::HttpError { .. }
            | PubMedError::JsonError(_)
            | PubMedError::InvalidResponse { .. }
            | PubMedError::ApiError { .. } => false,
        }
    }
}
