//! Error types for ideaforge operations.
//!
//! Defines the error types shared across subsystems:
//! - LLM API interactions
//! - Project storage
//!
//! Pipeline-level failures live in [`crate::crew::CrewError`], which wraps these.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key: set IDEAFORGE_API_KEY or GOOGLE_API_KEY")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

/// Errors that can occur while reading or writing project records.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Project '{0}' not found")]
    NotFound(Uuid),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt project row: {0}")]
    Corrupt(String),
}
