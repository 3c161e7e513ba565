//! Error types for review pipeline runs.
//!
//! Every failure aborts the whole run. No variant carries partial output,
//! so a caller can only retry the pipeline as a whole.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::error::{LlmError, StoreError};

/// Errors returned by the review pipeline and its service layer.
#[derive(Debug, Error)]
pub enum CrewError {
    /// No model credential is available. Raised before any step starts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested (domain, tier) pair has no registered pipeline.
    #[error("Unsupported combination: domain '{domain}', tier '{tier}'")]
    UnsupportedCombination { domain: String, tier: String },

    /// Nothing to review.
    #[error("Nothing to review: the {tier} text is empty")]
    EmptyInput { tier: String },

    /// A step's completion call failed.
    #[error("Step {index} ({role}) failed: {source}")]
    StepFailed {
        index: usize,
        role: &'static str,
        #[source]
        source: LlmError,
    },

    #[error("Step {index} ({role}) timed out after {limit:?}")]
    StepTimedOut {
        index: usize,
        role: &'static str,
        limit: Duration,
    },

    #[error("Review run timed out after {limit:?}")]
    RunTimedOut { limit: Duration },

    #[error("Review run cancelled after {completed_steps} completed step(s)")]
    Cancelled { completed_steps: usize },

    #[error("Project '{0}' not found")]
    ProjectNotFound(Uuid),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl CrewError {
    /// Wraps a step's completion error, reclassifying a missing credential
    /// as a configuration error.
    pub fn from_step(index: usize, role: &'static str, source: LlmError) -> Self {
        match source {
            LlmError::MissingApiKey => Self::Configuration(LlmError::MissingApiKey.to_string()),
            source => Self::StepFailed {
                index,
                role,
                source,
            },
        }
    }

    /// Whether the error came from the model rather than from the caller's request.
    pub fn is_step_failure(&self) -> bool {
        matches!(self, Self::StepFailed { .. } | Self::StepTimedOut { .. })
    }

    /// Short machine-readable label used in progress events and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::UnsupportedCombination { .. } => "unsupported_combination",
            Self::EmptyInput { .. } => "empty_input",
            Self::StepFailed { .. } => "step_failed",
            Self::StepTimedOut { .. } => "step_timed_out",
            Self::RunTimedOut { .. } => "run_timed_out",
            Self::Cancelled { .. } => "cancelled",
            Self::ProjectNotFound(_) => "project_not_found",
            Self::Storage(_) => "storage",
        }
    }
}

/// Result type for pipeline operations.
pub type CrewResult<T> = std::result::Result<T, CrewError>;
