//! ideaforge: idea incubation with multi-critic reviews.
//!
//! Projects in three domains (stories, digital products, physical ventures)
//! are drafted in two tiers and reviewed by fixed crews of critic personas
//! that run in sequence against a chat-completion model.

pub mod chat;
pub mod cli;
pub mod config;
pub mod crew;
pub mod error;
pub mod llm;
pub mod store;

// Re-export commonly used types
pub use crew::{CrewError, Domain, Report, ReviewService, Tier};
pub use error::{LlmError, StoreError};
