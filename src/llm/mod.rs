//! LLM integration for ideaforge.
//!
//! Critique steps and chat turns talk to the model through the
//! [`LlmProvider`] trait. The production implementation is
//! [`LiteLlmClient`], an OpenAI-compatible HTTP client; tests substitute
//! scripted providers.
//!
//! ```ignore
//! use ideaforge::config::AppConfig;
//! use ideaforge::llm::{LiteLlmClient, LlmProvider};
//!
//! let client = LiteLlmClient::from_config(&AppConfig::from_env()?)?;
//! let text = client
//!     .complete("You are the Structural Critic.", "Review this outline ...")
//!     .await?;
//! ```

pub mod litellm;

pub use litellm::{
    Choice, GenerationRequest, GenerationResponse, LiteLlmClient, LlmProvider, Message, Usage,
};
