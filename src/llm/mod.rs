//! Language-model boundary.
//!
//! The pipeline only needs "prompt in, text out"; [`TextGenerator`] is that
//! seam, and [`LlmClient`] is the HTTP implementation.

mod client;

use async_trait::async_trait;
use thiserror::Error;

pub use client::{
    render_recipe_prompt, LlmClient, LlmConfig, LlmProvider,
    DEFAULT_RECIPE_PROMPT,
};

/// Errors that can occur during LLM operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    /// Failed to connect to LLM service
    #[error("Connection error: {0}")]
    Connection(String),
    /// API returned an error
    #[error("API error: {0}")]
    Api(String),
    /// Failed to parse response
    #[error("Parse error: {0}")]
    Parse(String),
    /// LLM is disabled
    #[error("LLM is disabled")]
    Disabled,
}

/// Anything that turns a prompt into raw model text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}
