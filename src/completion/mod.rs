//! Completion service boundary.
//!
//! Every mode talks to the text-generation service through the
//! [`CompletionClient`] capability. [`LangbaseClient`] is the HTTP
//! implementation backed by a Langbase pipe.

mod client;
mod types;

pub use client::*;
pub use types::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CompletionResult;

/// A single generation request: prompts plus sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Persona or stage instructions.
    pub system_prompt: String,
    /// The user-facing prompt.
    pub user_prompt: String,
    /// Output length cap.
    pub max_output_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Nucleus sampling cutoff.
    pub top_p: f64,
}

impl CompletionRequest {
    /// Create a request with default sampling (0.7 / 0.9, 1024 tokens).
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            max_output_tokens: 1024,
            temperature: 0.7,
            top_p: 0.9,
        }
    }

    /// Set the output length cap
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set top-p
    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = top_p;
        self
    }
}

/// Text-generation capability consumed by every mode.
///
/// Implementations return the first generated text. A payload without
/// generated text is an [`CompletionError::InvalidResponse`].
///
/// [`CompletionError::InvalidResponse`]: crate::error::CompletionError::InvalidResponse
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate text for the given request.
    async fn generate(&self, request: &CompletionRequest) -> CompletionResult<String>;
}
