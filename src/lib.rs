//! # Compliance Reasoning
//!
//! Automated compliance and ethics advice over free-text queries, with two
//! ways of answering:
//!
//! - **Standard responder**: one completion call with a conversational or
//!   analytical persona
//! - **P4 reflective pipeline**: initial answer, self-critique, validation
//!   against five ethical frameworks, refinement, and final synthesis
//!
//! A keyword [`modes::Router`] picks the path per query (including a hybrid
//! of both personas), and the [`evaluation`] harness runs both paths side by
//! side over fixed scenarios to score which performs better.
//!
//! ## Architecture
//!
//! ```text
//! Query → Router → Standard | P4 Pipeline | Hybrid → Langbase Pipe (HTTP)
//!                        ↓
//!          Evaluation Harness → Quality Scorer → SuiteReport
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use compliance_reasoning::{AppState, Config, Query};
//! use compliance_reasoning::completion::LangbaseClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = LangbaseClient::new(&config.langbase, &config.pipes, config.request.clone())?;
//!     let state = AppState::new(config, Arc::new(client));
//!     let response = state.handle(&Query::new("¿Cómo gestiono los regalos de proveedores?")).await?;
//!     println!("{}", response.outcome.message());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Completion capability and the Langbase pipe client.
pub mod completion;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Side-by-side evaluation of the two response paths.
pub mod evaluation;
/// Response modes and the request router.
pub mod modes;
/// System prompts for every persona and pipeline stage.
pub mod prompts;
/// Inbound query model.
pub mod query;
/// Per-caller rate limiting.
pub mod rate_limit;
/// Request handling and shared application state.
pub mod service;
/// Insight and concern extraction from generated text.
pub mod signals;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use query::{Query, QueryContext};
pub use service::{AppState, ResponseOutcome, ServiceResponse};
