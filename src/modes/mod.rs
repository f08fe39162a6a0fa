//! Response mode implementations.
//!
//! This module provides the response paths a query can take:
//! - [`StandardMode`]: Single-pass persona responder
//! - [`ReflectionMode`]: Five-stage P4 reflective pipeline
//! - [`HybridMode`]: Analytical then conversational composition
//! - [`Router`]: Keyword router selecting one of the above
//!
//! All modes share common infrastructure via [`ModeCore`] composition.

mod core;
mod hybrid;
mod reflection;
mod router;
mod standard;

pub use self::core::*;
pub use hybrid::*;
pub use reflection::*;
pub use router::*;
pub use standard::*;

use serde::{Deserialize, Serialize};

use crate::error::{CompletionError, FailureKind};

// ============================================================================
// Shared Utilities
// ============================================================================

/// Take at most `max_chars` characters of `text`, never splitting a char.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Why a responder degraded to its fallback output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureInfo {
    /// Where the failure happened (stage or persona name).
    pub stage: String,
    /// Failure class.
    pub kind: FailureKind,
    /// Human-readable reason.
    pub message: String,
}

impl FailureInfo {
    /// Build failure info from a completion error.
    pub fn from_error(stage: impl Into<String>, error: &CompletionError) -> Self {
        Self {
            stage: stage.into(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    /// Failure for a query that was rejected before any call.
    pub fn blank_query(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            kind: FailureKind::InvalidInput,
            message: "Query text is empty".to_string(),
        }
    }
}

/// Response persona: a named system-prompt configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    /// Interactive, plain-language advisor.
    Conversational,
    /// Structured compliance analyst.
    Analytical,
}

impl Persona {
    /// Get the persona name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Conversational => "conversational",
            Persona::Analytical => "analytical",
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "conversational" => Ok(Persona::Conversational),
            "analytical" => Ok(Persona::Analytical),
            _ => Err(format!("Unknown persona: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_round_trip_names() {
        for persona in [Persona::Conversational, Persona::Analytical] {
            assert_eq!(persona.as_str().parse::<Persona>().unwrap(), persona);
            assert_eq!(format!("{}", persona), persona.as_str());
        }
    }

    #[test]
    fn test_persona_from_str_case_insensitive() {
        assert_eq!(
            "ANALYTICAL".parse::<Persona>().unwrap(),
            Persona::Analytical
        );
    }

    #[test]
    fn test_persona_from_str_invalid() {
        let result = "legal".parse::<Persona>();
        assert_eq!(result.unwrap_err(), "Unknown persona: legal");
    }

    #[test]
    fn test_failure_info_from_error() {
        let info = FailureInfo::from_error("self_critique", &CompletionError::Timeout { timeout_ms: 10 });
        assert_eq!(info.stage, "self_critique");
        assert_eq!(info.kind, FailureKind::Transport);
        assert_eq!(info.message, "Request timeout after 10ms");
    }

    #[test]
    fn test_failure_info_blank_query() {
        let info = FailureInfo::blank_query("initial_response");
        assert_eq!(info.kind, FailureKind::InvalidInput);
    }

    #[test]
    fn test_truncate_chars_ascii() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("canción", 6), "canció");
        assert_eq!(truncate_chars("ñññ", 2), "ññ");
    }
}
