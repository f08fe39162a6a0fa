use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or unusable configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong.
        message: String,
    },

    /// A completion call failed where the caller asked for the error.
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    /// The caller exhausted its request window.
    #[error("Rate limit exceeded for {identity}")]
    RateLimited {
        /// Rate-limit key of the rejected caller.
        identity: String,
    },

    /// A scenario file could not be read or parsed.
    #[error("Scenario error: {message}")]
    Scenario {
        /// What is wrong.
        message: String,
    },

    /// Unexpected internal failure.
    #[error("Internal error: {message}")]
    Internal {
        /// What is wrong.
        message: String,
    },
}

/// Completion service errors
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Transport failures persisted through every retry.
    #[error("Completion service unavailable: {message} (retries: {retries})")]
    Unavailable {
        /// Last transport error.
        message: String,
        /// Retries attempted.
        retries: u32,
    },

    /// Non-success HTTP status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// Body missing, malformed, or without generated text.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// What is wrong.
        message: String,
    },

    /// The call exceeded its deadline.
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// Deadline that was exceeded.
        timeout_ms: u64,
    },

    /// Connection-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Coarse classification of a failed call, carried into degraded results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connectivity problem or timeout talking to the completion service.
    Transport,
    /// Non-success status, or a payload without generated text.
    Upstream,
    /// The request never reached the completion service (e.g. blank query).
    InvalidInput,
}

impl FailureKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Transport => "transport",
            FailureKind::Upstream => "upstream",
            FailureKind::InvalidInput => "invalid_input",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl CompletionError {
    /// Classify the error as a transport or upstream failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            CompletionError::Unavailable { .. }
            | CompletionError::Timeout { .. }
            | CompletionError::Http(_) => FailureKind::Transport,
            CompletionError::Api { .. } | CompletionError::InvalidResponse { .. } => {
                FailureKind::Upstream
            }
        }
    }

    /// Whether a whole-call retry may help.
    pub fn is_retryable(&self) -> bool {
        self.kind() == FailureKind::Transport
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for completion calls
pub type CompletionResult<T> = Result<T, CompletionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config {
            message: "missing key".to_string(),
        };
        assert_eq!(err.to_string(), "Configuration error: missing key");

        let err = AppError::RateLimited {
            identity: "pyme:sess-1".to_string(),
        };
        assert_eq!(err.to_string(), "Rate limit exceeded for pyme:sess-1");

        let err = AppError::Scenario {
            message: "bad fixture".to_string(),
        };
        assert_eq!(err.to_string(), "Scenario error: bad fixture");
    }

    #[test]
    fn test_completion_error_display() {
        let err = CompletionError::Unavailable {
            message: "server down".to_string(),
            retries: 3,
        };
        assert_eq!(
            err.to_string(),
            "Completion service unavailable: server down (retries: 3)"
        );

        let err = CompletionError::Api {
            status: 401,
            message: "unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 401 - unauthorized");

        let err = CompletionError::InvalidResponse {
            message: "no completion".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid response: no completion");

        let err = CompletionError::Timeout { timeout_ms: 5000 };
        assert_eq!(err.to_string(), "Request timeout after 5000ms");
    }

    #[test]
    fn test_completion_error_kind() {
        assert_eq!(
            CompletionError::Timeout { timeout_ms: 10 }.kind(),
            FailureKind::Transport
        );
        assert_eq!(
            CompletionError::Unavailable {
                message: "x".to_string(),
                retries: 0
            }
            .kind(),
            FailureKind::Transport
        );
        assert_eq!(
            CompletionError::Api {
                status: 500,
                message: "x".to_string()
            }
            .kind(),
            FailureKind::Upstream
        );
        assert_eq!(
            CompletionError::InvalidResponse {
                message: "x".to_string()
            }
            .kind(),
            FailureKind::Upstream
        );
    }

    #[test]
    fn test_only_transport_errors_are_retryable() {
        assert!(CompletionError::Timeout { timeout_ms: 10 }.is_retryable());
        assert!(!CompletionError::Api {
            status: 503,
            message: "busy".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::InvalidInput).unwrap();
        assert_eq!(json, "\"invalid_input\"");
        assert_eq!(FailureKind::Upstream.to_string(), "upstream");
    }

    #[test]
    fn test_completion_error_conversion_to_app_error() {
        let err: AppError = CompletionError::Timeout { timeout_ms: 1000 }.into();
        assert!(matches!(err, AppError::Completion(_)));
    }
}
