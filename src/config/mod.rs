use std::env;
use std::str::FromStr;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Langbase API credentials and endpoint.
    pub langbase: LangbaseConfig,
    /// Log level and output format.
    pub logging: LoggingConfig,
    /// Timeout and retry policy for completion calls.
    pub request: RequestConfig,
    /// Pipe names.
    pub pipes: PipeConfig,
    /// Router thresholds.
    pub router: RouterConfig,
    /// Evaluation harness settings.
    pub evaluation: EvaluationConfig,
    /// Per-identity request limit.
    pub rate_limit: RateLimitConfig,
}

/// Langbase API configuration
#[derive(Debug, Clone)]
pub struct LangbaseConfig {
    /// Bearer token for the pipe API.
    pub api_key: String,
    /// API base URL, without trailing path.
    pub base_url: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per event.
    Json,
}

/// HTTP request configuration
///
/// `timeout_ms` bounds every completion call, both at the HTTP layer and
/// as the guard each mode wraps around the call.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Per-call timeout.
    pub timeout_ms: u64,
    /// Retries after a transport failure.
    pub max_retries: u32,
    /// Base delay between retries, doubled per attempt.
    pub retry_delay_ms: u64,
}

/// Langbase pipe name configuration
#[derive(Debug, Clone)]
pub struct PipeConfig {
    /// Pipe serving every completion call.
    pub completion: String,
}

/// Keyword router thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    /// Messages with fewer words than this are "short".
    pub short_message_words: usize,
    /// Ambiguous messages with more words than this go hybrid.
    pub hybrid_min_words: usize,
    /// Send analytical traffic through the P4 pipeline instead of the
    /// single-pass analytical persona.
    pub reflective_analysis: bool,
    /// Characters of analytical output handed to the conversational persona
    /// in hybrid mode.
    pub hybrid_excerpt_chars: usize,
}

/// Evaluation harness settings
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationConfig {
    /// Relative margin a side must clear to win a scenario.
    pub winner_threshold: f64,
    /// Upper bound on one agent run inside the harness.
    pub scenario_timeout_ms: u64,
    /// Cosmetic delay between scenarios.
    pub pacing_ms: u64,
}

/// Per-identity request limit
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Requests admitted per identity per window.
    pub max_requests: u32,
    /// Window length.
    pub window_secs: u64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let langbase = LangbaseConfig {
            api_key: env::var("LANGBASE_API_KEY").map_err(|_| AppError::Config {
                message: "LANGBASE_API_KEY is required".to_string(),
            })?,
            base_url: env::var("LANGBASE_BASE_URL")
                .unwrap_or_else(|_| "https://api.langbase.com".to_string()),
        };

        let logging = LoggingConfig::from_env();

        let defaults = RequestConfig::default();
        let request = RequestConfig {
            timeout_ms: env_or("REQUEST_TIMEOUT_MS", defaults.timeout_ms),
            max_retries: env_or("MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("RETRY_DELAY_MS", defaults.retry_delay_ms),
        };

        let pipes = PipeConfig {
            completion: env::var("PIPE_COMPLETION")
                .unwrap_or_else(|_| PipeConfig::default().completion),
        };

        let router = RouterConfig::from_env();

        let defaults = EvaluationConfig::default();
        let evaluation = EvaluationConfig {
            winner_threshold: env_or("EVAL_WINNER_THRESHOLD", defaults.winner_threshold),
            scenario_timeout_ms: env_or("EVAL_SCENARIO_TIMEOUT_MS", defaults.scenario_timeout_ms),
            pacing_ms: env_or("EVAL_PACING_MS", defaults.pacing_ms),
        };

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            max_requests: env_or("RATE_LIMIT_MAX_REQUESTS", defaults.max_requests),
            window_secs: env_or("RATE_LIMIT_WINDOW_SECS", defaults.window_secs),
        };

        Ok(Config {
            langbase,
            logging,
            request,
            pipes,
            router,
            evaluation,
            rate_limit,
        })
    }
}

impl LoggingConfig {
    /// Read `LOG_LEVEL` and `LOG_FORMAT`. Needs no credentials.
    pub fn from_env() -> Self {
        Self {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        }
    }
}

impl RouterConfig {
    /// Read the router variables. Needs no credentials.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            short_message_words: env_or("ROUTER_SHORT_MESSAGE_WORDS", defaults.short_message_words),
            hybrid_min_words: env_or("ROUTER_HYBRID_MIN_WORDS", defaults.hybrid_min_words),
            reflective_analysis: env_or("ROUTER_REFLECTIVE_ANALYSIS", defaults.reflective_analysis),
            hybrid_excerpt_chars: env_or("HYBRID_EXCERPT_CHARS", defaults.hybrid_excerpt_chars),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 15000,
            max_retries: 0,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            completion: "compliance-completion-v1".to_string(),
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            short_message_words: 10,
            hybrid_min_words: 20,
            reflective_analysis: false,
            hybrid_excerpt_chars: 300,
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            winner_threshold: 0.05,
            // Five sequential stages at the default per-call timeout.
            scenario_timeout_ms: 90000,
            pacing_ms: 0,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_config_defaults() {
        let config = RequestConfig::default();
        assert_eq!(config.timeout_ms, 15000);
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_router_config_defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.short_message_words, 10);
        assert_eq!(config.hybrid_min_words, 20);
        assert!(!config.reflective_analysis);
        assert_eq!(config.hybrid_excerpt_chars, 300);
    }

    #[test]
    fn test_evaluation_config_defaults() {
        let config = EvaluationConfig::default();
        assert_eq!(config.winner_threshold, 0.05);
        assert_eq!(config.pacing_ms, 0);
    }
}
