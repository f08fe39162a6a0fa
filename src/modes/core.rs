//! Core infrastructure shared by all response modes.
//!
//! This module provides the [`ModeCore`] struct that centralizes the
//! completion client and the per-call timeout used across all modes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::completion::{CompletionClient, CompletionRequest};
use crate::config::RequestConfig;
use crate::error::{CompletionError, CompletionResult};

/// Core infrastructure shared by all response modes.
///
/// Every completion call made through [`ModeCore::generate`] is bounded by
/// `call_timeout`; expiry surfaces as [`CompletionError::Timeout`], the same
/// as any other transport failure.
///
/// # Example
///
/// ```ignore
/// pub struct MyMode {
///     core: ModeCore,
/// }
///
/// impl MyMode {
///     pub async fn process(&self, prompt: &str) -> CompletionResult<String> {
///         let request = CompletionRequest::new(MY_PROMPT, prompt);
///         self.core.generate(&request, "my_mode").await
///     }
/// }
/// ```
#[derive(Clone)]
pub struct ModeCore {
    /// Completion client for text generation.
    client: Arc<dyn CompletionClient>,
    /// Upper bound on a single completion call.
    call_timeout: Duration,
}

impl ModeCore {
    /// Create a new mode core with the given client and call timeout.
    pub fn new(client: Arc<dyn CompletionClient>, call_timeout: Duration) -> Self {
        Self {
            client,
            call_timeout,
        }
    }

    /// Create a mode core whose timeout follows the request configuration.
    pub fn from_config(client: Arc<dyn CompletionClient>, request: &RequestConfig) -> Self {
        Self::new(client, Duration::from_millis(request.timeout_ms))
    }

    /// Get a reference to the completion client.
    #[inline]
    pub fn client(&self) -> &Arc<dyn CompletionClient> {
        &self.client
    }

    /// Get the per-call timeout.
    #[inline]
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Run one bounded completion call. `label` names the caller in logs.
    pub async fn generate(
        &self,
        request: &CompletionRequest,
        label: &str,
    ) -> CompletionResult<String> {
        let start = Instant::now();

        let outcome = tokio::time::timeout(self.call_timeout, self.client.generate(request)).await;

        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout {
                timeout_ms: self.call_timeout.as_millis() as u64,
            }),
        };

        match &result {
            Ok(text) => debug!(
                call = %label,
                chars = text.len(),
                latency_ms = start.elapsed().as_millis(),
                "Completion call succeeded"
            ),
            Err(e) => warn!(
                call = %label,
                error = %e,
                kind = %e.kind(),
                latency_ms = start.elapsed().as_millis(),
                "Completion call failed"
            ),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::MockCompletionClient;
    use crate::error::FailureKind;
    use async_trait::async_trait;

    struct SlowClient;

    #[async_trait]
    impl CompletionClient for SlowClient {
        async fn generate(&self, _request: &CompletionRequest) -> CompletionResult<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".to_string())
        }
    }

    #[test]
    fn test_mode_core_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<ModeCore>();
    }

    #[test]
    fn test_mode_core_send_sync_traits() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<ModeCore>();
        assert_sync::<ModeCore>();
    }

    #[test]
    fn test_from_config_uses_request_timeout() {
        let core = ModeCore::from_config(
            Arc::new(MockCompletionClient::new()),
            &RequestConfig {
                timeout_ms: 1234,
                max_retries: 0,
                retry_delay_ms: 0,
            },
        );
        assert_eq!(core.call_timeout(), Duration::from_millis(1234));
    }

    #[tokio::test]
    async fn test_generate_passes_through_text() {
        let mut mock = MockCompletionClient::new();
        mock.expect_generate()
            .times(1)
            .returning(|request| Ok(format!("echo: {}", request.user_prompt)));

        let core = ModeCore::new(Arc::new(mock), Duration::from_secs(1));
        let text = core
            .generate(&CompletionRequest::new("sys", "hola"), "test")
            .await
            .unwrap();
        assert_eq!(text, "echo: hola");
    }

    #[tokio::test]
    async fn test_generate_times_out() {
        let core = ModeCore::new(Arc::new(SlowClient), Duration::from_millis(20));
        let err = core
            .generate(&CompletionRequest::new("sys", "user"), "test")
            .await
            .unwrap_err();

        assert!(matches!(err, CompletionError::Timeout { timeout_ms: 20 }));
        assert_eq!(err.kind(), FailureKind::Transport);
    }

    #[tokio::test]
    async fn test_generate_propagates_upstream_error() {
        let mut mock = MockCompletionClient::new();
        mock.expect_generate().returning(|_| {
            Err(CompletionError::InvalidResponse {
                message: "empty".to_string(),
            })
        });

        let core = ModeCore::new(Arc::new(mock), Duration::from_secs(1));
        let err = core
            .generate(&CompletionRequest::new("sys", "user"), "test")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Upstream);
    }
}
