use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{Message, PipeRequest, PipeResponse};
use super::{CompletionClient, CompletionRequest};
use crate::config::{LangbaseConfig, PipeConfig, RequestConfig};
use crate::error::{CompletionError, CompletionResult};

/// Client for interacting with Langbase Pipes API
#[derive(Clone)]
pub struct LangbaseClient {
    client: Client,
    base_url: String,
    api_key: String,
    pipe_name: String,
    request_config: RequestConfig,
}

impl LangbaseClient {
    /// Create a new Langbase client
    pub fn new(
        config: &LangbaseConfig,
        pipes: &PipeConfig,
        request_config: RequestConfig,
    ) -> CompletionResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(CompletionError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            pipe_name: pipes.completion.clone(),
            request_config,
        })
    }

    /// Call a Langbase pipe with the given request.
    ///
    /// Only transport failures are retried; the unit of retry is the whole
    /// call.
    pub async fn call_pipe(&self, request: PipeRequest) -> CompletionResult<PipeResponse> {
        let url = format!("{}/v1/pipes/run", self.base_url);
        let pipe_name = request.name.clone();

        let mut retries = 0;

        loop {
            if retries > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(retries - 1)),
                );
                warn!(
                    pipe = %pipe_name,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying Langbase request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_request(&url, &request).await {
                Ok(response) => {
                    info!(
                        pipe = %pipe_name,
                        latency_ms = start.elapsed().as_millis(),
                        "Langbase pipe call succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    error!(
                        pipe = %pipe_name,
                        error = %e,
                        kind = %e.kind(),
                        latency_ms = start.elapsed().as_millis(),
                        retry = retries,
                        "Langbase pipe call failed"
                    );

                    if !e.is_retryable() {
                        return Err(e);
                    }
                    if retries >= self.request_config.max_retries {
                        if self.request_config.max_retries == 0 {
                            return Err(e);
                        }
                        return Err(CompletionError::Unavailable {
                            message: e.to_string(),
                            retries,
                        });
                    }
                    retries += 1;
                }
            }
        }
    }

    /// Execute a single request (internal)
    async fn execute_request(
        &self,
        url: &str,
        request: &PipeRequest,
    ) -> CompletionResult<PipeResponse> {
        debug!(
            pipe = %request.name,
            messages = request.messages.len(),
            "Calling Langbase pipe"
        );

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    CompletionError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let pipe_response: PipeResponse =
            response
                .json()
                .await
                .map_err(|e| CompletionError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        Ok(pipe_response)
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the pipe every request is sent to
    pub fn pipe_name(&self) -> &str {
        &self.pipe_name
    }
}

#[async_trait]
impl CompletionClient for LangbaseClient {
    async fn generate(&self, request: &CompletionRequest) -> CompletionResult<String> {
        let pipe_request = PipeRequest::new(
            &self.pipe_name,
            vec![
                Message::system(&request.system_prompt),
                Message::user(&request.user_prompt),
            ],
        )
        .with_sampling(
            request.max_output_tokens,
            request.temperature,
            request.top_p,
        );

        let response = self.call_pipe(pipe_request).await?;

        response
            .text()
            .map(str::to_string)
            .ok_or_else(|| CompletionError::InvalidResponse {
                message: "Response carried no generated text".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LangbaseConfig {
        LangbaseConfig {
            api_key: "test_key".to_string(),
            base_url: "https://api.langbase.com/".to_string(),
        }
    }

    #[test]
    fn test_client_creation() {
        let client = LangbaseClient::new(
            &test_config(),
            &PipeConfig::default(),
            RequestConfig::default(),
        );
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = LangbaseClient::new(
            &test_config(),
            &PipeConfig::default(),
            RequestConfig::default(),
        )
        .unwrap();
        assert_eq!(client.base_url(), "https://api.langbase.com");
        assert_eq!(client.pipe_name(), "compliance-completion-v1");
    }
}
