use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notewarden_traits::{GenerateRequest, GenerateResponse, LlmProvider, ProviderError};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmRetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for LlmRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl LlmRetryConfig {
    /// No retries at all; the first failure is final.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = self
            .backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32);
        let delay = (self.initial_delay_ms as f64 * multiplier) as u64;
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

/// Retries [`ProviderError::Unavailable`] with exponential backoff.
///
/// `InvalidRequest` is returned immediately.
pub struct RetryingProvider {
    inner: Arc<dyn LlmProvider>,
    config: LlmRetryConfig,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, config: LlmRetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    fn provider(&self) -> &str {
        self.inner.provider()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.inner.generate(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.config.delay_for(attempt);
                    warn!(
                        provider = self.inner.provider(),
                        model = self.inner.model(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Provider unavailable, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::{MockProvider, MockStep};
    use notewarden_traits::ChatMessage;

    fn fast_config(max_retries: u32) -> LlmRetryConfig {
        LlmRetryConfig {
            max_retries,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            backoff_multiplier: 2.0,
        }
    }

    fn request() -> GenerateRequest {
        GenerateRequest::new(vec![ChatMessage::user("hello")])
    }

    #[test]
    fn test_delay_progression() {
        let config = LlmRetryConfig::default();
        assert_eq!(config.delay_for(1), Duration::from_millis(200));
        assert_eq!(config.delay_for(2), Duration::from_millis(400));
        assert_eq!(config.delay_for(3), Duration::from_millis(800));
        assert_eq!(config.delay_for(6), Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let mock = Arc::new(MockProvider::from_steps(
            "m",
            vec![
                MockStep::unavailable("503"),
                MockStep::unavailable("503"),
                MockStep::text("done"),
            ],
        ));
        let provider = RetryingProvider::new(mock.clone(), fast_config(3));

        let response = provider.generate(request()).await.unwrap();
        assert_eq!(response.content.as_deref(), Some("done"));
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let mock = Arc::new(MockProvider::from_steps(
            "m",
            vec![MockStep::unavailable("down"); 5],
        ));
        let provider = RetryingProvider::new(mock.clone(), fast_config(2));

        let err = provider.generate(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_invalid_request_is_not_retried() {
        let mock = Arc::new(MockProvider::from_steps(
            "m",
            vec![MockStep::invalid("bad schema"), MockStep::text("unused")],
        ));
        let provider = RetryingProvider::new(mock.clone(), fast_config(3));

        let err = provider.generate(request()).await.unwrap_err();
        assert_eq!(err, ProviderError::InvalidRequest("bad schema".into()));
        assert_eq!(mock.call_count(), 1);
    }
}
