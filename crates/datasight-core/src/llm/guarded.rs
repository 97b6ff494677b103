use crate::error::DataSightError;
use crate::llm::traits::*;
use std::sync::Arc;
use std::time::Duration;

/// Wraps any client with a per-attempt timeout and bounded retries.
///
/// Retries happen inside a single `chat` call, so callers only ever see one
/// reply (or one error) per request no matter how many attempts were made.
pub struct GuardedClient {
    inner: Arc<dyn LlmClient>,
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

impl GuardedClient {
    pub fn new(inner: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            max_retries: 0,
            backoff: Duration::from_millis(500),
        }
    }

    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff = backoff;
        self
    }

    async fn attempt(
        &self,
        messages: &[Message],
        options: ChatOptions,
    ) -> Result<LlmResponse, DataSightError> {
        match tokio::time::timeout(self.timeout, self.inner.chat(messages, options)).await {
            Ok(result) => result,
            Err(_) => Err(DataSightError::Timeout(self.timeout)),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for GuardedClient {
    async fn chat(
        &self,
        messages: &[Message],
        options: ChatOptions,
    ) -> Result<LlmResponse, DataSightError> {
        let mut attempt = 0;
        loop {
            match self.attempt(messages, options).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.backoff * 2u32.saturating_pow(attempt);
                    tracing::warn!(attempt = attempt + 1, ?delay, "chat completion failed, retrying: {}", e);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyLlm {
        failures_left: AtomicU32,
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl LlmClient for FlakyLlm {
        async fn chat(&self, _: &[Message], _: ChatOptions) -> Result<LlmResponse, DataSightError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(DataSightError::Llm("503".into()));
            }
            Ok(LlmResponse {
                message: Message::assistant("ok"),
                usage: None,
            })
        }
    }

    struct HangingLlm;

    #[async_trait::async_trait]
    impl LlmClient for HangingLlm {
        async fn chat(&self, _: &[Message], _: ChatOptions) -> Result<LlmResponse, DataSightError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_surfaces_as_timeout_error() {
        let client = GuardedClient::new(Arc::new(HangingLlm), Duration::from_secs(30));
        let err = client.chat(&[Message::user("hi")], ChatOptions::default()).await.unwrap_err();
        assert!(matches!(err, DataSightError::Timeout(d) if d == Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success_and_returns_one_reply() {
        let inner = Arc::new(FlakyLlm {
            failures_left: AtomicU32::new(2),
            calls: AtomicU32::new(0),
        });
        let client = GuardedClient::new(inner.clone(), Duration::from_secs(5))
            .with_retries(3, Duration::from_millis(100));

        let response = client.chat(&[Message::user("hi")], ChatOptions::default()).await.unwrap();
        assert_eq!(response.message.text(), Some("ok"));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_retry_by_default() {
        let inner = Arc::new(FlakyLlm {
            failures_left: AtomicU32::new(1),
            calls: AtomicU32::new(0),
        });
        let client = GuardedClient::new(inner.clone(), Duration::from_secs(5));

        assert!(client.chat(&[Message::user("hi")], ChatOptions::default()).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }
}
