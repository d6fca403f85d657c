use async_trait::async_trait;
use pdfquiz_core::RetryPolicy;

use crate::provider::{GenerationError, TextGenerator};

/// Wraps a generator with bounded exponential backoff on retryable errors.
pub struct RetryingGenerator<G> {
    inner: G,
    policy: RetryPolicy,
}

impl<G: TextGenerator> RetryingGenerator<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<G: TextGenerator> TextGenerator for RetryingGenerator<G> {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.policy
            .run(|| self.inner.generate(prompt), GenerationError::is_retryable)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Fails with the given errors in order, then succeeds.
    struct Flaky {
        failures: std::sync::Mutex<Vec<GenerationError>>,
        calls: AtomicU32,
    }

    impl Flaky {
        fn new(mut failures: Vec<GenerationError>) -> Self {
            failures.reverse();
            Self {
                failures: std::sync::Mutex::new(failures),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for Flaky {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.failures.lock().unwrap().pop() {
                Some(err) => Err(err),
                None => Ok(format!("echo: {prompt}")),
            }
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn retries_rate_limits_until_success() {
        let flaky = Flaky::new(vec![
            GenerationError::RateLimited("quota".into()),
            GenerationError::Server { status: 503, body: String::new() },
        ]);
        let generator = RetryingGenerator::new(flaky, fast_policy(3));

        let text = generator.generate("hi").await.unwrap();

        assert_eq!(text, "echo: hi");
        assert_eq!(generator.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_auth_failures() {
        let flaky = Flaky::new(vec![GenerationError::Auth("bad key".into())]);
        let generator = RetryingGenerator::new(flaky, fast_policy(5));

        let err = generator.generate("hi").await.unwrap_err();

        assert!(matches!(err, GenerationError::Auth(_)));
        assert_eq!(generator.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let flaky = Flaky::new(vec![
            GenerationError::RateLimited("1".into()),
            GenerationError::RateLimited("2".into()),
            GenerationError::RateLimited("3".into()),
        ]);
        let generator = RetryingGenerator::new(flaky, fast_policy(2));

        let err = generator.generate("hi").await.unwrap_err();

        assert!(matches!(err, GenerationError::RateLimited(ref body) if body == "2"));
        assert_eq!(generator.inner.calls.load(Ordering::SeqCst), 2);
    }
}
