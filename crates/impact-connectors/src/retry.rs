//! Timeout and exponential-backoff retry for collaborator calls.

use std::future::Future;
use std::time::Duration;

use impact_core::config::RetryConfig;
use rand::Rng;

use crate::error::ConnectorError;

const MAX_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            attempts: config.attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Delay before attempt `attempt + 1`: base · 2^(attempt-1), capped,
    /// plus up to half the base delay of jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        let jitter_ms = (self.base_delay.as_millis() / 2) as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        exp.min(MAX_BACKOFF) + Duration::from_millis(jitter)
    }

    /// Run `op` until it succeeds, fails permanently, or the attempts are
    /// spent. Each attempt is bounded by `timeout`.
    pub async fn run<T, F, Fut>(&self, collaborator: &'static str, op: F) -> Result<T, ConnectorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ConnectorError>>,
    {
        self.run_where(collaborator, ConnectorError::is_transient, op)
            .await
    }

    /// Like [`run`](Self::run), but only errors accepted by `retryable` are
    /// retried.
    pub async fn run_where<T, F, Fut, R>(
        &self,
        collaborator: &'static str,
        retryable: R,
        mut op: F,
    ) -> Result<T, ConnectorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ConnectorError>>,
        R: Fn(&ConnectorError) -> bool,
    {
        let mut attempt = 1;
        loop {
            let result = match tokio::time::timeout(self.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(ConnectorError::Timeout {
                    collaborator,
                    after: self.timeout,
                }),
            };
            match result {
                Ok(value) => return Ok(value),
                Err(err) if retryable(&err) && attempt < self.attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        collaborator,
                        attempt,
                        attempts = self.attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient collaborator failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_millis(200),
        }
    }

    fn unavailable() -> ConnectorError {
        ConnectorError::Http {
            collaborator: "test",
            status: 503,
            body: String::new(),
        }
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let out = fast(3)
            .run("test", || {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(unavailable())
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(out, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_the_last_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let err = fast(2)
            .run("test", || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(unavailable())
                }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Http { status: 503, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let _ = fast(5)
            .run("test", || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(ConnectorError::Http {
                        collaborator: "test",
                        status: 400,
                        body: String::new(),
                    })
                }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let policy = RetryPolicy {
            attempts: 2,
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_millis(20),
        };
        let err = policy
            .run("test", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, ConnectorError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Timeout { .. }));
    }

    #[tokio::test]
    async fn run_where_skips_rejected_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let policy = RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_millis(20),
        };
        let err = policy
            .run_where(
                "test",
                |e| !matches!(e, ConnectorError::Timeout { .. }),
                || {
                    let c = c.clone();
                    async move {
                        c.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        Ok::<_, ConnectorError>(())
                    }
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Timeout { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let policy = RetryPolicy {
            attempts: 10,
            base_delay: Duration::from_millis(100),
            timeout: Duration::from_secs(1),
        };
        assert!(policy.backoff(1) >= Duration::from_millis(100));
        assert!(policy.backoff(3) >= Duration::from_millis(400));
        assert!(policy.backoff(20) <= MAX_BACKOFF + Duration::from_millis(50));
    }
}
