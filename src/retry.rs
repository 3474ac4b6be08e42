//! Exponential backoff for registry calls
//!
//! The budget belongs to one logical call: every `run` starts from attempt 1
//! and nothing is shared between registries or candidates.

use crate::registry::SearchError;
use crate::schema::SourceId;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Pause before retry number `retry` (1 = first retry): base * 2^(retry-1), capped
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `op`, retrying transient failures until the attempts run out
    pub async fn run<T, F, Fut>(&self, source: SourceId, mut op: F) -> Result<T, SearchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SearchError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        source = %source,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "registry call failed, retrying"
                    );
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
    use std::sync::Arc;

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for(2), Duration::from_secs(8));
        assert_eq!(policy.delay_for(3), Duration::from_secs(10));
        assert_eq!(policy.delay_for(40), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let started = tokio::time::Instant::now();

        let result = RetryPolicy::default()
            .run(SourceId::Judilibre, || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(SearchError::Server {
                            status: 503,
                            body: String::new(),
                        })
                    } else {
                        Ok("found")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("found"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 4s then 8s of backoff on the paused clock
        assert!(started.elapsed() >= Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), _> = RetryPolicy::default()
            .run(SourceId::Judilibre, || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(SearchError::Timeout(Duration::from_secs(30)))
                }
            })
            .await;

        assert_eq!(result, Err(SearchError::Timeout(Duration::from_secs(30))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), _> = RetryPolicy::default()
            .run(SourceId::Legifrance, || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(SearchError::Rejected {
                        status: 400,
                        body: String::new(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(SearchError::Rejected { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::new(0, Duration::from_millis(1), Duration::from_millis(1));
        let result = policy
            .run(SourceId::Judilibre, || async { Ok::<_, SearchError>(1) })
            .await;
        assert_eq!(result, Ok(1));
    }
}
