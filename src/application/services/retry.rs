use std::{future::Future, time::Duration};

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::services::StorageError;

/// Upper bound for any single backoff wait.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Message fragments that mark a failure as transient.
pub const RETRYABLE_PATTERNS: &[&str] = &[
    "503",
    "502",
    "504",
    "429",
    "network",
    "timeout",
    "cpu too busy",
];

/// Case-insensitive substring match against [`RETRYABLE_PATTERNS`].
pub fn is_retryable_error(message: &str) -> bool {
    let message = message.to_lowercase();
    RETRYABLE_PATTERNS
        .iter()
        .any(|pattern| message.contains(pattern))
}

/// `min(base_ms * 2^(attempt-1) + jitter_ms, 30000)`. `attempt` is 1-based.
pub fn backoff_delay_ms(base_ms: u64, attempt: u32, jitter_ms: u64) -> u64 {
    let exponent = attempt.saturating_sub(1).min(63);
    let exponential = base_ms.saturating_mul(1u64 << exponent);
    exponential.saturating_add(jitter_ms).min(MAX_BACKOFF_MS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Jitter is drawn uniformly from `[0, max_jitter)`.
    pub max_jitter: Duration,
    /// Wait used by the pipeline loop after a failure the classifier does not
    /// consider transient.
    pub fallback_delay: Duration,
}

impl BackoffPolicy {
    /// Per-step retries for authorization and upload-target allocation.
    pub const fn step() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            max_jitter: Duration::from_millis(1_000),
            fallback_delay: Duration::from_millis(1_000),
        }
    }

    /// Outer allocate-then-transfer loop.
    pub const fn pipeline() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(2_000),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            max_jitter: Duration::from_millis(1_000),
            fallback_delay: Duration::from_millis(1_000),
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let jitter_ms = match self.max_jitter.as_millis() as u64 {
            0 => 0,
            max => rand::rng().random_range(0..max),
        };
        self.delay_with_jitter(attempt, jitter_ms)
    }

    pub fn delay_with_jitter(&self, attempt: u32, jitter_ms: u64) -> Duration {
        let delay = backoff_delay_ms(self.base_delay.as_millis() as u64, attempt, jitter_ms);
        Duration::from_millis(delay).min(self.max_delay)
    }
}

/// Runs `future` unless `cancel` fires first.
pub async fn with_cancel<T, F>(cancel: &CancellationToken, future: F) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StorageError::Cancelled),
        result = future => result,
    }
}

pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> Result<(), StorageError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StorageError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

/// Retries one provider call on transient failures only. Anything the
/// classifier rejects is returned on first sight.
pub async fn retry_step<T, F, Fut>(
    label: &str,
    policy: &BackoffPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let mut attempt = 1;
    loop {
        match with_cancel(cancel, operation()).await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    step = label,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "{} failed: {}, retrying",
                    label,
                    error
                );
                sleep_or_cancel(delay, cancel).await?;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast_policy(max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            max_jitter: Duration::ZERO,
            fallback_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn delay_follows_exponential_schedule() {
        assert_eq!(backoff_delay_ms(2_000, 1, 0), 2_000);
        assert_eq!(backoff_delay_ms(2_000, 2, 0), 4_000);
        assert_eq!(backoff_delay_ms(2_000, 3, 250), 8_250);
        assert_eq!(backoff_delay_ms(1_000, 1, 999), 1_999);
    }

    #[test]
    fn delay_is_capped_and_monotonic() {
        for base in [1_000, 2_000] {
            for jitter in [0, 500, 999] {
                let mut previous = 0;
                for attempt in 1..=64 {
                    let delay = backoff_delay_ms(base, attempt, jitter);
                    assert!(delay <= MAX_BACKOFF_MS);
                    assert!(delay >= previous, "attempt {attempt} went backwards");
                    previous = delay;
                }
                assert_eq!(previous, MAX_BACKOFF_MS);
            }
        }
    }

    #[test]
    fn random_delays_stay_in_bounds() {
        let policy = BackoffPolicy::pipeline();
        for attempt in 1..=10 {
            for _ in 0..50 {
                let delay = policy.delay_for(attempt).as_millis() as u64;
                let floor = backoff_delay_ms(2_000, attempt, 0);
                assert!(delay >= floor);
                assert!(delay <= MAX_BACKOFF_MS);
                assert!(delay < floor + 1_000 || delay == MAX_BACKOFF_MS);
            }
        }
    }

    #[test]
    fn classifier_matches_transient_patterns() {
        for message in [
            "provider responded with status 503: busy",
            "Bad Gateway 502",
            "status 504",
            "429 Too Many Requests",
            "Network unreachable",
            "request TIMEOUT after 30s",
            "CPU too busy, try again",
        ] {
            assert!(is_retryable_error(message), "{message}");
        }
    }

    #[test]
    fn classifier_rejects_other_messages() {
        for message in [
            "provider responded with status 401: unauthorized",
            "bad_request: bucketId invalid",
            "status 500",
            "",
        ] {
            assert!(!is_retryable_error(message), "{message}");
        }
    }

    #[tokio::test]
    async fn retry_step_recovers_from_transient_failures() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result = retry_step("authorize", &fast_policy(3), &cancel, || {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if call < 3 {
                    Err(StorageError::Network("connection reset".into()))
                } else {
                    Ok(call)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_step_stops_at_budget() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result: Result<(), _> = retry_step("allocate", &fast_policy(3), &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(StorageError::Status {
                    status: 503,
                    body: "busy".into(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(StorageError::Status { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_step_fails_fast_on_fatal_errors() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();

        let result: Result<(), _> = retry_step("authorize", &fast_policy(3), &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(StorageError::Status {
                    status: 401,
                    body: "unauthorized".into(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(StorageError::Status { status: 401, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_token_aborts_before_calling() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<(), _> = retry_step("authorize", &fast_policy(3), &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

        assert!(matches!(result, Err(StorageError::Cancelled)));
    }

    #[tokio::test]
    async fn sleep_is_interrupted_by_cancellation() {
        let cancel = CancellationToken::new();
        let child = cancel.child_token();
        cancel.cancel();

        let result = sleep_or_cancel(Duration::from_secs(60), &child).await;
        assert!(matches!(result, Err(StorageError::Cancelled)));
    }
}
