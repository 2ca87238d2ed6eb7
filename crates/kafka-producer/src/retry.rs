//! Bounded connection retry with an injectable sleep.

use crate::error::{PublisherError, Result};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Default number of connection attempts
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// Default wait between connection attempts
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(3);

/// How many times to try connecting and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            wait: DEFAULT_RETRY_WAIT,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, wait: Duration) -> Self {
        Self { max_attempts, wait }
    }

    /// Build a policy from a wait expressed in (fractional) seconds.
    pub fn from_secs_f64(max_attempts: u32, wait_secs: f64) -> Result<Self> {
        let wait = Duration::try_from_secs_f64(wait_secs).map_err(|e| {
            PublisherError::InvalidConfig(format!("invalid retry wait {wait_secs}s: {e}"))
        })?;
        Ok(Self::new(max_attempts, wait))
    }
}

/// Source of delays between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// All attempts failed.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    /// `None` only when the policy allowed zero attempts.
    pub last_error: Option<E>,
}

impl<E: fmt::Display> fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.last_error {
            Some(e) => write!(f, "gave up after {} attempts: {e}", self.attempts),
            None => write!(f, "no attempts were made"),
        }
    }
}

/// Run `attempt_fn` until it succeeds or `policy.max_attempts` is reached.
///
/// `attempt_fn` receives the 1-based attempt number. Between failed attempts
/// the routine sleeps `policy.wait`; there is no sleep after the final
/// failure. `target` names what is being connected to in log lines.
pub async fn retry_with_policy<T, E, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    target: &str,
    mut attempt_fn: F,
) -> std::result::Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: fmt::Display,
{
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts {
        match attempt_fn(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!("Connected to {target} after {attempt} attempts");
                }
                return Ok(value);
            }
            Err(e) => {
                if attempt < policy.max_attempts {
                    tracing::warn!(
                        "broker {target} unavailable (attempt {attempt}/{}): {e}; retrying in {}s",
                        policy.max_attempts,
                        policy.wait.as_secs_f64()
                    );
                    last_error = Some(e);
                    sleeper.sleep(policy.wait).await;
                } else {
                    tracing::warn!(
                        "broker {target} unavailable (attempt {attempt}/{}): {e}",
                        policy.max_attempts
                    );
                    last_error = Some(e);
                }
            }
        }
    }

    Err(RetryExhausted {
        attempts: policy.max_attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn total(&self) -> Duration {
            self.slept.lock().unwrap().iter().sum()
        }

        fn count(&self) -> usize {
            self.slept.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let policy = RetryPolicy::new(10, Duration::from_millis(1500));
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;

        let result = retry_with_policy(&policy, &sleeper, "localhost:9092", |attempt| {
            calls += 1;
            async move {
                if attempt <= 3 {
                    Err("NoBrokersAvailable")
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 4);
        assert_eq!(calls, 4);
        assert_eq!(sleeper.count(), 3);
        assert_eq!(sleeper.total(), Duration::from_millis(4500));
    }

    #[tokio::test]
    async fn test_first_attempt_success_does_not_sleep() {
        let policy = RetryPolicy::default();
        let sleeper = RecordingSleeper::default();

        let result: std::result::Result<&str, RetryExhausted<String>> =
            retry_with_policy(&policy, &sleeper, "broker", |_| async { Ok("connected") }).await;

        assert_eq!(result.unwrap(), "connected");
        assert_eq!(sleeper.count(), 0);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(5, Duration::from_secs(3));
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;

        let result: std::result::Result<(), _> =
            retry_with_policy(&policy, &sleeper, "broker", |attempt| {
                calls += 1;
                async move { Err(format!("refused #{attempt}")) }
            })
            .await;

        let exhausted = result.unwrap_err();
        assert_eq!(calls, 5);
        assert_eq!(exhausted.attempts, 5);
        assert_eq!(exhausted.last_error.as_deref(), Some("refused #5"));
        assert_eq!(sleeper.count(), 4);
        assert_eq!(
            exhausted.to_string(),
            "gave up after 5 attempts: refused #5"
        );
    }

    #[tokio::test]
    async fn test_zero_attempts_fails_without_trying() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;

        let result: std::result::Result<(), RetryExhausted<String>> =
            retry_with_policy(&policy, &sleeper, "broker", |_| {
                calls += 1;
                async { Ok(()) }
            })
            .await;

        let exhausted = result.unwrap_err();
        assert_eq!(calls, 0);
        assert!(exhausted.last_error.is_none());
        assert_eq!(sleeper.count(), 0);
    }

    #[test]
    fn test_policy_from_secs() {
        let policy = RetryPolicy::from_secs_f64(3, 0.25).unwrap();
        assert_eq!(policy.wait, Duration::from_millis(250));
        assert!(RetryPolicy::from_secs_f64(3, -1.0).is_err());
        assert!(RetryPolicy::from_secs_f64(3, f64::NAN).is_err());
    }
}
