//! Retry policy shared by every operation.

use crate::error::ReconcileResult;
use rand::Rng;
use std::time::Duration;
use tracing::warn;

/// Delay inserted between attempts.
///
/// Each delay is `base` plus a uniformly random jitter in `[0, jitter]`,
/// sampled per attempt so that concurrent reconciliations retrying after
/// the same outage do not hit the endpoint in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Fixed part of the delay.
    pub base: Duration,
    /// Upper bound of the random part.
    pub jitter: Duration,
}

impl Backoff {
    /// Creates a backoff.
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self { base, jitter }
    }

    /// Samples one delay.
    pub fn delay(&self) -> Duration {
        let max_jitter = u64::try_from(self.jitter.as_micros()).unwrap_or(u64::MAX);
        let jitter = rand::thread_rng().gen_range(0..=max_jitter);
        self.base + Duration::from_micros(jitter)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), Duration::from_micros(5000))
    }
}

/// How often, and how patiently, an operation is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. An operation runs at most
    /// `max_retries + 1` times.
    pub max_retries: u32,
    /// Delay between attempts, or `None` to retry immediately.
    pub backoff: Option<Backoff>,
}

impl RetryPolicy {
    /// Creates a policy with the default jittered backoff.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Some(Backoff::default()),
        }
    }

    /// Creates a policy that retries without waiting.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: None,
        }
    }

    /// Creates a single-attempt policy.
    pub fn no_retry() -> Self {
        Self::immediate(0)
    }

    /// Sets the backoff.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Removes the backoff.
    pub fn without_backoff(mut self) -> Self {
        self.backoff = None;
        self
    }

    /// Returns the total number of attempts allowed.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Returns the delay before the given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match (attempt, &self.backoff) {
            (0, _) | (_, None) => Duration::ZERO,
            (_, Some(backoff)) => backoff.delay(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Runs `op` under `policy`.
///
/// `op` receives the 0-indexed attempt number. Retryable failures are
/// logged and retried until the ceiling; the error of the last attempt is
/// returned unchanged. Non-retryable failures return at once.
pub fn with_retry<T>(
    policy: &RetryPolicy,
    mut op: impl FnMut(u32) -> ReconcileResult<T>,
) -> ReconcileResult<T> {
    let mut attempt = 0;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() || attempt >= policy.max_retries => return Err(err),
            Err(err) => {
                warn!(attempt, error = %err, "attempt failed, retrying");
                attempt += 1;
                let delay = policy.delay_for_attempt(attempt);
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
            }
        }
    }
}
