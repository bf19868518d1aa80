//! Connection retry policy.

use std::time::Duration;

use async_trait::async_trait;

/// How the delay between attempts evolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failure.
    Fixed,
    /// Delay doubles after each failure, capped at `max_delay`.
    Exponential { max_delay: Duration },
}

/// Policy for re-dialing the desktop app until it is listening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, `None` for unlimited. `Some(0)` still makes
    /// one attempt.
    pub max_attempts: Option<u32>,
    /// Base delay between attempts.
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(5))
    }
}

impl RetryPolicy {
    /// Unlimited attempts with a constant delay.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            max_attempts: None,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// Unlimited attempts with a doubling delay.
    pub fn exponential(delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: None,
            delay,
            backoff: Backoff::Exponential { max_delay },
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Whether another attempt may follow failed attempt number `attempt`
    /// (1-based).
    pub fn allows_retry(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max_delay } => {
                let shift = attempt.saturating_sub(1).min(31);
                self.delay.saturating_mul(1u32 << shift).min(max_delay)
            }
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unlimited_fixed_five_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.backoff, Backoff::Fixed);
        assert_eq!(policy.delay_after(1), Duration::from_secs(5));
        assert_eq!(policy.delay_after(100), Duration::from_secs(5));
        assert!(policy.allows_retry(u32::MAX - 1));
    }

    #[test]
    fn exponential_doubles_and_caps() {
        let policy = RetryPolicy::exponential(Duration::from_secs(1), Duration::from_secs(30));
        let delays: Vec<u64> = (1..=7).map(|n| policy.delay_after(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn exponential_does_not_overflow() {
        let policy = RetryPolicy::exponential(Duration::from_secs(1), Duration::from_secs(60));
        assert_eq!(policy.delay_after(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn max_attempts_bounds_retries() {
        let policy = RetryPolicy::default().with_max_attempts(3);
        assert!(policy.allows_retry(1));
        assert!(policy.allows_retry(2));
        assert!(!policy.allows_retry(3));
    }

    #[test]
    fn zero_max_attempts_allows_no_retry() {
        let policy = RetryPolicy::default().with_max_attempts(0);
        assert!(!policy.allows_retry(1));
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_sleeper_waits_on_timer() {
        let start = tokio::time::Instant::now();
        TokioSleeper.sleep(Duration::from_secs(5)).await;
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
