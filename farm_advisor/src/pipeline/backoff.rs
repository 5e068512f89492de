//! Delay policy between attempts and the sleep primitive it runs on.
//!
//! Both are traits so tests can record the requested delays instead of
//! waiting them out.

use std::time::Duration;

use async_trait::async_trait;

pub trait Backoff: Send + Sync {
    /// Delay to wait after attempt number `failed_attempt` (1-based) failed.
    fn delay(&self, failed_attempt: u32) -> Duration;
}

/// `failed_attempt × step`: 1 s, 2 s, 3 s, ... with the default step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    pub step: Duration,
}

impl LinearBackoff {
    pub fn new(step: Duration) -> Self {
        Self { step }
    }
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self {
            step: Duration::from_millis(1000),
        }
    }
}

impl Backoff for LinearBackoff {
    fn delay(&self, failed_attempt: u32) -> Duration {
        self.step.saturating_mul(failed_attempt)
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
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
    fn linear_steps() {
        let b = LinearBackoff::default();
        assert_eq!(b.delay(1), Duration::from_secs(1));
        assert_eq!(b.delay(2), Duration::from_secs(2));
        assert_eq!(LinearBackoff::new(Duration::from_millis(250)).delay(3), Duration::from_millis(750));
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        let b = LinearBackoff::new(Duration::MAX);
        assert_eq!(b.delay(2), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_sleeper_waits() {
        let start = tokio::time::Instant::now();
        TokioSleeper.sleep(Duration::from_secs(2)).await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
