//! Pacing policy for rate-limited providers
//!
//! Each phase owns one [`Pacer`] per provider for the duration of a run. The
//! pacer enforces a fixed minimum interval between consecutive calls (no wait
//! before the first call) and an optional cooldown between fixed-size batches.
//! Intervals are fixed; there is no adaptive backoff.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tunegraph_common::config::PacingOverrides;

/// Interval, batch size and inter-batch cooldown for one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    /// Minimum delay between consecutive calls
    pub interval: Duration,
    /// Items per batch (1 means no batching)
    pub batch_size: usize,
    /// Pause between batches
    pub cooldown: Duration,
}

impl PacingPolicy {
    /// Last.fm: 4 requests per second
    pub const LASTFM: PacingPolicy = PacingPolicy {
        interval: Duration::from_millis(250),
        batch_size: 1,
        cooldown: Duration::ZERO,
    };

    /// AcousticBrainz bulk endpoint: up to 25 ids per call
    pub const ACOUSTICBRAINZ: PacingPolicy = PacingPolicy {
        interval: Duration::from_millis(100),
        batch_size: 25,
        cooldown: Duration::ZERO,
    };

    /// AcoustID: 3 requests per second
    pub const ACOUSTID: PacingPolicy = PacingPolicy {
        interval: Duration::from_millis(340),
        batch_size: 1,
        cooldown: Duration::ZERO,
    };

    /// Local tempo extraction: CPU-bound, rest between batches
    pub const LOCAL_TEMPO: PacingPolicy = PacingPolicy {
        interval: Duration::ZERO,
        batch_size: 25,
        cooldown: Duration::from_secs(10),
    };

    /// No pacing at all (tests and dry runs)
    pub const UNPACED: PacingPolicy = PacingPolicy {
        interval: Duration::ZERO,
        batch_size: 1,
        cooldown: Duration::ZERO,
    };

    /// Apply configured overrides on top of this policy
    pub fn with_overrides(self, overrides: &PacingOverrides) -> Self {
        Self {
            interval: overrides
                .interval_ms
                .map(Duration::from_millis)
                .unwrap_or(self.interval),
            batch_size: overrides.batch_size.unwrap_or(self.batch_size).max(1),
            cooldown: overrides
                .cooldown_secs
                .map(Duration::from_secs)
                .unwrap_or(self.cooldown),
        }
    }
}

/// Enforces a [`PacingPolicy`] across consecutive calls
pub struct Pacer {
    name: &'static str,
    policy: PacingPolicy,
    last_request: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(name: &'static str, policy: PacingPolicy) -> Self {
        Self {
            name,
            policy,
            last_request: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> &PacingPolicy {
        &self.policy
    }

    /// Wait until the interval since the previous call has elapsed
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.policy.interval {
                let wait_time = self.policy.interval - elapsed;
                tracing::trace!(provider = self.name, "Pacing: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// Rest between batches
    pub async fn cool_down(&self) {
        if self.policy.cooldown.is_zero() {
            return;
        }

        tracing::info!(
            provider = self.name,
            cooldown_secs = self.policy.cooldown.as_secs_f64(),
            "Cooling down between batches"
        );
        tokio::time::sleep(self.policy.cooldown).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_call_is_immediate_then_paced() {
        let pacer = Pacer::new(
            "test",
            PacingPolicy {
                interval: Duration::from_millis(100),
                ..PacingPolicy::UNPACED
            },
        );

        let start = Instant::now();
        pacer.wait().await;
        let first_elapsed = start.elapsed();

        pacer.wait().await;
        let second_elapsed = start.elapsed();

        assert!(first_elapsed.as_millis() < 50);
        assert!(second_elapsed.as_millis() >= 95);
    }

    #[tokio::test]
    async fn test_zero_cooldown_returns_immediately() {
        let pacer = Pacer::new("test", PacingPolicy::UNPACED);

        let start = Instant::now();
        pacer.cool_down().await;
        assert!(start.elapsed().as_millis() < 50);
    }

    #[test]
    fn test_overrides_replace_only_set_fields() {
        let overrides = PacingOverrides {
            interval_ms: None,
            batch_size: Some(10),
            cooldown_secs: Some(3),
        };

        let policy = PacingPolicy::LOCAL_TEMPO.with_overrides(&overrides);
        assert_eq!(policy.interval, Duration::ZERO);
        assert_eq!(policy.batch_size, 10);
        assert_eq!(policy.cooldown, Duration::from_secs(3));
    }

    #[test]
    fn test_zero_batch_size_clamped() {
        let overrides = PacingOverrides {
            batch_size: Some(0),
            ..Default::default()
        };
        assert_eq!(PacingPolicy::LASTFM.with_overrides(&overrides).batch_size, 1);
    }
}
