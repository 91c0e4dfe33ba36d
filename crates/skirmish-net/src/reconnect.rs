//! Follower-side reconnection: exponential backoff with jitter.
//!
//! This is a pure retry policy. What gets re-synchronized afterwards is the
//! host's normal join handshake (a fresh full snapshot), so a reconnection
//! is indistinguishable from a fresh join at the protocol level.

use std::time::Duration;

use rand::Rng;

/// Backoff parameters. Defaults: 1 s base, doubling, 30 s cap, 5 attempts,
/// up to 1 s of additive jitter.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay before the first attempt.
    pub base_delay: Duration,
    /// Upper bound on any computed delay (jitter excluded).
    pub max_delay: Duration,
    /// Consecutive failures tolerated before giving up.
    pub max_attempts: u32,
    /// Uniform random addition in `[0, jitter)` on every delay.
    pub jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 5,
            jitter: Duration::from_millis(1_000),
        }
    }
}

impl BackoffPolicy {
    /// Deterministic part of the delay for a given attempt number:
    /// `min(max_delay, base_delay * 2^attempt)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let doubled = base_ms.saturating_mul(1u64 << attempt.min(30));
        Duration::from_millis(doubled.min(self.max_delay.as_millis() as u64))
    }

    fn jittered(&self, attempt: u32) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms > 0 {
            rand::rng().random_range(0..jitter_ms)
        } else {
            0
        };
        self.delay_for(attempt) + Duration::from_millis(extra)
    }
}

/// Link state as seen by the embedding session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// The transport session is up.
    Connected,
    /// Lost the session; attempt number of the retry in flight.
    Reconnecting {
        /// Zero-based attempt counter.
        attempt: u32,
    },
}

/// Tracks attempts across a reconnection episode.
pub struct ReconnectController {
    policy: BackoffPolicy,
    state: LinkState,
}

impl ReconnectController {
    /// Create a controller in the `Connected` state.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            state: LinkState::Connected,
        }
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Record a connection loss (or a failed attempt) and return the delay
    /// before the next attempt, or `None` once attempts are exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let attempt = match self.state {
            LinkState::Connected => 0,
            LinkState::Reconnecting { attempt } => attempt + 1,
        };
        if attempt >= self.policy.max_attempts {
            return None;
        }
        self.state = LinkState::Reconnecting { attempt };
        Some(self.policy.jittered(attempt))
    }

    /// Record a successful reconnection: attempt counter resets.
    pub fn on_reconnected(&mut self) {
        self.state = LinkState::Connected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> BackoffPolicy {
        BackoffPolicy {
            jitter: Duration::ZERO,
            ..Default::default()
        }
    }

    #[test]
    fn test_delays_are_exponential() {
        let policy = no_jitter();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(4), Duration::from_secs(16));
    }

    #[test]
    fn test_delays_are_monotonic_and_capped() {
        let policy = no_jitter();
        let mut prev = Duration::ZERO;
        for attempt in 0..16 {
            let d = policy.delay_for(attempt);
            assert!(d >= prev, "delay(attempt) must be non-decreasing");
            assert!(d <= Duration::from_secs(30), "delay capped at max_delay");
            prev = d;
        }
    }

    #[test]
    fn test_no_sixth_attempt() {
        let mut controller = ReconnectController::new(no_jitter());
        for _ in 0..5 {
            assert!(controller.next_delay().is_some());
        }
        assert!(
            controller.next_delay().is_none(),
            "no sixth attempt after five consecutive failures"
        );
    }

    #[test]
    fn test_success_resets_attempts() {
        let mut controller = ReconnectController::new(no_jitter());
        controller.next_delay();
        controller.next_delay();
        assert_eq!(controller.state(), LinkState::Reconnecting { attempt: 1 });

        controller.on_reconnected();
        assert_eq!(controller.state(), LinkState::Connected);

        // A later loss starts from attempt 0 again.
        assert_eq!(controller.next_delay(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_jitter_is_additive_and_bounded() {
        let policy = BackoffPolicy::default();
        for _ in 0..50 {
            let d = policy.jittered(0);
            assert!(d >= Duration::from_secs(1));
            assert!(d < Duration::from_secs(2), "jitter adds less than 1 s");
        }
    }
}
