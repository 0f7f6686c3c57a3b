//! Retransmission timer.
//!
//! A connection has exactly one [`RetransmitTimer`]: it bounds how long the
//! sender waits for an acknowledgement before re-issuing the whole
//! outstanding window.  The timer is a plain value owned by the sending loop;
//! it never spawns a task or fires on its own.  The loop asks it
//! whether the deadline has passed and how long it may still block.

use std::time::Duration;

use tokio::time::Instant;

/// Fixed retransmission interval (400 ms).
pub const RETRANSMIT_TIMEOUT: Duration = Duration::from_millis(400);

/// Single-shot elapsed-time gate.
#[derive(Debug, Clone, Copy)]
pub struct RetransmitTimer {
    timeout: Duration,
    started_at: Instant,
}

impl Default for RetransmitTimer {
    fn default() -> Self {
        Self::new(RETRANSMIT_TIMEOUT)
    }
}

impl RetransmitTimer {
    /// Create a timer that is already running from "now".
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            started_at: Instant::now(),
        }
    }

    /// The configured interval.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Restart the timer from the current instant.
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    /// Restart the timer from `now`.
    pub fn start_at(&mut self, now: Instant) {
        self.started_at = now;
    }

    /// Instant at which the timer expires.
    pub fn deadline(&self) -> Instant {
        self.started_at + self.timeout
    }

    /// `true` once at least one full interval has passed since the last start.
    pub fn expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started_at) >= self.timeout
    }

    /// Time left before expiry; zero once expired.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline().saturating_duration_since(now)
    }
}
