//! Effective throughput of one transfer.
//!
//! The measurement starts when the first payload is written to the sink and
//! stops when the FIN arrives.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// `bytes * 8 / (seconds * 1_000_000)`, or `None` when nothing was moved or no
/// time elapsed.
pub fn megabits_per_second(bytes: u64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if bytes == 0 || secs <= 0.0 {
        return None;
    }
    Some((bytes as f64 * 8.0) / (secs * 1_000_000.0))
}

/// Final throughput figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Throughput {
    Measured {
        bytes: u64,
        elapsed: Duration,
        mbps: f64,
    },
    /// No data segment was received, or the measurement window was empty.
    NoData,
}

impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measured { mbps, .. } => write!(f, "{mbps:.2} Mbps"),
            Self::NoData => f.write_str("no data transferred"),
        }
    }
}

/// Accumulates payload bytes between the first write and the FIN.
#[derive(Debug, Clone, Default)]
pub struct ThroughputMeter {
    started: Option<Instant>,
    stopped: Option<Instant>,
    bytes: u64,
}

impl ThroughputMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `bytes` written at `now`; the first call starts the clock.
    pub fn record(&mut self, bytes: usize, now: Instant) {
        self.started.get_or_insert(now);
        self.bytes += bytes as u64;
    }

    /// Stop the clock.  Later calls keep the first stop time.
    pub fn stop(&mut self, now: Instant) {
        self.stopped.get_or_insert(now);
    }

    /// Payload bytes recorded so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn report(&self) -> Throughput {
        let (Some(start), Some(stop)) = (self.started, self.stopped) else {
            return Throughput::NoData;
        };
        let elapsed = stop.saturating_duration_since(start);
        match megabits_per_second(self.bytes, elapsed) {
            Some(mbps) => Throughput::Measured {
                bytes: self.bytes,
                elapsed,
                mbps,
            },
            None => Throughput::NoData,
        }
    }
}
