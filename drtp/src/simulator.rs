//! Fault-injecting transport for exercising loss recovery.
//!
//! Loopback never loses packets.  To exercise the Go-Back-N machinery without
//! depending on actual network conditions, [`Simulator`] wraps any
//! [`Transport`] and applies a configurable fault model to outbound
//! data-phase segments:
//!
//! | Fault       | Description                                   |
//! |-------------|-----------------------------------------------|
//! | Loss        | Drop a segment with probability `loss_rate`.  |
//! | Duplication | Send a segment twice with `duplicate_rate`.   |
//!
//! Only data segments (no flags set) are subject to faults.  The handshake and
//! teardown have no retry, so losing them would end the run rather than test
//! it.  With both rates at zero the simulator is a transparent pass-through.

use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SimulatorConfig;
use crate::packet::Packet;
use crate::socket::{Recv, SocketError, Transport};

#[derive(Debug)]
struct FaultState {
    rng: StdRng,
    dropped: u64,
    duplicated: u64,
}

/// What happens to one outbound segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fate {
    Drop,
    Deliver,
    Duplicate,
}

/// A fault-injecting wrapper around another transport.
#[derive(Debug)]
pub struct Simulator<T> {
    inner: T,
    config: SimulatorConfig,
    state: Mutex<FaultState>,
}

impl<T: Transport> Simulator<T> {
    /// Wrap `inner`.  A configured seed makes the fault pattern reproducible.
    pub fn new(inner: T, config: SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            inner,
            config,
            state: Mutex::new(FaultState {
                rng,
                dropped: 0,
                duplicated: 0,
            }),
        }
    }

    /// Borrow the wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Number of segments dropped so far.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    /// Number of segments sent twice so far.
    pub fn duplicated(&self) -> u64 {
        self.lock().duplicated
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FaultState> {
        // A poisoned lock only means another task panicked mid-roll; the
        // counters are still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn roll(&self, packet: &Packet) -> Fate {
        if packet.header.flags != 0 {
            return Fate::Deliver;
        }
        let mut state = self.lock();
        if self.config.loss_rate > 0.0 && state.rng.random_bool(self.config.loss_rate) {
            state.dropped += 1;
            Fate::Drop
        } else if self.config.duplicate_rate > 0.0
            && state.rng.random_bool(self.config.duplicate_rate)
        {
            state.duplicated += 1;
            Fate::Duplicate
        } else {
            Fate::Deliver
        }
    }
}

impl<T: Transport> Transport for Simulator<T> {
    async fn send_to(&self, packet: &Packet, dest: SocketAddr) -> Result<(), SocketError> {
        match self.roll(packet) {
            Fate::Drop => {
                log::debug!("[sim] dropped seq={} ack={}", packet.header.seq, packet.header.ack);
                Ok(())
            }
            Fate::Deliver => self.inner.send_to(packet, dest).await,
            Fate::Duplicate => {
                self.inner.send_to(packet, dest).await?;
                self.inner.send_to(packet, dest).await
            }
        }
    }

    async fn recv(&self, timeout: Option<Duration>) -> Result<Recv, SocketError> {
        self.inner.recv(timeout).await
    }
}
