//! Timeout configuration for send attempts.
//!
//! Two layers: [`TimeoutConfig`] is the serialized form with defaults, and
//! [`TimeoutSettings`] is the live holder shared with in-flight workers.
//! The holder is injected into the sender at construction; there is no
//! ambient module-level state.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use serde::{Deserialize, Serialize};

/// Serialized timeout configuration, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Timeout for establishing the connection (including the TLS
    /// handshake and server greeting).
    #[serde(default = "defaults::connect_secs")]
    pub connect_secs: f64,

    /// Timeout applied to each subsequent protocol operation
    /// (authentication, envelope commands, message transfer).
    #[serde(default = "defaults::send_secs")]
    pub send_secs: f64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: defaults::connect_secs(),
            send_secs: defaults::send_secs(),
        }
    }
}

/// Live timeout settings, readable and updatable while a run is in flight.
///
/// Values are stored as `f64` bit patterns in atomics: workers read the
/// current values at the moment an attempt is dispatched, so an update made
/// mid-run applies to subsequently dispatched operations and never
/// retroactively to one already in progress.
#[derive(Debug)]
pub struct TimeoutSettings {
    connect: AtomicU64,
    send: AtomicU64,
}

impl TimeoutSettings {
    #[must_use]
    pub fn new(config: TimeoutConfig) -> Self {
        Self {
            connect: AtomicU64::new(config.connect_secs.to_bits()),
            send: AtomicU64::new(config.send_secs.to_bits()),
        }
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs_f64(f64::from_bits(self.connect.load(Ordering::Relaxed)))
    }

    #[must_use]
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs_f64(f64::from_bits(self.send.load(Ordering::Relaxed)))
    }

    /// Updates the connect timeout. Non-positive or non-finite values are
    /// rejected and logged.
    pub fn set_connect_timeout(&self, secs: f64) {
        if Self::valid(secs) {
            self.connect.store(secs.to_bits(), Ordering::Relaxed);
        } else {
            tracing::warn!(secs, "Ignoring invalid connect timeout");
        }
    }

    /// Updates the send timeout. Non-positive or non-finite values are
    /// rejected and logged.
    pub fn set_send_timeout(&self, secs: f64) {
        if Self::valid(secs) {
            self.send.store(secs.to_bits(), Ordering::Relaxed);
        } else {
            tracing::warn!(secs, "Ignoring invalid send timeout");
        }
    }

    /// Copies the current values back into their serialized form.
    #[must_use]
    pub fn snapshot(&self) -> TimeoutConfig {
        TimeoutConfig {
            connect_secs: f64::from_bits(self.connect.load(Ordering::Relaxed)),
            send_secs: f64::from_bits(self.send.load(Ordering::Relaxed)),
        }
    }

    fn valid(secs: f64) -> bool {
        secs.is_finite() && secs > 0.0
    }
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self::new(TimeoutConfig::default())
    }
}

impl From<TimeoutConfig> for TimeoutSettings {
    fn from(config: TimeoutConfig) -> Self {
        Self::new(config)
    }
}

mod defaults {
    pub(super) const fn connect_secs() -> f64 {
        1.0
    }

    pub(super) const fn send_secs() -> f64 {
        1.0
    }
}
