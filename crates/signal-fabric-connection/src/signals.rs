//! Active signal set computation.

use std::collections::HashSet;

use signal_fabric_core::Signal;

use crate::GroupSet;

/// Computes the signals a connection listens on.
#[derive(Debug, Clone)]
pub struct SignalAggregator {
    base_signal: Signal,
    static_signals: Vec<Signal>,
}

impl SignalAggregator {
    /// Create an aggregator for a connection's identity signals and base signal.
    #[must_use]
    pub const fn new(base_signal: Signal, static_signals: Vec<Signal>) -> Self {
        Self {
            base_signal,
            static_signals,
        }
    }

    /// The shared base signal.
    #[must_use]
    pub fn base_signal(&self) -> &str {
        &self.base_signal
    }

    /// Identity signals owned by this connection.
    #[must_use]
    pub fn static_signals(&self) -> &[Signal] {
        &self.static_signals
    }

    /// Identity signals, the base signal and current groups.
    ///
    /// Reads a fresh group snapshot on every call.
    #[must_use]
    pub fn signals(&self, groups: &GroupSet) -> HashSet<Signal> {
        self.static_signals
            .iter()
            .cloned()
            .chain(std::iter::once(self.base_signal.clone()))
            .chain(groups.snapshot())
            .collect()
    }
}
