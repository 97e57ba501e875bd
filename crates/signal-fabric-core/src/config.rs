//! In-memory bus configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default history size limit (100 MB).
const HISTORY_BYTES: usize = 100_000 * 1024;

/// Tuning for [`InMemoryBus`](crate::InMemoryBus).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Retained history budget; oldest messages are evicted first.
    pub history_bytes: usize,

    /// Largest accepted encoded value.
    pub max_message_bytes: usize,

    /// How long a receive waits for data before returning an empty batch.
    #[serde(with = "millis", rename = "poll_timeout_ms")]
    pub poll_timeout: Duration,

    /// Capacity of the wake-up channel shared by waiting receivers.
    pub wake_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            history_bytes: HISTORY_BYTES,
            max_message_bytes: 64 * 1024,
            poll_timeout: Duration::from_secs(110),
            wake_capacity: 1024,
        }
    }
}

impl BusConfig {
    /// Override the poll timeout.
    #[must_use]
    pub const fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Override the retained history budget.
    #[must_use]
    pub const fn with_history_bytes(mut self, history_bytes: usize) -> Self {
        self.history_bytes = history_bytes;
        self
    }

    /// Override the per-message size limit.
    #[must_use]
    pub const fn with_max_message_bytes(mut self, max_message_bytes: usize) -> Self {
        self.max_message_bytes = max_message_bytes;
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
