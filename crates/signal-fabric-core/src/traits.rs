//! Message bus contract consumed by connections.

use std::collections::HashSet;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Named channel on the bus.
pub type Signal = String;

/// Cursor token. Totally ordered across every signal of one bus.
pub type MessageId = u64;

/// A message as stored and delivered by the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Cursor of this message.
    pub id: MessageId,
    /// Publisher (connection id).
    pub source: String,
    /// Signal the message was published on.
    pub signal: Signal,
    /// Opaque encoded value.
    pub value: Bytes,
}

impl Message {
    /// Approximate retained size in bytes.
    #[must_use]
    pub fn approx_bytes(&self) -> usize {
        const OVERHEAD: usize = 16;
        self.value
            .len()
            .saturating_add(self.signal.len())
            .saturating_add(self.source.len())
            .saturating_add(OVERHEAD)
    }
}

/// Result of a bus query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBatch {
    /// Messages in cursor order.
    pub messages: Vec<Message>,
    /// Cursor to resume from.
    pub last_message_id: MessageId,
}

impl MessageBatch {
    /// Empty batch positioned at `last_message_id` (poll timed out).
    #[must_use]
    pub const fn empty(last_message_id: MessageId) -> Self {
        Self {
            messages: Vec::new(),
            last_message_id,
        }
    }

    /// Whether the batch carries no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Bus error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BusError {
    #[error("Receive cancelled")]
    Cancelled,
    #[error("Payload too large: {size} bytes (limit {limit})")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("Bus error: {0}")]
    Internal(String),
}

/// Trait for message bus backends.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Append `value` to `signal` on behalf of `source`.
    async fn publish(
        &self,
        source: &str,
        signal: &str,
        value: Bytes,
    ) -> Result<MessageId, BusError>;

    /// Fetch messages on any of `signals` published after `since`.
    ///
    /// `since = None` starts at the current head. Suspends until at least one
    /// message is available, `cancel` fires, or the backend's poll timeout
    /// elapses (in which case an empty batch is returned).
    async fn get_messages(
        &self,
        signals: &HashSet<Signal>,
        since: Option<MessageId>,
        cancel: &CancellationToken,
    ) -> Result<MessageBatch, BusError>;
}
