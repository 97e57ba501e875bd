//! In-memory message bus with bounded history.

use std::{
    collections::{HashSet, VecDeque},
    sync::{PoisonError, RwLock},
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use crate::{
    BusConfig,
    traits::{BusError, Message, MessageBatch, MessageBus, MessageId, Signal},
};

struct Inner {
    history: VecDeque<Message>,
    total_bytes: usize,
    head: MessageId,
}

/// Message bus backed by process memory.
///
/// Every publish gets the next global cursor, so a query over any set of
/// signals sees one totally ordered stream. Waiting receivers are woken
/// through a broadcast channel carrying the new cursor.
pub struct InMemoryBus {
    inner: RwLock<Inner>,
    sender: broadcast::Sender<MessageId>,
    config: BusConfig,
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBus {
    /// Create a bus with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Create a bus with the given configuration.
    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.wake_capacity.max(1));
        Self {
            inner: RwLock::new(Inner {
                history: VecDeque::with_capacity(32),
                total_bytes: 0,
                head: 0,
            }),
            sender,
            config,
        }
    }

    /// Bus configuration.
    #[must_use]
    pub const fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Cursor of the most recent publish (0 if nothing was published).
    #[must_use]
    pub fn head(&self) -> MessageId {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .head
    }

    /// Number of retained messages.
    #[must_use]
    pub fn retained(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .len()
    }

    fn append(&self, source: &str, signal: &str, value: Bytes) -> MessageId {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.head += 1;
        let msg = Message {
            id: inner.head,
            source: source.to_string(),
            signal: signal.to_string(),
            value,
        };
        let bytes = msg.approx_bytes();

        while inner.total_bytes.saturating_add(bytes) > self.config.history_bytes {
            if let Some(front) = inner.history.pop_front() {
                inner.total_bytes = inner.total_bytes.saturating_sub(front.approx_bytes());
            } else {
                break;
            }
        }
        inner.history.push_back(msg);
        inner.total_bytes = inner.total_bytes.saturating_add(bytes);
        inner.head
    }

    fn collect(&self, signals: &HashSet<Signal>, since: MessageId) -> MessageBatch {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let start = inner.history.partition_point(|m| m.id <= since);
        let messages: Vec<Message> = inner
            .history
            .range(start..)
            .filter(|m| signals.contains(&m.signal))
            .cloned()
            .collect();
        let last_message_id = messages.last().map_or(since, |m| m.id);
        MessageBatch {
            messages,
            last_message_id,
        }
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(
        &self,
        source: &str,
        signal: &str,
        value: Bytes,
    ) -> Result<MessageId, BusError> {
        if value.len() > self.config.max_message_bytes {
            return Err(BusError::PayloadTooLarge {
                size: value.len(),
                limit: self.config.max_message_bytes,
            });
        }

        let id = self.append(source, signal, value);
        // No receivers just means nobody is polling right now.
        let _ = self.sender.send(id);
        tracing::debug!(source, signal, id, "published message");
        Ok(id)
    }

    async fn get_messages(
        &self,
        signals: &HashSet<Signal>,
        since: Option<MessageId>,
        cancel: &CancellationToken,
    ) -> Result<MessageBatch, BusError> {
        // Subscribe before the first scan so a publish racing with it still wakes us.
        let mut rx = self.sender.subscribe();
        let since = since.unwrap_or_else(|| self.head());
        let deadline = tokio::time::Instant::now() + self.config.poll_timeout;

        loop {
            let batch = self.collect(signals, since);
            if !batch.is_empty() {
                return Ok(batch);
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(BusError::Cancelled),
                () = tokio::time::sleep_until(deadline) => {
                    tracing::debug!(since, "poll timed out");
                    return Ok(MessageBatch::empty(since));
                }
                woke = rx.recv() => match woke {
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => {
                        return Err(BusError::Internal("bus closed".to_string()));
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio_test::{assert_err, assert_ok};

    use super::*;

    fn signals(names: &[&str]) -> HashSet<Signal> {
        names.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_merges_signals_in_cursor_order() {
        let bus = InMemoryBus::new();
        bus.publish("a", "s1", Bytes::from_static(b"1")).await.unwrap();
        bus.publish("a", "other", Bytes::from_static(b"x")).await.unwrap();
        bus.publish("b", "s2", Bytes::from_static(b"2")).await.unwrap();
        bus.publish("a", "s1", Bytes::from_static(b"3")).await.unwrap();

        let batch = bus
            .get_messages(&signals(&["s1", "s2"]), Some(0), &CancellationToken::new())
            .await
            .unwrap();

        let ids: Vec<_> = batch.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
        assert_eq!(batch.last_message_id, 4);
        assert_eq!(batch.messages[1].source, "b");
    }

    #[tokio::test]
    async fn test_resumes_after_cursor() {
        let bus = InMemoryBus::new();
        for i in 0..5u8 {
            bus.publish("a", "s", Bytes::from(vec![i])).await.unwrap();
        }

        let batch = bus
            .get_messages(&signals(&["s"]), Some(3), &CancellationToken::new())
            .await
            .unwrap();
        let ids: Vec<_> = batch.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![4, 5]);
    }

    #[tokio::test]
    async fn test_tail_waits_for_new_message() {
        let bus = Arc::new(InMemoryBus::new());
        bus.publish("a", "s", Bytes::from_static(b"old")).await.unwrap();

        let waiter = {
            let bus = Arc::clone(&bus);
            tokio::spawn(async move {
                bus.get_messages(&signals(&["s"]), None, &CancellationToken::new())
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        bus.publish("a", "s", Bytes::from_static(b"new")).await.unwrap();

        let batch = waiter.await.unwrap().unwrap();
        assert_eq!(batch.messages.len(), 1);
        assert_eq!(batch.messages[0].value, Bytes::from_static(b"new"));
        assert_eq!(batch.last_message_id, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_empty_batch() {
        let bus = InMemoryBus::with_config(
            BusConfig::default().with_poll_timeout(Duration::from_secs(5)),
        );
        bus.publish("a", "unrelated", Bytes::from_static(b"x")).await.unwrap();

        let batch = bus
            .get_messages(&signals(&["s"]), Some(0), &CancellationToken::new())
            .await
            .unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.last_message_id, 0);
    }

    #[tokio::test]
    async fn test_cancellation_unblocks_receive() {
        let bus = InMemoryBus::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = bus.get_messages(&signals(&["s"]), None, &cancel).await;
        assert_eq!(assert_err!(result), BusError::Cancelled);
    }

    #[tokio::test]
    async fn test_rejects_oversized_payload() {
        let bus = InMemoryBus::with_config(BusConfig::default().with_max_message_bytes(4));
        assert_ok!(bus.publish("a", "s", Bytes::from_static(b"1234")).await);

        let result = bus.publish("a", "s", Bytes::from_static(b"12345")).await;
        assert!(matches!(
            result,
            Err(BusError::PayloadTooLarge { size: 5, limit: 4 })
        ));
        assert_eq!(bus.head(), 1);
    }

    #[tokio::test]
    async fn test_history_evicts_oldest() {
        let bus = InMemoryBus::with_config(BusConfig::default().with_history_bytes(64));
        for _ in 0..10 {
            bus.publish("a", "s", Bytes::from_static(b"0123456789")).await.unwrap();
        }

        assert!(bus.retained() < 10);
        assert_eq!(bus.head(), 10);

        let batch = bus
            .get_messages(&signals(&["s"]), Some(0), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(batch.last_message_id, 10);
        assert!(batch.messages.iter().all(|m| m.id > 10 - bus.retained() as u64));
    }
}
