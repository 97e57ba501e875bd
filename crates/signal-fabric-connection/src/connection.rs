//! Connection orchestrating receive, command interception and send.

use std::{any::Any, collections::HashSet, sync::Arc};

use bytes::Bytes;
use serde::Serialize;
use signal_fabric_core::{BusError, CodecError, MessageBus, MessageId, Signal};
use tokio_util::sync::CancellationToken;

use crate::{
    CommandProcessor, ConnectionConfig, GroupSet, PersistentResponse, SignalAggregator,
    wrapped::{Command, WrappedValue},
};

/// Connection error.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl ConnectionError {
    /// Whether the receive was cancelled by the caller.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Bus(BusError::Cancelled))
    }
}

/// One logical client connection on the bus.
///
/// Listens on its identity signal, its private command signal, a shared base
/// signal and every group it has joined. Commands arriving on any of them are
/// applied to connection state and never returned to the caller.
pub struct Connection<B: MessageBus + ?Sized> {
    id: String,
    command_signal: Signal,
    signals: SignalAggregator,
    state: CommandProcessor,
    config: ConnectionConfig,
    bus: Arc<B>,
}

impl<B: MessageBus + ?Sized> Connection<B> {
    /// Create a connection with no groups.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        base_signal: impl Into<Signal>,
        bus: Arc<B>,
        config: &ConnectionConfig,
    ) -> Self {
        let id = id.into();
        let command_signal = config.command_signal(&id);
        let signals =
            SignalAggregator::new(base_signal.into(), vec![id.clone(), command_signal.clone()]);
        Self {
            id,
            command_signal,
            signals,
            state: CommandProcessor::new(GroupSet::new()),
            config: config.clone(),
            bus,
        }
    }

    /// Seed group membership, e.g. restored from a previous session.
    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state = CommandProcessor::new(groups.into_iter().collect());
        self
    }

    /// Connection id (also its identity signal).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Shared base signal.
    #[must_use]
    pub fn base_signal(&self) -> &str {
        self.signals.base_signal()
    }

    /// Private command signal.
    #[must_use]
    pub fn command_signal(&self) -> &str {
        &self.command_signal
    }

    /// Current group membership.
    #[must_use]
    pub fn groups(&self) -> Vec<String> {
        self.state.groups().snapshot()
    }

    /// Signals the next receive will listen on.
    #[must_use]
    pub fn signals(&self) -> HashSet<Signal> {
        self.signals.signals(self.state.groups())
    }

    /// Whether a disconnect command has been received.
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.state.is_disconnected()
    }

    /// Whether an abort command has been received.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.state.is_aborted()
    }

    /// Receive from the current tail of the stream.
    ///
    /// # Errors
    /// Returns error if the bus query fails, is cancelled, or a message cannot be decoded.
    pub async fn receive(
        &self,
        cancel: &CancellationToken,
    ) -> Result<PersistentResponse, ConnectionError> {
        self.receive_from(None, cancel).await
    }

    /// Resume receiving after `since`.
    ///
    /// # Errors
    /// Returns error if the bus query fails, is cancelled, or a message cannot be decoded.
    pub async fn receive_since(
        &self,
        since: MessageId,
        cancel: &CancellationToken,
    ) -> Result<PersistentResponse, ConnectionError> {
        self.receive_from(Some(since), cancel).await
    }

    async fn receive_from(
        &self,
        since: Option<MessageId>,
        cancel: &CancellationToken,
    ) -> Result<PersistentResponse, ConnectionError> {
        let signals = self.signals();
        tracing::debug!(connection_id = %self.id, ?since, signals = signals.len(), "receiving");

        let batch = self.bus.get_messages(&signals, since, cancel).await?;

        // Decode everything before applying any command so a bad message leaves state untouched.
        let decoded = batch
            .messages
            .iter()
            .map(|m| WrappedValue::decode(&m.value))
            .collect::<Result<Vec<_>, _>>()?;
        let last_message_id = batch
            .messages
            .iter()
            .map(|m| m.id)
            .max()
            .unwrap_or(batch.last_message_id);

        let mut messages = Vec::with_capacity(decoded.len());
        for wrapped in decoded {
            match wrapped {
                WrappedValue::Data(value) => messages.push(value),
                WrappedValue::Command(command) => self.state.apply(&self.id, &command),
            }
        }

        tracing::debug!(
            connection_id = %self.id,
            last_message_id,
            count = messages.len(),
            commands = batch.messages.len() - messages.len(),
            "received batch"
        );
        Ok(PersistentResponse::assemble(last_message_id, messages, &self.state))
    }

    /// Send a value on `signal`.
    ///
    /// A [`Command`] is sent as a command envelope, anything else as data.
    /// Delivery is at most once: bus failures are logged and dropped, only
    /// encoding failures are returned.
    ///
    /// # Errors
    /// Returns error if `value` cannot be encoded.
    pub async fn send<T: Serialize + Any>(
        &self,
        signal: &str,
        value: &T,
    ) -> Result<(), ConnectionError> {
        let raw = WrappedValue::wrap(value)?.encode()?;
        self.publish(signal, raw).await;
        Ok(())
    }

    /// Send a value on the base signal.
    ///
    /// # Errors
    /// Returns error if `value` cannot be encoded.
    pub async fn broadcast<T: Serialize + Any>(&self, value: &T) -> Result<(), ConnectionError> {
        self.send(self.signals.base_signal(), value).await
    }

    /// Send a command to this connection's private command signal.
    ///
    /// # Errors
    /// Returns error if the command cannot be encoded.
    pub async fn send_command(&self, command: Command) -> Result<(), ConnectionError> {
        let raw = WrappedValue::from(command).encode()?;
        self.publish(&self.command_signal, raw).await;
        Ok(())
    }

    /// Send a command to another connection's command signal.
    ///
    /// # Errors
    /// Returns error if the command cannot be encoded.
    pub async fn send_command_to(
        &self,
        connection_id: &str,
        command: Command,
    ) -> Result<(), ConnectionError> {
        let raw = WrappedValue::from(command).encode()?;
        self.publish(&self.config.command_signal(connection_id), raw)
            .await;
        Ok(())
    }

    async fn publish(&self, signal: &str, raw: Bytes) {
        match self.bus.publish(&self.id, signal, raw).await {
            Ok(id) => tracing::debug!(connection_id = %self.id, signal, id, "sent"),
            Err(e) => {
                tracing::warn!(connection_id = %self.id, signal, error = %e, "dropping message");
            }
        }
    }
}
