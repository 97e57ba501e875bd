//! Envelope separating control commands from application data on the bus.

use std::any::Any;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use signal_fabric_core::{CodecError, codec};

/// In-band control command addressed to a single connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Command {
    /// Join a group signal.
    AddToGroup(String),
    /// Leave a group signal.
    RemoveFromGroup(String),
    /// Ask the transport to end the session.
    Disconnect,
    /// Abort the session.
    Abort,
}

impl Command {
    /// Create an add-to-group command.
    #[must_use]
    pub fn add_to_group(group: impl Into<String>) -> Self {
        Self::AddToGroup(group.into())
    }

    /// Create a remove-from-group command.
    #[must_use]
    pub fn remove_from_group(group: impl Into<String>) -> Self {
        Self::RemoveFromGroup(group.into())
    }
}

/// Every value this layer places on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum WrappedValue {
    /// Application payload, passed through untouched.
    Data(Value),
    /// Control command, never exposed to the application.
    Command(Command),
}

impl WrappedValue {
    /// Wrap an outgoing value.
    ///
    /// A [`Command`] becomes a command envelope and an existing envelope is
    /// kept as is. Anything else is wrapped as data.
    ///
    /// # Errors
    /// Returns error if the value cannot be represented as JSON.
    pub fn wrap<T: Serialize + Any>(value: &T) -> Result<Self, CodecError> {
        let any: &dyn Any = value;
        if let Some(command) = any.downcast_ref::<Command>() {
            return Ok(Self::Command(command.clone()));
        }
        if let Some(wrapped) = any.downcast_ref::<Self>() {
            return Ok(wrapped.clone());
        }
        Self::data(value)
    }

    /// Wrap an application value.
    ///
    /// # Errors
    /// Returns error if the value cannot be represented as JSON.
    pub fn data<T: Serialize + ?Sized>(value: &T) -> Result<Self, CodecError> {
        Ok(Self::Data(serde_json::to_value(value)?))
    }

    /// Whether this envelope carries a command.
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(self, Self::Command(_))
    }

    /// Encode for publishing.
    ///
    /// # Errors
    /// Returns error if encoding fails.
    pub fn encode(&self) -> Result<Bytes, CodecError> {
        codec::encode(self)
    }

    /// Decode a raw bus value, including the full command body.
    ///
    /// # Errors
    /// Returns error if `raw` is not a well-formed envelope.
    pub fn decode(raw: &[u8]) -> Result<Self, CodecError> {
        codec::decode(raw)
    }
}

impl From<Command> for WrappedValue {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}
