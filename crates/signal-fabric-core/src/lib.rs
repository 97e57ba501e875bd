//! Core abstractions for signal fabric connections.
//!
//! This crate provides the fundamental building blocks:
//! - `MessageBus` - Append + multi-signal subscribe contract
//! - `InMemoryBus` - Byte-bounded history with waiter wake-ups
//! - `codec` - JSON value encoding
//! - `BusConfig` - Tuning for the in-memory bus

pub mod bus;
pub mod codec;
pub mod config;
pub mod traits;

pub use bus::InMemoryBus;
pub use codec::CodecError;
pub use config::BusConfig;
pub use traits::{BusError, Message, MessageBatch, MessageBus, MessageId, Signal};
