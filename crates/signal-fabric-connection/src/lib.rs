//! Per-connection layer over a signal bus.
//!
//! Provides:
//! - `Connection` - Fan-in receive, command interception, send/broadcast
//! - `GroupSet` - Concurrent group membership
//! - `WrappedValue` / `Command` - Data vs. control envelope
//! - `PersistentResponse` - What one poll hands to the transport

pub mod command;
pub mod config;
pub mod connection;
pub mod groups;
pub mod response;
pub mod signals;
pub mod wrapped;

pub use command::CommandProcessor;
pub use config::ConnectionConfig;
pub use connection::{Connection, ConnectionError};
pub use groups::GroupSet;
pub use response::{GROUPS_KEY, PersistentResponse};
pub use signals::SignalAggregator;
pub use wrapped::{Command, WrappedValue};
