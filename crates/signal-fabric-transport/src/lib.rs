//! Transport-facing helpers.
//!
//! Provides:
//! - Group resumption token (base64 JSON)
//! - Poll frame built from a connection response

pub mod protocol;

pub use protocol::{GroupsToken, PollFrame, TokenError};
