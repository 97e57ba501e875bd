//! Poll frames and group resumption tokens.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use signal_fabric_connection::PersistentResponse;
use thiserror::Error;

/// Token decode error.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Invalid token body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Opaque token carrying a connection's groups across reconnects.
pub struct GroupsToken;

impl GroupsToken {
    /// Encode group names into a token.
    #[must_use]
    pub fn encode(groups: &[String]) -> String {
        BASE64.encode(Value::from(groups.to_vec()).to_string())
    }

    /// Decode a token back into group names.
    ///
    /// # Errors
    /// Returns error if the token is not base64 or does not hold a list of names.
    pub fn decode(token: &str) -> Result<Vec<String>, TokenError> {
        let raw = BASE64.decode(token)?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

/// Transport-ready view of one poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollFrame {
    /// Cursor to send back on the next poll.
    pub message_id: String,
    /// Application values.
    pub messages: Vec<Value>,
    /// Transport should close the session.
    pub disconnect: bool,
    /// Session was aborted.
    pub aborted: bool,
    /// Present only when the connection belongs to a group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups_token: Option<String>,
}

impl PollFrame {
    /// Cursor parsed back from `message_id`.
    #[must_use]
    pub fn cursor(&self) -> Option<u64> {
        self.message_id.parse().ok()
    }
}

impl From<PersistentResponse> for PollFrame {
    fn from(response: PersistentResponse) -> Self {
        let groups_token = response.groups().map(|g| GroupsToken::encode(&g));
        Self {
            message_id: response.last_message_id().to_string(),
            disconnect: response.disconnect(),
            aborted: response.aborted(),
            groups_token,
            messages: response.into_messages(),
        }
    }
}
