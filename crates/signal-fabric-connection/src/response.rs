//! Poll response handed to the transport.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use signal_fabric_core::MessageId;

use crate::CommandProcessor;

/// `transport_data` key holding the group membership snapshot.
pub const GROUPS_KEY: &str = "Groups";

/// Result of one receive call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentResponse {
    last_message_id: MessageId,
    messages: Vec<Value>,
    disconnect: bool,
    aborted: bool,
    #[serde(default)]
    transport_data: BTreeMap<String, Value>,
}

impl PersistentResponse {
    /// Assemble a response from a processed batch.
    ///
    /// Flags and groups are read after the batch's commands were applied.
    /// `"Groups"` is only present when the connection belongs to at least one group.
    #[must_use]
    pub fn assemble(
        last_message_id: MessageId,
        messages: Vec<Value>,
        state: &CommandProcessor,
    ) -> Self {
        let mut transport_data = BTreeMap::new();
        let groups = state.groups().snapshot();
        if !groups.is_empty() {
            transport_data.insert(GROUPS_KEY.to_string(), Value::from(groups));
        }

        Self {
            last_message_id,
            messages,
            disconnect: state.is_disconnected(),
            aborted: state.is_aborted(),
            transport_data,
        }
    }

    /// Cursor to resume the next poll from.
    #[must_use]
    pub const fn last_message_id(&self) -> MessageId {
        self.last_message_id
    }

    /// Application values in delivery order.
    #[must_use]
    pub fn messages(&self) -> &[Value] {
        &self.messages
    }

    /// Consume the response, returning its application values.
    #[must_use]
    pub fn into_messages(self) -> Vec<Value> {
        self.messages
    }

    /// Whether the transport should end the session.
    #[must_use]
    pub const fn disconnect(&self) -> bool {
        self.disconnect
    }

    /// Whether the session was aborted.
    #[must_use]
    pub const fn aborted(&self) -> bool {
        self.aborted
    }

    /// Transport-visible connection state.
    #[must_use]
    pub const fn transport_data(&self) -> &BTreeMap<String, Value> {
        &self.transport_data
    }

    /// Group names carried under `"Groups"`, if any.
    #[must_use]
    pub fn groups(&self) -> Option<Vec<String>> {
        let groups = self.transport_data.get(GROUPS_KEY)?.as_array()?;
        Some(
            groups
                .iter()
                .filter_map(|g| g.as_str().map(ToString::to_string))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{GroupSet, wrapped::Command};

    #[test]
    fn test_groups_key_absent_without_groups() {
        let state = CommandProcessor::new(GroupSet::new());
        let response = PersistentResponse::assemble(3, vec![json!("hi")], &state);

        assert!(!response.transport_data().contains_key(GROUPS_KEY));
        assert_eq!(response.groups(), None);
        assert_eq!(response.last_message_id(), 3);
    }

    #[test]
    fn test_groups_key_matches_snapshot() {
        let state = CommandProcessor::new(["b", "a"].into_iter().collect());
        state.apply("conn", &Command::Disconnect);

        let response = PersistentResponse::assemble(7, Vec::new(), &state);
        assert_eq!(response.transport_data()[GROUPS_KEY], json!(["a", "b"]));
        assert_eq!(
            response.groups(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert!(response.disconnect());
        assert!(!response.aborted());
    }

    #[test]
    fn test_serialization() {
        let state = CommandProcessor::new(["room"].into_iter().collect());
        let response = PersistentResponse::assemble(2, vec![json!({"n": 1})], &state);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            json!({
                "lastMessageId": 2,
                "messages": [{"n": 1}],
                "disconnect": false,
                "aborted": false,
                "transportData": {"Groups": ["room"]}
            })
        );
    }
}
