//! Connection configuration.

use serde::{Deserialize, Serialize};

/// Default suffix appended to a connection id to form its command signal.
pub const DEFAULT_COMMAND_SUFFIX: &str = ".__command";

/// Settings shared by connections created from the same host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Suffix of the private command signal.
    pub command_signal_suffix: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            command_signal_suffix: DEFAULT_COMMAND_SUFFIX.to_string(),
        }
    }
}

impl ConnectionConfig {
    /// Private command signal for `connection_id`.
    #[must_use]
    pub fn command_signal(&self, connection_id: &str) -> String {
        format!("{connection_id}{}", self.command_signal_suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_signal() {
        let config = ConnectionConfig::default();
        assert_eq!(config.command_signal("abc"), "abc.__command");

        let config: ConnectionConfig =
            serde_json::from_str(r##"{"command_signal_suffix": "#cmd"}"##).unwrap();
        assert_eq!(config.command_signal("abc"), "abc#cmd");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ConnectionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ConnectionConfig::default());
    }
}
