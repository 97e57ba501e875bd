//! Connection-local state mutated by control commands.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::{GroupSet, wrapped::Command};

/// Applies commands to a connection's groups and lifecycle flags.
///
/// `disconnected` and `aborted` only ever go from `false` to `true`.
#[derive(Debug, Default)]
pub struct CommandProcessor {
    groups: GroupSet,
    disconnected: AtomicBool,
    aborted: AtomicBool,
}

impl CommandProcessor {
    /// Create a processor seeded with initial group membership.
    #[must_use]
    pub const fn new(groups: GroupSet) -> Self {
        Self {
            groups,
            disconnected: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
        }
    }

    /// Apply one command.
    pub fn apply(&self, connection_id: &str, command: &Command) {
        match command {
            Command::AddToGroup(group) => {
                if self.groups.add(group.as_str()) {
                    tracing::info!(connection_id, group, "joined group");
                }
            }
            Command::RemoveFromGroup(group) => {
                if self.groups.remove(group) {
                    tracing::info!(connection_id, group, "left group");
                }
            }
            Command::Disconnect => {
                if !self.disconnected.swap(true, Ordering::AcqRel) {
                    tracing::info!(connection_id, "connection disconnected");
                }
            }
            Command::Abort => {
                if !self.aborted.swap(true, Ordering::AcqRel) {
                    tracing::info!(connection_id, "connection aborted");
                }
            }
        }
    }

    /// Group membership.
    #[must_use]
    pub const fn groups(&self) -> &GroupSet {
        &self.groups
    }

    /// Whether a disconnect command has been applied.
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Acquire)
    }

    /// Whether an abort command has been applied.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn test_group_commands_match_reference_set() {
        let processor = CommandProcessor::new(GroupSet::new());
        let mut reference = BTreeSet::new();

        let commands = [
            Command::add_to_group("a"),
            Command::add_to_group("b"),
            Command::add_to_group("a"),
            Command::remove_from_group("c"),
            Command::remove_from_group("a"),
            Command::add_to_group("c"),
            Command::remove_from_group("b"),
            Command::add_to_group("a"),
        ];
        for command in &commands {
            processor.apply("conn", command);
            match command {
                Command::AddToGroup(g) => {
                    reference.insert(g.clone());
                }
                Command::RemoveFromGroup(g) => {
                    reference.remove(g);
                }
                _ => {}
            }
        }

        let expected: Vec<String> = reference.into_iter().collect();
        assert_eq!(processor.groups().snapshot(), expected);
    }

    #[test]
    fn test_flags_are_monotonic() {
        let processor = CommandProcessor::default();
        assert!(!processor.is_disconnected());
        assert!(!processor.is_aborted());

        processor.apply("conn", &Command::Abort);
        assert!(processor.is_aborted());
        assert!(!processor.is_disconnected());

        processor.apply("conn", &Command::Disconnect);
        processor.apply("conn", &Command::add_to_group("x"));
        processor.apply("conn", &Command::Abort);
        assert!(processor.is_aborted());
        assert!(processor.is_disconnected());
    }
}
