//! # Command Streams
//!
//! Coalesces a burst of commands (a drag, a slider scrub, continuous typing)
//! into one undo step.
//!
//! While a stream is open, the undo command of each performed command is
//! folded into a single running log instead of being handed back. Folding
//! prunes incoming inverses that an existing log entry supersedes: undoing to
//! an intermediate state and then immediately past it is wasted work, so only
//! the inverse that reaches the pre-stream state is kept.

use crate::changes::{Change, Command};

/// Accumulated undo log for one open stream.
#[derive(Debug)]
pub struct CommandStream {
    name: String,
    undo: Vec<Change>,
}

impl CommandStream {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            undo: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    /// Fold the undo command of the latest performed command into the log.
    ///
    /// The undo log replays newest-first, so incoming inverses are prepended
    /// as a block. An incoming inverse is dropped when an existing entry
    /// (replayed after it) would overwrite its effect anyway.
    pub(crate) fn fold(&mut self, undo: Command) {
        let mut incoming: Vec<Change> = undo
            .changes
            .into_iter()
            .filter(|change| !self.supersedes(change))
            .collect();
        incoming.extend(self.undo.drain(..));
        self.undo = incoming;
    }

    /// Whether an existing log entry makes `incoming` redundant.
    fn supersedes(&self, incoming: &Change) -> bool {
        match incoming {
            // Restoring intermediate content is pointless if a later-replayed
            // entry destroys the node or restores older content.
            Change::UpdateContent { id, .. } => self.undo.iter().any(|existing| match existing {
                Change::Destroy { id: other } => other == id,
                Change::UpdateContent { id: other, .. } => other == id,
                _ => false,
            }),
            Change::UpsertAttribute { element, name, .. }
            | Change::DestroyAttribute { element, name } => {
                self.undo.iter().any(|existing| match existing {
                    Change::Destroy { id } => id == element,
                    Change::UpsertAttribute {
                        element: other,
                        name: other_name,
                        ..
                    }
                    | Change::DestroyAttribute {
                        element: other,
                        name: other_name,
                    } => other == element && other_name == name,
                    _ => false,
                })
            }
            _ => false,
        }
    }

    pub(crate) fn into_command(self) -> Command {
        Command::new(format!("undo:{}", self.name), self.undo)
    }

    pub(crate) fn into_changes(self) -> Vec<Change> {
        self.undo
    }
}
