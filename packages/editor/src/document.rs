//! # Document Facade
//!
//! Ties the store, execution engine, and command streams together behind the
//! surface callers actually use: load, query, perform, stream, serialize.

use crate::changes::{ChangeNotice, Command};
use crate::engine;
use crate::errors::{DocumentError, DocumentResult};
use crate::store::{Path, Store};
use crate::stream::CommandStream;
use std::collections::{HashMap, HashSet};
use tracing::info;
use vellum_xml::{parse, write_document, Node, NodeId};

/// Hook invoked after every successfully performed command.
pub trait CommandObserver {
    fn command_applied(&mut self, undo: &Command, notices: &HashSet<ChangeNotice>);
}

/// What a successful [`Document::perform`] hands back.
#[derive(Debug)]
pub struct CommandOutcome {
    /// Monotonic revision, bumped once per applied command.
    pub version: u64,
    /// The exact inverse command, or `None` while a stream is open (the
    /// inverse was folded into the stream's undo log instead).
    pub undo: Option<Command>,
    pub notices: HashSet<ChangeNotice>,
}

/// A mutable document: node store plus command machinery.
#[derive(Default)]
pub struct Document {
    store: Store,
    version: u64,
    resolved_names: HashMap<String, String>,
    stream: Option<CommandStream>,
    observers: Vec<Box<dyn CommandObserver>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse XML text into a fresh document.
    pub fn from_source(source: &str) -> DocumentResult<Self> {
        let parsed = parse(source)?;
        info!(nodes = parsed.nodes.len(), "loaded document");
        Ok(Self {
            store: Store::from_parsed(parsed),
            ..Self::default()
        })
    }

    /// Serialize the current tree back to XML text.
    pub fn source(&self) -> String {
        write_document(self.store.roots(), self.store.nodes())
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.store.get(id)
    }

    pub fn resolve(&self, path: &Path) -> Option<&Node> {
        self.store.resolve(path)
    }

    pub fn children_of(&self, id: NodeId) -> DocumentResult<Vec<&Node>> {
        self.store.children_of(id)
    }

    pub fn roots(&self) -> &[NodeId] {
        self.store.roots()
    }

    pub fn add_observer(&mut self, observer: Box<dyn CommandObserver>) {
        self.observers.push(observer);
    }

    /// Apply a command atomically.
    ///
    /// With no stream open, the outcome carries the undo command and the
    /// reference names resolved during the command are discarded. With a
    /// stream open, the undo is folded into the stream and names stay
    /// resolvable for later commands in the same stream.
    pub fn perform(&mut self, command: Command) -> DocumentResult<CommandOutcome> {
        // A failed command must leave no trace, names included: the engine
        // rolls the tree back but cannot tell which names the rejected
        // command added, so restore the whole map here.
        let names_before = self.resolved_names.clone();
        let (undo, notices) =
            match engine::perform(&mut self.store, &mut self.resolved_names, command) {
                Ok(applied) => applied,
                Err(err) => {
                    self.resolved_names = names_before;
                    return Err(err);
                }
            };
        self.version += 1;

        for observer in &mut self.observers {
            observer.command_applied(&undo, &notices);
        }

        let undo = match &mut self.stream {
            Some(stream) => {
                stream.fold(undo);
                None
            }
            None => {
                self.resolved_names.clear();
                Some(undo)
            }
        };

        Ok(CommandOutcome {
            version: self.version,
            undo,
            notices,
        })
    }

    /// Open a stream; subsequent commands coalesce into one undo step.
    pub fn begin_stream(&mut self, name: impl Into<String>) -> DocumentResult<()> {
        if self.stream.is_some() {
            return Err(DocumentError::CommandStreamAlreadyOpen);
        }
        self.stream = Some(CommandStream::new(name));
        Ok(())
    }

    pub fn stream_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Close the stream, keeping its effects. Returns the coalesced undo
    /// command for the whole stream.
    pub fn complete_stream(&mut self) -> DocumentResult<Command> {
        let stream = self
            .stream
            .take()
            .ok_or(DocumentError::NoOpenCommandStream)?;
        self.resolved_names.clear();
        Ok(stream.into_command())
    }

    /// Close the stream and revert everything it did, by replaying its undo
    /// log. Returns the notices emitted while reverting.
    pub fn cancel_stream(&mut self) -> DocumentResult<HashSet<ChangeNotice>> {
        let stream = self
            .stream
            .take()
            .ok_or(DocumentError::NoOpenCommandStream)?;
        let notices = engine::rollback(
            &mut self.store,
            &mut self.resolved_names,
            stream.into_changes(),
        );
        self.resolved_names.clear();
        self.version += 1;
        Ok(notices)
    }
}
