//! # Vellum Editor
//!
//! Command-based mutation engine over an in-memory XML node store.
//!
//! ```text
//!            ┌────────────┐
//!            │  Document  │   load / query / perform / stream
//!            └─────┬──────┘
//!                  │
//!        ┌─────────┼──────────┐
//!        ▼         ▼          ▼
//!   ┌────────┐ ┌────────┐ ┌─────────┐
//!   │ Engine │ │ Stream │ │  Store  │
//!   └───┬────┘ └────────┘ └────┬────┘
//!       │   inverses, notices  │   nodes, roots, ref-id registry
//!       └──────────┬───────────┘
//!                  ▼
//!            ┌───────────┐
//!            │ vellum-xml│   parse / write / node model
//!            └───────────┘
//! ```
//!
//! Every structural change goes through a [`Command`]; applying one yields an
//! exact inverse command and a set of [`ChangeNotice`]s describing what moved.
//! Commands are atomic: a mid-command failure rolls back the changes already
//! applied. A [`CommandStream`](stream::CommandStream) coalesces a burst of
//! commands into a single undo step.

pub mod builder;
pub mod changes;
pub mod document;
pub mod engine;
pub mod errors;
mod position;
pub mod store;
pub mod stream;

pub use builder::{element, ElementBuilder, PartialSnapshot, PositionContext, ReferenceFuture};
pub use changes::{
    AttrValue, Change, ChangeNotice, ChildQuery, Command, NoticeAction, NoticeKind, Subject,
};
pub use document::{CommandObserver, CommandOutcome, Document};
pub use engine::perform;
pub use errors::{DocumentError, DocumentResult};
pub use store::{Path, Scope, Segment, SegmentKind, Store, RESERVED_ID_ATTR};
pub use stream::CommandStream;

pub use vellum_xml::{Node, NodeId, NodeKind};
