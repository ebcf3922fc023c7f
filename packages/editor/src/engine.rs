//! # Execution Engine
//!
//! Applies commands to a store, producing exact inverses and change notices.
//!
//! ## Atomicity
//!
//! Changes run in order. The inverse of each applied change is prepended to
//! the running undo list, so the undo command replays in reverse application
//! order. If a change fails mid-command, the inverses accumulated so far are
//! replayed immediately and the caller sees a `CommandFailed` wrapping the
//! underlying error; the store ends the call in its pre-command state.
//!
//! ## Exactness
//!
//! Inverses restore bytes, not just structure: a destroyed subtree is
//! snapshotted with its ids, attributes, and whitespace intact, and undoing
//! the destroy reinstates the identical nodes at the identical index.

use crate::builder::PartialSnapshot;
use crate::changes::{
    Change, ChangeNotice, ChildQuery, Command, FollowUpFactory, NoticeAction, NoticeKind,
    SnapshotFactory, Subject,
};
use crate::errors::{DocumentError, DocumentResult};
use crate::position::position_context;
use crate::store::{Scope, Store, RESERVED_ID_ATTR};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};
use vellum_xml::NodeId;

/// Apply `command` to `store` atomically.
///
/// On success returns the undo command and the set of change notices.
/// `names` carries reference-id values resolved by earlier commands in the
/// same stream; values resolved here are added to it.
pub fn perform(
    store: &mut Store,
    names: &mut HashMap<String, String>,
    command: Command,
) -> DocumentResult<(Command, HashSet<ChangeNotice>)> {
    debug!(name = %command.name, changes = command.changes.len(), "applying command");

    let mut undo: Vec<Change> = Vec::new();
    let mut notices: HashSet<ChangeNotice> = HashSet::new();

    for change in command.changes {
        match apply_change(store, names, change) {
            Ok((mut inverse, step_notices)) => {
                notices.extend(step_notices);
                inverse.extend(undo.drain(..));
                undo = inverse;
            }
            Err(err) => {
                rollback(store, names, std::mem::take(&mut undo));
                return Err(DocumentError::command_failed(command.name, err));
            }
        }
    }

    let undo_name = format!("undo:{}", command.name);
    Ok((Command::new(undo_name, undo), notices))
}

/// Replay inverse changes, swallowing secondary failures. Used both for
/// mid-command rollback and for cancelling a command stream.
pub(crate) fn rollback(
    store: &mut Store,
    names: &mut HashMap<String, String>,
    changes: Vec<Change>,
) -> HashSet<ChangeNotice> {
    let mut notices = HashSet::new();
    for change in changes {
        match apply_change(store, names, change) {
            Ok((_, step_notices)) => notices.extend(step_notices),
            Err(err) => warn!(error = %err, "rollback step failed"),
        }
    }
    notices
}

fn apply_change(
    store: &mut Store,
    names: &mut HashMap<String, String>,
    change: Change,
) -> DocumentResult<(Vec<Change>, Vec<ChangeNotice>)> {
    match change {
        Change::Create {
            parent,
            index,
            factory,
        } => apply_create(store, names, parent, index, &factory),
        Change::Destroy { id } => apply_destroy(store, id),
        Change::UpdateContent { id, content } => apply_update_content(store, id, content),
        Change::Upsert {
            parent,
            index,
            factory,
            query,
            follow_up,
        } => apply_upsert(store, names, parent, index, &factory, query, &follow_up),
        Change::UpsertAttribute {
            element,
            name,
            value,
        } => {
            let resolved = value.resolve(names);
            apply_upsert_attribute(store, element, name, resolved)
        }
        Change::DestroyAttribute { element, name } => {
            apply_destroy_attribute(store, element, name)
        }
        Change::Reorder { parent, from, to } => apply_reorder(store, parent, from, to),
    }
}

fn apply_create(
    store: &mut Store,
    names: &mut HashMap<String, String>,
    parent: Option<NodeId>,
    index: usize,
    factory: &SnapshotFactory,
) -> DocumentResult<(Vec<Change>, Vec<ChangeNotice>)> {
    let scope = Scope::of(parent);

    // Validate scope and index before running the factory, so a failing
    // create has no side effects to unwind.
    let len = store.scope_ids(scope)?.len();
    if index > len {
        return Err(DocumentError::IndexOutOfBounds { index, len });
    }

    let context = position_context(store, scope, index, names);
    let snapshot = factory(&context);
    if snapshot.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let (roots, mut notices) = insert_snapshot(store, names, snapshot, scope, index)?;
    notices.push(scope_notice(store, scope));

    let undo = roots.iter().rev().map(|id| Change::destroy(*id)).collect();
    Ok((undo, notices))
}

/// Resolve reference futures, register reserved-id values, move the nodes
/// into the store, and splice the roots in.
fn insert_snapshot(
    store: &mut Store,
    names: &mut HashMap<String, String>,
    mut snapshot: PartialSnapshot,
    scope: Scope,
    index: usize,
) -> DocumentResult<(Vec<NodeId>, Vec<ChangeNotice>)> {
    // The allocator records what it hands out, so nodes that got their id
    // from a future are skipped by the literal registration below.
    let mut allocated: HashSet<NodeId> = HashSet::new();
    for (id, future) in std::mem::take(&mut snapshot.reference_futures) {
        let value = store.allocate_ref_id(&future.template);
        if let Some(attrs) = snapshot.values.get_mut(&id).and_then(|n| n.attributes_mut()) {
            attrs.insert(RESERVED_ID_ATTR.to_string(), value.clone());
        }
        names.insert(future.name, value);
        allocated.insert(id);
    }

    let mut notices = Vec::with_capacity(snapshot.values.len() + 1);
    for (id, node) in snapshot.values.drain() {
        if !allocated.contains(&id) {
            if let Some(value) = node.attributes().and_then(|a| a.get(RESERVED_ID_ATTR)) {
                store.register_ref_id(value.clone());
            }
        }
        notices.push(ChangeNotice::node(&node, NoticeAction::Created));
        store.set(node);
    }

    store.insert(&snapshot.roots, scope, index)?;
    Ok((snapshot.roots, notices))
}

fn apply_destroy(
    store: &mut Store,
    id: NodeId,
) -> DocumentResult<(Vec<Change>, Vec<ChangeNotice>)> {
    let node = store.get(id).ok_or(DocumentError::ValueNotFound(id))?;
    let parent = node.parent();
    let scope = Scope::of(parent);

    let index = store.remove(id, scope)?;
    let subtree = store.subtree_ids(id);

    let mut values = HashMap::with_capacity(subtree.len());
    let mut notices = Vec::with_capacity(subtree.len() + 1);
    for sid in subtree {
        if let Some(node) = store.remove_node(sid) {
            let ref_value = node
                .attributes()
                .and_then(|a| a.get(RESERVED_ID_ATTR))
                .cloned();
            if let Some(value) = ref_value {
                store.release_ref_id(&value);
            }
            notices.push(ChangeNotice::node(&node, NoticeAction::Destroyed));
            values.insert(sid, node);
        }
    }
    notices.push(scope_notice(store, scope));

    // The snapshot keeps the destroyed nodes verbatim, so the inverse
    // reinstates the exact subtree (ids included) at the exact index.
    let snapshot = PartialSnapshot {
        roots: vec![id],
        values,
        reference_futures: HashMap::new(),
    };
    let undo = vec![Change::create(parent, index, move |_| snapshot.clone())];
    Ok((undo, notices))
}

fn apply_update_content(
    store: &mut Store,
    id: NodeId,
    content: String,
) -> DocumentResult<(Vec<Change>, Vec<ChangeNotice>)> {
    let node = store.get_mut(id).ok_or(DocumentError::ValueNotFound(id))?;
    let prior = node
        .content()
        .map(str::to_string)
        .ok_or(DocumentError::InvalidElement)?;
    node.set_content(content);

    let notice = ChangeNotice::node(node, NoticeAction::Updated);
    Ok((vec![Change::update_content(id, prior)], vec![notice]))
}

fn apply_upsert(
    store: &mut Store,
    names: &mut HashMap<String, String>,
    parent: NodeId,
    index: usize,
    factory: &SnapshotFactory,
    query: ChildQuery,
    follow_up: &FollowUpFactory,
) -> DocumentResult<(Vec<Change>, Vec<ChangeNotice>)> {
    let mut undo: Vec<Change> = Vec::new();
    let mut notices: Vec<ChangeNotice> = Vec::new();

    let target = match find_child(store, parent, &query)? {
        Some(existing) => existing,
        None => {
            let (create_undo, create_notices) =
                apply_create(store, names, Some(parent), index, factory)?;
            undo = create_undo;
            notices = create_notices;
            match find_child(store, parent, &query)? {
                Some(created) => created,
                None => {
                    // The factory produced content the query cannot see.
                    rollback(store, names, undo);
                    return Err(DocumentError::UpsertFailedToCreateElement);
                }
            }
        }
    };

    for change in follow_up(target) {
        match apply_change(store, names, change) {
            Ok((mut inverse, step_notices)) => {
                notices.extend(step_notices);
                inverse.extend(undo.drain(..));
                undo = inverse;
            }
            Err(err) => {
                rollback(store, names, std::mem::take(&mut undo));
                return Err(err);
            }
        }
    }

    Ok((undo, notices))
}

/// First direct child of `parent` matching `query`, in document order.
fn find_child(
    store: &Store,
    parent: NodeId,
    query: &ChildQuery,
) -> DocumentResult<Option<NodeId>> {
    let node = store
        .get(parent)
        .ok_or(DocumentError::ValueNotFound(parent))?;
    let children = node.children().ok_or(DocumentError::NotAnElement)?;
    for child_id in children {
        if let Some(child) = store.get(*child_id) {
            if query.matches(child) {
                return Ok(Some(*child_id));
            }
        }
    }
    Ok(None)
}

fn apply_upsert_attribute(
    store: &mut Store,
    element: NodeId,
    name: String,
    value: String,
) -> DocumentResult<(Vec<Change>, Vec<ChangeNotice>)> {
    let node = store
        .get_mut(element)
        .ok_or(DocumentError::ValueNotFound(element))?;
    let element_name = node
        .name()
        .map(str::to_string)
        .ok_or(DocumentError::NotAnElement)?;
    let prior = match node.attributes_mut() {
        Some(attrs) => attrs.insert(name.clone(), value.clone()),
        None => return Err(DocumentError::NotAnElement),
    };

    if name == RESERVED_ID_ATTR {
        if let Some(previous) = &prior {
            store.release_ref_id(previous);
        }
        store.register_ref_id(value);
    }

    let undo = match prior {
        Some(previous) => Change::upsert_attribute(element, name, previous),
        None => Change::destroy_attribute(element, name),
    };
    let notice = ChangeNotice {
        subject: Subject::Node(element),
        kind: NoticeKind::Element(element_name),
        action: NoticeAction::Updated,
    };
    Ok((vec![undo], vec![notice]))
}

fn apply_destroy_attribute(
    store: &mut Store,
    element: NodeId,
    name: String,
) -> DocumentResult<(Vec<Change>, Vec<ChangeNotice>)> {
    let node = store
        .get_mut(element)
        .ok_or(DocumentError::ValueNotFound(element))?;
    let element_name = node
        .name()
        .map(str::to_string)
        .ok_or(DocumentError::NotAnElement)?;
    let prior = match node.attributes_mut() {
        Some(attrs) => attrs.remove(&name),
        None => return Err(DocumentError::NotAnElement),
    };

    // Destroying an absent attribute is a no-op, not a failure.
    let Some(previous) = prior else {
        return Ok((Vec::new(), Vec::new()));
    };

    if name == RESERVED_ID_ATTR {
        store.release_ref_id(&previous);
    }

    let undo = Change::upsert_attribute(element, name, previous);
    let notice = ChangeNotice {
        subject: Subject::Node(element),
        kind: NoticeKind::Element(element_name),
        action: NoticeAction::Updated,
    };
    Ok((vec![undo], vec![notice]))
}

fn apply_reorder(
    store: &mut Store,
    parent: Option<NodeId>,
    from: usize,
    to: usize,
) -> DocumentResult<(Vec<Change>, Vec<ChangeNotice>)> {
    let scope = Scope::of(parent);
    let list = store.scope_ids_mut(scope)?;
    let len = list.len();
    if from >= len {
        return Err(DocumentError::IndexOutOfBounds { index: from, len });
    }
    if to >= len {
        return Err(DocumentError::IndexOutOfBounds { index: to, len });
    }
    if from == to {
        return Ok((Vec::new(), vec![scope_notice(store, scope)]));
    }

    let id = list.remove(from);
    list.insert(to, id);

    let undo = vec![Change::reorder(parent, to, from)];
    Ok((undo, vec![scope_notice(store, scope)]))
}

fn scope_notice(store: &Store, scope: Scope) -> ChangeNotice {
    match scope {
        Scope::Root => ChangeNotice::root_updated(),
        Scope::Element(id) => match store.get(id) {
            Some(node) => ChangeNotice::node(node, NoticeAction::Updated),
            None => ChangeNotice {
                subject: Subject::Node(id),
                kind: NoticeKind::Element(String::new()),
                action: NoticeAction::Updated,
            },
        },
    }
}
