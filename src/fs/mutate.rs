//! Copy-on-write entry edits
//!
//! An edit builds a new parent directory, then re-links every ancestor up to
//! the root with the new child hash. Nothing is committed here: the caller
//! swaps the root exactly once after all edits of an operation succeed.

use crate::error::FsError;
use crate::resolve::{Location, Step};
use crate::store::NodeStore;
use crate::tree::Node;
use crate::types::{NodeID, Timestamp};

/// How the parent's entry for a location changes
#[derive(Debug, Clone, Copy)]
pub(crate) enum EntryChange {
    /// New or re-pointed name; refreshes the parent's mtime
    Insert(NodeID),
    /// Same name, updated node (content or metadata); parent metadata untouched
    Replace(NodeID),
    /// Name removed; refreshes the parent's mtime
    Remove,
}

/// Apply `change` at `loc` and return the uncommitted new root
pub(crate) fn apply(
    store: &mut NodeStore,
    loc: &Location,
    change: EntryChange,
    now: Timestamp,
) -> Result<NodeID, FsError> {
    let parent = match store.get(&loc.parent)? {
        Node::Directory(dir) => dir,
        _ => return Err(FsError::NotADirectory(loc.path())),
    };
    let updated = match change {
        EntryChange::Insert(id) => parent.with_child(&loc.name, id, now),
        EntryChange::Replace(id) => parent.relinked(&loc.name, id),
        EntryChange::Remove => parent.without_child(&loc.name, now),
    };
    let parent_id = store.put(Node::Directory(updated));
    rebuild(store, &loc.steps, parent_id)
}

/// Re-link `child` into each ancestor in `steps`, innermost first
pub(crate) fn rebuild(
    store: &mut NodeStore,
    steps: &[Step],
    mut child: NodeID,
) -> Result<NodeID, FsError> {
    for step in steps.iter().rev() {
        let relinked = match store.get(&step.dir)? {
            Node::Directory(dir) => dir.relinked(&step.name, child),
            _ => return Err(FsError::NotADirectory(step.name.clone())),
        };
        child = store.put(Node::Directory(relinked));
    }
    Ok(child)
}
