//! Reachability sweep
//!
//! Mark from the current root following directory entries only; sweep every
//! stored node outside the marked set. Symlink targets are paths, not hash
//! references, so a link never keeps its target alive.

use crate::store::NodeStore;
use crate::tree::Node;
use crate::types::NodeID;
use std::collections::HashSet;
use tracing::debug;

/// Hashes reachable from the current root
pub fn mark(store: &NodeStore) -> HashSet<NodeID> {
    let mut reachable = HashSet::new();
    let mut stack = vec![store.root()];
    while let Some(id) = stack.pop() {
        if !reachable.insert(id) {
            continue;
        }
        if let Ok(Node::Directory(dir)) = store.get(&id) {
            stack.extend(dir.children.values().copied());
        }
    }
    reachable
}

/// Remove every unreachable node; returns the number reclaimed
pub fn purge(store: &mut NodeStore) -> usize {
    let reachable = mark(store);
    let reclaimed = store.retain(|id| reachable.contains(id));
    debug!(
        reclaimed,
        live = store.len(),
        "Garbage collection sweep complete"
    );
    reclaimed
}
