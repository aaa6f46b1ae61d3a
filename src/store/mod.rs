//! Node Store
//!
//! Hash-keyed table of immutable nodes plus the single pinned root hash.
//! The table only grows; the garbage collector in [`gc`] is the one place
//! that removes entries.

pub mod gc;
pub mod persistence;

use crate::error::FsError;
use crate::tree::{compute_node_id, Node};
use crate::types::{node_id_to_hex, NodeID};
use std::collections::HashMap;
use tracing::trace;

/// Content-addressed node table with a pinned root
#[derive(Debug, Clone)]
pub struct NodeStore {
    nodes: HashMap<NodeID, Node>,
    root: NodeID,
}

impl NodeStore {
    /// Create a store whose root is `root`, which must be a directory
    pub fn new(root: Node) -> Result<Self, FsError> {
        if !root.is_directory() {
            return Err(FsError::NotADirectory("/".to_string()));
        }
        let root_id = compute_node_id(&root);
        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);
        Ok(Self {
            nodes,
            root: root_id,
        })
    }

    /// Rebuild a store from already-verified parts
    pub(crate) fn from_parts(nodes: HashMap<NodeID, Node>, root: NodeID) -> Self {
        Self { nodes, root }
    }

    /// Insert a node and return its hash.
    ///
    /// Inserting a node that is already present is a no-op.
    pub fn put(&mut self, node: Node) -> NodeID {
        let id = compute_node_id(&node);
        self.nodes.entry(id).or_insert_with(|| {
            trace!(node_id = %node_id_to_hex(&id), kind = node.kind().as_str(), "Stored node");
            node
        });
        id
    }

    pub fn get(&self, id: &NodeID) -> Result<&Node, FsError> {
        self.nodes
            .get(id)
            .ok_or_else(|| FsError::NotFound(format!("node {}", node_id_to_hex(id))))
    }

    pub fn contains(&self, id: &NodeID) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn root(&self) -> NodeID {
        self.root
    }

    /// Swap the pinned root.
    ///
    /// The new root must already be stored and must be a directory.
    pub fn set_root(&mut self, id: NodeID) -> Result<(), FsError> {
        match self.nodes.get(&id) {
            Some(Node::Directory(_)) => {
                trace!(
                    from = %node_id_to_hex(&self.root),
                    to = %node_id_to_hex(&id),
                    "Root swapped"
                );
                self.root = id;
                Ok(())
            }
            Some(_) => Err(FsError::NotADirectory("/".to_string())),
            None => Err(FsError::NotFound(format!("node {}", node_id_to_hex(&id)))),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeID, &Node)> {
        self.nodes.iter()
    }

    /// Drop every entry for which `keep` returns false; returns the count removed
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&NodeID) -> bool) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|id, _| keep(id));
        before - self.nodes.len()
    }
}
