//! Filesystem Merkle DAG
//!
//! Node model, content hashing and path handling. Every node has a
//! deterministic hash based on all of its fields, children included by hash.

pub mod hasher;
pub mod node;
pub mod path;

pub use hasher::compute_node_id;
pub use node::{
    DeviceKind, DeviceNode, DirectoryNode, FileNode, Node, NodeKind, NodeMeta, SymlinkNode,
};
