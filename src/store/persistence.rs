//! Portable document format
//!
//! A document enumerates every stored node keyed by its hex hash, plus the
//! root hash. Loading a document recomputes each node's hash and refuses the
//! document on any mismatch; hashes are never re-derived to paper over
//! divergent data.

use crate::error::{ApiError, FsError};
use crate::store::NodeStore;
use crate::tree::{
    compute_node_id, DeviceKind, DeviceNode, DirectoryNode, FileNode, Node, NodeMeta,
    SymlinkNode,
};
use crate::types::{node_id_from_hex, node_id_to_hex, Gid, Mode, NodeID, Timestamp, Uid};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};

/// Current document format version
pub const DOCUMENT_VERSION: u32 = 1;

/// Serialized form of one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeRecord {
    File {
        mode: Mode,
        uid: Uid,
        gid: Gid,
        mtime: Timestamp,
        /// Hex-encoded bytes
        content: String,
    },
    Dir {
        mode: Mode,
        uid: Uid,
        gid: Gid,
        mtime: Timestamp,
        entries: BTreeMap<String, String>,
    },
    Symlink {
        mode: Mode,
        uid: Uid,
        gid: Gid,
        mtime: Timestamp,
        target: String,
    },
    Device {
        mode: Mode,
        uid: Uid,
        gid: Gid,
        mtime: Timestamp,
        device_kind: DeviceKind,
    },
}

impl NodeRecord {
    pub fn from_node(node: &Node) -> NodeRecord {
        match node {
            Node::File(f) => NodeRecord::File {
                mode: f.meta.mode,
                uid: f.meta.uid,
                gid: f.meta.gid,
                mtime: f.meta.mtime,
                content: hex::encode(&f.content),
            },
            Node::Directory(d) => NodeRecord::Dir {
                mode: d.meta.mode,
                uid: d.meta.uid,
                gid: d.meta.gid,
                mtime: d.meta.mtime,
                entries: d
                    .children
                    .iter()
                    .map(|(name, id)| (name.clone(), node_id_to_hex(id)))
                    .collect(),
            },
            Node::Symlink(s) => NodeRecord::Symlink {
                mode: s.meta.mode,
                uid: s.meta.uid,
                gid: s.meta.gid,
                mtime: s.meta.mtime,
                target: s.target.clone(),
            },
            Node::Device(d) => NodeRecord::Device {
                mode: d.meta.mode,
                uid: d.meta.uid,
                gid: d.meta.gid,
                mtime: d.meta.mtime,
                device_kind: d.kind,
            },
        }
    }

    /// Decode into a node; `key` is only used for error messages
    pub fn to_node(&self, key: &str) -> Result<Node, FsError> {
        let node = match self {
            NodeRecord::File {
                mode,
                uid,
                gid,
                mtime,
                content,
            } => Node::File(FileNode {
                meta: NodeMeta::new(*mode, *uid, *gid, *mtime),
                content: hex::decode(content).map_err(|e| {
                    FsError::CorruptDocument(format!("node {}: bad content encoding: {}", key, e))
                })?,
            }),
            NodeRecord::Dir {
                mode,
                uid,
                gid,
                mtime,
                entries,
            } => {
                let mut children = BTreeMap::new();
                for (name, child) in entries {
                    crate::tree::path::validate_name(name).map_err(|_| {
                        FsError::CorruptDocument(format!(
                            "node {}: invalid entry name {:?}",
                            key, name
                        ))
                    })?;
                    let child_id = node_id_from_hex(child).ok_or_else(|| {
                        FsError::CorruptDocument(format!(
                            "node {}: entry {:?} has malformed hash",
                            key, name
                        ))
                    })?;
                    children.insert(name.clone(), child_id);
                }
                Node::Directory(DirectoryNode {
                    meta: NodeMeta::new(*mode, *uid, *gid, *mtime),
                    children,
                })
            }
            NodeRecord::Symlink {
                mode,
                uid,
                gid,
                mtime,
                target,
            } => Node::Symlink(SymlinkNode {
                meta: NodeMeta::new(*mode, *uid, *gid, *mtime),
                target: target.clone(),
            }),
            NodeRecord::Device {
                mode,
                uid,
                gid,
                mtime,
                device_kind,
            } => Node::Device(DeviceNode {
                meta: NodeMeta::new(*mode, *uid, *gid, *mtime),
                kind: *device_kind,
            }),
        };
        if !node.type_bits_consistent() {
            return Err(FsError::CorruptDocument(format!(
                "node {}: mode {:o} does not match {} record",
                key,
                node.meta().mode,
                node.kind().as_str()
            )));
        }
        Ok(node)
    }
}

/// Portable snapshot of a store and its root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub version: u32,
    pub root: String,
    pub nodes: BTreeMap<String, NodeRecord>,
}

impl Document {
    /// Snapshot every stored node, reachable or not
    pub fn export(store: &NodeStore) -> Document {
        let nodes = store
            .iter()
            .map(|(id, node)| (node_id_to_hex(id), NodeRecord::from_node(node)))
            .collect::<BTreeMap<_, _>>();
        debug!(nodes = nodes.len(), "Exported document");
        Document {
            version: DOCUMENT_VERSION,
            root: node_id_to_hex(&store.root()),
            nodes,
        }
    }

    /// Rebuild a store, verifying every hash and reference
    pub fn import(&self) -> Result<NodeStore, FsError> {
        if self.version != DOCUMENT_VERSION {
            return Err(FsError::CorruptDocument(format!(
                "unsupported document version {}",
                self.version
            )));
        }

        let mut nodes: HashMap<NodeID, Node> = HashMap::with_capacity(self.nodes.len());
        for (key, record) in &self.nodes {
            let id = node_id_from_hex(key)
                .ok_or_else(|| FsError::CorruptDocument(format!("malformed hash key {:?}", key)))?;
            let node = record.to_node(key)?;
            let recomputed = compute_node_id(&node);
            if recomputed != id {
                warn!(
                    key = %key,
                    recomputed = %node_id_to_hex(&recomputed),
                    "Hash mismatch in document"
                );
                return Err(FsError::CorruptDocument(format!(
                    "hash mismatch for node {} (content hashes to {})",
                    key,
                    node_id_to_hex(&recomputed)
                )));
            }
            nodes.insert(id, node);
        }

        for (id, node) in &nodes {
            if let Node::Directory(dir) = node {
                for (name, child) in &dir.children {
                    if !nodes.contains_key(child) {
                        return Err(FsError::CorruptDocument(format!(
                            "directory {} entry {:?} references missing node {}",
                            node_id_to_hex(id),
                            name,
                            node_id_to_hex(child)
                        )));
                    }
                }
            }
        }

        let root = node_id_from_hex(&self.root).ok_or_else(|| {
            FsError::CorruptDocument(format!("malformed root hash {:?}", self.root))
        })?;
        match nodes.get(&root) {
            Some(Node::Directory(_)) => {}
            Some(_) => {
                return Err(FsError::CorruptDocument(
                    "root does not name a directory".to_string(),
                ))
            }
            None => {
                return Err(FsError::CorruptDocument(format!(
                    "root {} is not in the document",
                    self.root
                )))
            }
        }

        debug!(nodes = nodes.len(), "Imported document");
        Ok(NodeStore::from_parts(nodes, root))
    }

    pub fn to_json(&self) -> Result<String, FsError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FsError::InvalidArgument(format!("failed to encode document: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Document, FsError> {
        serde_json::from_str(json)
            .map_err(|e| FsError::CorruptDocument(format!("malformed document: {}", e)))
    }
}

/// Write a document to a host file
pub fn save_document(document: &Document, path: &Path) -> Result<(), ApiError> {
    let json = serde_json::to_string_pretty(document)
        .map_err(|e| ApiError::SerializationError(e.to_string()))?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, json)?;
    debug!(path = %path.display(), "Saved document");
    Ok(())
}

/// Read a document from a host file
pub fn load_document(path: &Path) -> Result<Document, ApiError> {
    let json = std::fs::read_to_string(path)?;
    Ok(Document::from_json(&json)?)
}
