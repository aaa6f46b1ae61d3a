//! Filesystem node types
//!
//! Nodes are immutable values. Every change builds a new node; directories
//! reference children by NodeID, never by value, which is what turns the
//! tree into a DAG with structural sharing.

use crate::types::{Gid, Mode, NodeID, Timestamp, Uid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// File type mask
pub const S_IFMT: Mode = 0o170000;
/// Regular file
pub const S_IFREG: Mode = 0o100000;
/// Directory
pub const S_IFDIR: Mode = 0o040000;
/// Symbolic link
pub const S_IFLNK: Mode = 0o120000;
/// Character device
pub const S_IFCHR: Mode = 0o020000;
/// Permission bits (including setuid, setgid, sticky)
pub const PERM_MASK: Mode = 0o7777;

pub const FILE_DEFAULT_PERMS: Mode = 0o644;
pub const DIR_DEFAULT_PERMS: Mode = 0o755;
pub const SYMLINK_PERMS: Mode = 0o777;
pub const DEVICE_PERMS: Mode = 0o666;

/// Metadata shared by every node variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeMeta {
    pub mode: Mode,
    pub uid: Uid,
    pub gid: Gid,
    pub mtime: Timestamp,
}

impl NodeMeta {
    pub fn new(mode: Mode, uid: Uid, gid: Gid, mtime: Timestamp) -> Self {
        Self {
            mode,
            uid,
            gid,
            mtime,
        }
    }

    /// Permission bits only
    pub fn perms(&self) -> Mode {
        self.mode & PERM_MASK
    }

    /// File type bits only
    pub fn file_type(&self) -> Mode {
        self.mode & S_IFMT
    }
}

/// Kind of a virtual device; content is synthesized on read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Null,
    Zero,
    Random,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 3] = [DeviceKind::Null, DeviceKind::Zero, DeviceKind::Random];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Null => "null",
            DeviceKind::Zero => "zero",
            DeviceKind::Random => "random",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "null" => Ok(DeviceKind::Null),
            "zero" => Ok(DeviceKind::Zero),
            "random" => Ok(DeviceKind::Random),
            other => Err(format!("unknown device kind: {}", other)),
        }
    }
}

/// Regular file node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub meta: NodeMeta,
    pub content: Vec<u8>,
}

/// Directory node representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    pub meta: NodeMeta,
    pub children: BTreeMap<String, NodeID>, // name -> child hash, sorted by name
}

impl DirectoryNode {
    /// Copy of this directory with `name` pointing at `child`
    pub fn with_child(&self, name: &str, child: NodeID, mtime: Timestamp) -> DirectoryNode {
        let mut children = self.children.clone();
        children.insert(name.to_string(), child);
        DirectoryNode {
            meta: NodeMeta {
                mtime,
                ..self.meta
            },
            children,
        }
    }

    /// Copy of this directory without `name`
    pub fn without_child(&self, name: &str, mtime: Timestamp) -> DirectoryNode {
        let mut children = self.children.clone();
        children.remove(name);
        DirectoryNode {
            meta: NodeMeta {
                mtime,
                ..self.meta
            },
            children,
        }
    }

    /// Copy with `name` re-pointed at `child`, metadata untouched.
    ///
    /// Used for ancestors whose own entries did not change, only the hash of
    /// a descendant.
    pub fn relinked(&self, name: &str, child: NodeID) -> DirectoryNode {
        let mut children = self.children.clone();
        children.insert(name.to_string(), child);
        DirectoryNode {
            meta: self.meta,
            children,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Symbolic link node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkNode {
    pub meta: NodeMeta,
    pub target: String,
}

/// Virtual device node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceNode {
    pub meta: NodeMeta,
    pub kind: DeviceKind,
}

/// Node kind without payload, for stat records and listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
    Symlink,
    Device,
}

impl NodeKind {
    pub fn type_bits(&self) -> Mode {
        match self {
            NodeKind::File => S_IFREG,
            NodeKind::Directory => S_IFDIR,
            NodeKind::Symlink => S_IFLNK,
            NodeKind::Device => S_IFCHR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Directory => "directory",
            NodeKind::Symlink => "symlink",
            NodeKind::Device => "device",
        }
    }
}

/// Merkle node type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    File(FileNode),
    Directory(DirectoryNode),
    Symlink(SymlinkNode),
    Device(DeviceNode),
}

impl Node {
    pub fn file(content: Vec<u8>, perms: Mode, uid: Uid, gid: Gid, mtime: Timestamp) -> Node {
        Node::File(FileNode {
            meta: NodeMeta::new(S_IFREG | (perms & PERM_MASK), uid, gid, mtime),
            content,
        })
    }

    pub fn directory(
        children: BTreeMap<String, NodeID>,
        perms: Mode,
        uid: Uid,
        gid: Gid,
        mtime: Timestamp,
    ) -> Node {
        Node::Directory(DirectoryNode {
            meta: NodeMeta::new(S_IFDIR | (perms & PERM_MASK), uid, gid, mtime),
            children,
        })
    }

    pub fn symlink(target: String, uid: Uid, gid: Gid, mtime: Timestamp) -> Node {
        Node::Symlink(SymlinkNode {
            meta: NodeMeta::new(S_IFLNK | SYMLINK_PERMS, uid, gid, mtime),
            target,
        })
    }

    pub fn device(kind: DeviceKind, mtime: Timestamp) -> Node {
        Node::Device(DeviceNode {
            meta: NodeMeta::new(S_IFCHR | DEVICE_PERMS, 0, 0, mtime),
            kind,
        })
    }

    pub fn meta(&self) -> &NodeMeta {
        match self {
            Node::File(n) => &n.meta,
            Node::Directory(n) => &n.meta,
            Node::Symlink(n) => &n.meta,
            Node::Device(n) => &n.meta,
        }
    }

    /// Same payload, different metadata
    pub fn with_meta(&self, meta: NodeMeta) -> Node {
        match self {
            Node::File(n) => Node::File(FileNode {
                meta,
                content: n.content.clone(),
            }),
            Node::Directory(n) => Node::Directory(DirectoryNode {
                meta,
                children: n.children.clone(),
            }),
            Node::Symlink(n) => Node::Symlink(SymlinkNode {
                meta,
                target: n.target.clone(),
            }),
            Node::Device(n) => Node::Device(DeviceNode { meta, kind: n.kind }),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::File(_) => NodeKind::File,
            Node::Directory(_) => NodeKind::Directory,
            Node::Symlink(_) => NodeKind::Symlink,
            Node::Device(_) => NodeKind::Device,
        }
    }

    pub fn as_directory(&self) -> Option<&DirectoryNode> {
        match self {
            Node::Directory(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            Node::File(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Node::Directory(_))
    }

    /// Size as reported by stat
    pub fn size(&self) -> u64 {
        match self {
            Node::File(f) => f.content.len() as u64,
            Node::Directory(d) => d.children.len() as u64,
            Node::Symlink(s) => s.target.len() as u64,
            Node::Device(_) => 0,
        }
    }

    /// Whether the type bits in `mode` agree with the variant
    pub fn type_bits_consistent(&self) -> bool {
        self.meta().file_type() == self.kind().type_bits()
    }
}
