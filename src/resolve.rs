//! Path resolution
//!
//! Walks directory entries from a root hash. Symlinks met mid-path are always
//! dereferenced; a symlink in final position only when the caller asks for
//! it. Every dereference counts one hop against a fixed limit so a cycle of
//! links fails with `SymlinkLoop` instead of spinning.
//!
//! Resolution records the physical chain of directories it passed through.
//! Mutations rebuild exactly that chain, so a write through `/link/file`
//! updates the directory the link points at.

use crate::error::FsError;
use crate::store::NodeStore;
use crate::tree::path::{join, normalize, push_segments};
use crate::tree::{DirectoryNode, Node};
use crate::types::NodeID;
use std::collections::VecDeque;

/// Default maximum number of symlink dereferences per resolution
pub const DEFAULT_SYMLINK_HOP_LIMIT: usize = 40;

/// One directory passed through: `dir` contains an entry `name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub dir: NodeID,
    pub name: String,
}

/// A fully resolved path
#[derive(Debug, Clone)]
pub struct Walk {
    /// Directories from the root down to the node's parent
    pub steps: Vec<Step>,
    pub node: NodeID,
}

impl Walk {
    /// Physical path segments of the resolved node
    pub fn segments(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name.clone()).collect()
    }
}

/// Where an entry lives, or would live if created
#[derive(Debug, Clone)]
pub struct Location {
    /// Directories from the root down to the parent's parent
    pub steps: Vec<Step>,
    pub parent: NodeID,
    pub name: String,
    /// Current entry under `name`, if any
    pub existing: Option<NodeID>,
}

impl Location {
    /// Physical path segments of the parent directory
    pub fn parent_segments(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name.clone()).collect()
    }

    /// Physical path segments of the entry itself
    pub fn segments(&self) -> Vec<String> {
        let mut segments = self.parent_segments();
        segments.push(self.name.clone());
        segments
    }

    pub fn path(&self) -> String {
        join(&self.segments())
    }
}

/// Resolves paths against one root of a store
pub struct Resolver<'a> {
    store: &'a NodeStore,
    root: NodeID,
    hop_limit: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a NodeStore, root: NodeID, hop_limit: usize) -> Self {
        Self {
            store,
            root,
            hop_limit,
        }
    }

    /// Resolve a path to a node hash
    pub fn resolve(&self, path: &str, follow_symlinks: bool) -> Result<NodeID, FsError> {
        Ok(self.walk(path, follow_symlinks)?.node)
    }

    /// Resolve a path, keeping the chain of directories passed through
    pub fn walk(&self, path: &str, follow_symlinks: bool) -> Result<Walk, FsError> {
        let segments = normalize(path)?;
        let mut hops = 0;
        self.walk_segments(&segments, follow_symlinks, &mut hops, path)
    }

    /// Resolve the parent of `path` and look up its final entry.
    ///
    /// With `follow_final`, a symlink in final position is replaced by the
    /// location of its target, even when the target does not exist yet.
    pub fn locate(&self, path: &str, follow_final: bool) -> Result<Location, FsError> {
        let mut segments = normalize(path)?;
        let mut hops = 0;
        loop {
            let name = match segments.pop() {
                Some(name) => name,
                // a followed link landed on the root directory
                None if hops > 0 => return Err(FsError::NotAFile(path.to_string())),
                None => {
                    return Err(FsError::InvalidArgument(format!(
                        "{} has no parent directory",
                        path
                    )))
                }
            };
            let parent = self.walk_segments(&segments, true, &mut hops, path)?;
            let dir = self.directory(&parent.node, path)?;
            let existing = dir.children.get(&name).copied();

            if follow_final {
                if let Some(id) = existing {
                    if let Node::Symlink(link) = self.store.get(&id)? {
                        self.count_hop(&mut hops, path)?;
                        let mut next = parent.segments();
                        push_segments(&mut next, &link.target);
                        segments = next;
                        continue;
                    }
                }
            }

            return Ok(Location {
                steps: parent.steps,
                parent: parent.node,
                name,
                existing,
            });
        }
    }

    fn walk_segments(
        &self,
        segments: &[String],
        follow_final: bool,
        hops: &mut usize,
        path: &str,
    ) -> Result<Walk, FsError> {
        let mut queue: VecDeque<String> = segments.iter().cloned().collect();
        let mut steps: Vec<Step> = Vec::with_capacity(queue.len());
        let mut current = self.root;

        while let Some(name) = queue.pop_front() {
            let child = *self
                .directory(&current, path)?
                .children
                .get(&name)
                .ok_or_else(|| FsError::NotFound(path.to_string()))?;

            if let Node::Symlink(link) = self.store.get(&child)? {
                if !queue.is_empty() || follow_final {
                    self.count_hop(hops, path)?;
                    // splice: link directory ++ target ++ remaining segments
                    let mut next: Vec<String> = steps.iter().map(|s| s.name.clone()).collect();
                    push_segments(&mut next, &link.target);
                    next.extend(queue.drain(..));
                    queue = next.into();
                    steps.clear();
                    current = self.root;
                    continue;
                }
            }

            steps.push(Step { dir: current, name });
            current = child;
        }

        Ok(Walk {
            steps,
            node: current,
        })
    }

    fn directory(&self, id: &NodeID, path: &str) -> Result<&'a DirectoryNode, FsError> {
        match self.store.get(id)? {
            Node::Directory(dir) => Ok(dir),
            _ => Err(FsError::NotADirectory(path.to_string())),
        }
    }

    fn count_hop(&self, hops: &mut usize, path: &str) -> Result<(), FsError> {
        *hops += 1;
        if *hops > self.hop_limit {
            return Err(FsError::SymlinkLoop(path.to_string()));
        }
        Ok(())
    }
}
