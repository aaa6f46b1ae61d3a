//! Filesystem facade
//!
//! `FileSystem` is the only surface collaborators drive: every operation
//! takes the caller's identity explicitly, resolves paths against the current
//! root, builds new nodes copy-on-write and finishes with a single root swap.
//! A failing operation returns before the swap, so the previous root stays
//! current and no half-rewritten directory is ever visible.

pub mod bootstrap;
pub mod device;
pub(crate) mod mutate;

use crate::clock::{Clock, SystemClock};
use crate::error::{ApiError, FsError};
use crate::permissions::{self, Access, Caller};
use crate::resolve::{Location, Resolver, DEFAULT_SYMLINK_HOP_LIMIT};
use crate::store::persistence::Document;
use crate::store::{gc, NodeStore};
use crate::tree::node::{DIR_DEFAULT_PERMS, FILE_DEFAULT_PERMS, PERM_MASK};
use crate::tree::path::{is_within, normalize};
use crate::tree::{compute_node_id, FileNode, Node, NodeKind, NodeMeta};
use crate::types::{short_id, Gid, Mode, NodeID, Timestamp, Uid};
use mutate::EntryChange;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Length returned by a device read without an explicit length
pub const DEFAULT_DEVICE_READ_LEN: usize = 1024;

/// Behavioural knobs for a filesystem instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsOptions {
    /// Permission bits for newly created files
    pub file_mode: Mode,
    /// Permission bits for newly created directories
    pub dir_mode: Mode,
    pub symlink_hop_limit: usize,
    pub device_read_len: usize,
    /// Create the `/etc` and `/dev` layout on a fresh filesystem
    pub bootstrap: bool,
}

impl Default for FsOptions {
    fn default() -> Self {
        Self {
            file_mode: FILE_DEFAULT_PERMS,
            dir_mode: DIR_DEFAULT_PERMS,
            symlink_hop_limit: DEFAULT_SYMLINK_HOP_LIMIT,
            device_read_len: DEFAULT_DEVICE_READ_LEN,
            bootstrap: true,
        }
    }
}

/// Metadata record returned by `stat`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub kind: NodeKind,
    pub mode: Mode,
    pub uid: Uid,
    pub gid: Gid,
    pub mtime: Timestamp,
    pub size: u64,
    pub hash: NodeID,
}

impl Stat {
    fn of(hash: NodeID, node: &Node) -> Stat {
        let meta = node.meta();
        Stat {
            kind: node.kind(),
            mode: meta.mode,
            uid: meta.uid,
            gid: meta.gid,
            mtime: meta.mtime,
            size: node.size(),
            hash,
        }
    }
}

/// One directory entry with its (unfollowed) metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub stat: Stat,
}

/// Result of an integrity check over the live tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyReport {
    pub reachable: usize,
    pub stored: usize,
}

/// Content-addressed virtual filesystem
#[derive(Clone)]
pub struct FileSystem {
    store: NodeStore,
    options: FsOptions,
    clock: Arc<dyn Clock>,
}

impl Default for FileSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn denied(path: &str, caller: &Caller, access: Access) -> FsError {
    FsError::PermissionDenied(format!(
        "{} ({} as uid {})",
        path,
        access.as_str(),
        caller.uid
    ))
}

fn require(meta: &NodeMeta, caller: &Caller, access: Access, path: &str) -> Result<(), FsError> {
    if permissions::check(meta, caller, access) {
        Ok(())
    } else {
        Err(denied(path, caller, access))
    }
}

impl FileSystem {
    /// Fresh filesystem with the default layout and the system clock
    pub fn new() -> Self {
        Self::with_options(FsOptions::default(), Arc::new(SystemClock))
    }

    /// Fresh filesystem holding only an empty root
    pub fn empty() -> Self {
        let options = FsOptions {
            bootstrap: false,
            ..FsOptions::default()
        };
        Self::with_options(options, Arc::new(SystemClock))
    }

    pub fn with_options(options: FsOptions, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        let root = bootstrap::empty_root(now);
        let root_id = compute_node_id(&root);
        let mut store = NodeStore::from_parts(HashMap::from([(root_id, root)]), root_id);
        if options.bootstrap {
            let root = bootstrap::populate(&mut store, now);
            // the bare root is superseded before anyone can observe it
            if store.set_root(root).is_ok() {
                gc::purge(&mut store);
            }
        }
        Self {
            store,
            options,
            clock,
        }
    }

    /// Rebuild a filesystem from a document with default options
    pub fn import(document: &Document) -> Result<Self, FsError> {
        Self::import_with(document, FsOptions::default(), Arc::new(SystemClock))
    }

    pub fn import_with(
        document: &Document,
        options: FsOptions,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, FsError> {
        let store = document.import()?;
        Ok(Self {
            store,
            options,
            clock,
        })
    }

    /// Snapshot every stored node and the root
    pub fn export(&self) -> Document {
        Document::export(&self.store)
    }

    pub fn options(&self) -> &FsOptions {
        &self.options
    }

    pub fn root_hash(&self) -> NodeID {
        self.store.root()
    }

    pub fn node_count(&self) -> usize {
        self.store.len()
    }

    /// Fetch a stored node directly by hash, reachable or not
    pub fn get_node(&self, id: &NodeID) -> Result<&Node, FsError> {
        self.store.get(id)
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(
            &self.store,
            self.store.root(),
            self.options.symlink_hop_limit,
        )
    }

    /// Resolve a path to the hash it currently names
    pub fn resolve(&self, path: &str, follow_symlinks: bool) -> Result<NodeID, FsError> {
        self.resolver().resolve(path, follow_symlinks)
    }

    /// Whether `path` names a node `caller` can reach
    pub fn exists(&self, path: &str, caller: &Caller) -> bool {
        self.lookup(path, true, caller).is_ok()
    }

    /// Resolve `path` for `caller`, who needs search (execute) permission
    /// on every directory the final walk passes through.
    fn lookup(
        &self,
        path: &str,
        follow_symlinks: bool,
        caller: &Caller,
    ) -> Result<NodeID, FsError> {
        let walk = self.resolver().walk(path, follow_symlinks)?;
        for step in &walk.steps {
            let dir = self.store.get(&step.dir)?;
            require(dir.meta(), caller, Access::Execute, path)?;
        }
        Ok(walk.node)
    }

    fn commit(&mut self, root: NodeID, op: &'static str, path: &str) -> Result<(), FsError> {
        self.store.set_root(root)?;
        debug!(op, path, root = %short_id(&root), nodes = self.store.len(), "Committed");
        Ok(())
    }

    fn require_parent(&self, loc: &Location, caller: &Caller, path: &str) -> Result<(), FsError> {
        let parent = self.store.get(&loc.parent)?;
        require(parent.meta(), caller, Access::Write, path)
    }

    // ---- reads ----

    /// Read a whole file; devices yield `device_read_len` bytes
    pub fn read(&self, path: &str, caller: &Caller) -> Result<Vec<u8>, FsError> {
        self.read_inner(path, None, caller)
    }

    /// Read at most `len` bytes; devices yield exactly `len` (`null` yields none)
    pub fn read_len(&self, path: &str, len: usize, caller: &Caller) -> Result<Vec<u8>, FsError> {
        self.read_inner(path, Some(len), caller)
    }

    fn read_inner(
        &self,
        path: &str,
        len: Option<usize>,
        caller: &Caller,
    ) -> Result<Vec<u8>, FsError> {
        let id = self.lookup(path, true, caller)?;
        match self.store.get(&id)? {
            Node::File(file) => {
                require(&file.meta, caller, Access::Read, path)?;
                let end = len.map_or(file.content.len(), |n| n.min(file.content.len()));
                Ok(file.content[..end].to_vec())
            }
            Node::Device(dev) => {
                require(&dev.meta, caller, Access::Read, path)?;
                Ok(device::read(
                    dev.kind,
                    len.unwrap_or(self.options.device_read_len),
                ))
            }
            Node::Directory(_) | Node::Symlink(_) => Err(FsError::NotAFile(path.to_string())),
        }
    }

    /// Sorted entry names of a directory
    pub fn ls(&self, path: &str, caller: &Caller) -> Result<Vec<String>, FsError> {
        let id = self.lookup(path, true, caller)?;
        match self.store.get(&id)? {
            Node::Directory(dir) => {
                require(&dir.meta, caller, Access::Read, path)?;
                Ok(dir.children.keys().cloned().collect())
            }
            _ => Err(FsError::NotADirectory(path.to_string())),
        }
    }

    /// Directory entries with their metadata
    pub fn read_dir(&self, path: &str, caller: &Caller) -> Result<Vec<DirEntry>, FsError> {
        let id = self.lookup(path, true, caller)?;
        let dir = match self.store.get(&id)? {
            Node::Directory(dir) => dir,
            _ => return Err(FsError::NotADirectory(path.to_string())),
        };
        require(&dir.meta, caller, Access::Read, path)?;
        dir.children
            .iter()
            .map(|(name, child)| {
                Ok(DirEntry {
                    name: name.clone(),
                    stat: Stat::of(*child, self.store.get(child)?),
                })
            })
            .collect()
    }

    /// Metadata of the node a path names, following symlinks.
    ///
    /// Like POSIX `stat`, no permission on the node itself is needed, only
    /// search permission on the directories leading to it.
    pub fn stat(&self, path: &str, caller: &Caller) -> Result<Stat, FsError> {
        let id = self.lookup(path, true, caller)?;
        Ok(Stat::of(id, self.store.get(&id)?))
    }

    /// Metadata without following a final symlink
    pub fn lstat(&self, path: &str, caller: &Caller) -> Result<Stat, FsError> {
        let id = self.lookup(path, false, caller)?;
        Ok(Stat::of(id, self.store.get(&id)?))
    }

    pub fn readlink(&self, path: &str, caller: &Caller) -> Result<String, FsError> {
        let id = self.lookup(path, false, caller)?;
        match self.store.get(&id)? {
            Node::Symlink(link) => Ok(link.target.clone()),
            _ => Err(FsError::NotASymlink(path.to_string())),
        }
    }

    fn can(&self, path: &str, caller: &Caller, access: Access) -> bool {
        self.lookup(path, true, caller)
            .and_then(|id| self.store.get(&id).map(|n| *n.meta()))
            .map(|meta| permissions::check(&meta, caller, access))
            .unwrap_or(false)
    }

    pub fn can_read(&self, path: &str, caller: &Caller) -> bool {
        self.can(path, caller, Access::Read)
    }

    pub fn can_write(&self, path: &str, caller: &Caller) -> bool {
        self.can(path, caller, Access::Write)
    }

    pub fn can_execute(&self, path: &str, caller: &Caller) -> bool {
        self.can(path, caller, Access::Execute)
    }

    // ---- content mutations ----

    /// Create or overwrite a file
    pub fn write(&mut self, path: &str, data: &[u8], caller: &Caller) -> Result<(), FsError> {
        let perms = self.options.file_mode;
        self.store_content(path, caller, perms, "write", |_| data.to_vec())
    }

    /// Append to a file, creating it if missing
    pub fn append(&mut self, path: &str, data: &[u8], caller: &Caller) -> Result<(), FsError> {
        let perms = self.options.file_mode;
        self.store_content(path, caller, perms, "append", |old| {
            let mut content = old.map(<[u8]>::to_vec).unwrap_or_default();
            content.extend_from_slice(data);
            content
        })
    }

    /// Shared path for write/append/cp: existing files keep their metadata
    /// apart from mtime, new files get `perms` and the caller's ownership,
    /// devices swallow the data.
    fn store_content(
        &mut self,
        path: &str,
        caller: &Caller,
        perms: Mode,
        op: &'static str,
        content: impl FnOnce(Option<&[u8]>) -> Vec<u8>,
    ) -> Result<(), FsError> {
        let loc = self.resolver().locate(path, true)?;
        let now = self.clock.now();
        let (node, inserted) = match loc.existing {
            Some(id) => match self.store.get(&id)? {
                Node::File(file) => {
                    require(&file.meta, caller, Access::Write, path)?;
                    let node = Node::File(FileNode {
                        meta: NodeMeta {
                            mtime: now,
                            ..file.meta
                        },
                        content: content(Some(&file.content)),
                    });
                    (node, false)
                }
                Node::Device(dev) => {
                    require(&dev.meta, caller, Access::Write, path)?;
                    let written = device::write(dev.kind, &content(None));
                    debug!(op, path, device = %dev.kind, written, "Discarded device write");
                    return Ok(());
                }
                Node::Directory(_) | Node::Symlink(_) => {
                    return Err(FsError::NotAFile(path.to_string()))
                }
            },
            None => {
                self.require_parent(&loc, caller, path)?;
                (
                    Node::file(content(None), perms, caller.uid, caller.gid, now),
                    true,
                )
            }
        };
        let id = self.store.put(node);
        let change = if inserted {
            EntryChange::Insert(id)
        } else {
            EntryChange::Replace(id)
        };
        let root = mutate::apply(&mut self.store, &loc, change, now)?;
        self.commit(root, op, path)
    }

    /// Create an empty file, or refresh the mtime of an existing node
    pub fn touch(&mut self, path: &str, caller: &Caller) -> Result<(), FsError> {
        if self.resolve(path, true).is_err() {
            let perms = self.options.file_mode;
            return self.store_content(path, caller, perms, "touch", |_| Vec::new());
        }
        self.replace_node(path, "touch", |node, now| {
            let meta = node.meta();
            if meta.uid != caller.uid && !permissions::check(meta, caller, Access::Write) {
                return Err(denied(path, caller, Access::Write));
            }
            Ok(node.with_meta(NodeMeta { mtime: now, ..*meta }))
        })
    }

    /// Swap the node a path names (following symlinks) for `update(node)`.
    ///
    /// The root itself, named directly or through links, is swapped directly.
    fn replace_node(
        &mut self,
        path: &str,
        op: &'static str,
        update: impl FnOnce(&Node, Timestamp) -> Result<Node, FsError>,
    ) -> Result<(), FsError> {
        let now = self.clock.now();
        if self.resolver().walk(path, true)?.steps.is_empty() {
            let updated = update(self.store.get(&self.store.root())?, now)?;
            let root = self.store.put(updated);
            return self.commit(root, op, "/");
        }
        let loc = self.resolver().locate(path, true)?;
        let id = loc
            .existing
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        let updated = update(self.store.get(&id)?, now)?;
        let new_id = self.store.put(updated);
        let root = mutate::apply(&mut self.store, &loc, EntryChange::Replace(new_id), now)?;
        self.commit(root, op, path)
    }

    // ---- namespace mutations ----

    /// Create a directory; with `parents`, create missing ancestors and
    /// accept an existing directory
    pub fn mkdir(&mut self, path: &str, parents: bool, caller: &Caller) -> Result<(), FsError> {
        let segments = normalize(path)?;
        if segments.is_empty() {
            return if parents {
                Ok(())
            } else {
                Err(FsError::AlreadyExists("/".to_string()))
            };
        }
        if !parents {
            let loc = self.resolver().locate(path, false)?;
            if loc.existing.is_some() {
                return Err(FsError::AlreadyExists(path.to_string()));
            }
            self.require_parent(&loc, caller, path)?;
            let now = self.clock.now();
            let dir = self.new_directory(BTreeMap::new(), caller, now);
            let id = self.store.put(dir);
            let root = mutate::apply(&mut self.store, &loc, EntryChange::Insert(id), now)?;
            return self.commit(root, "mkdir", path);
        }

        // longest existing prefix
        let resolver = self.resolver();
        let mut existing = resolver.walk("/", true)?;
        let mut depth = 0;
        while depth < segments.len() {
            let prefix = crate::tree::path::join(&segments[..=depth]);
            match resolver.walk(&prefix, true) {
                Ok(walk) => {
                    existing = walk;
                    depth += 1;
                }
                Err(FsError::NotFound(_)) => break,
                Err(e) => return Err(e),
            }
        }

        let anchor = match self.store.get(&existing.node)? {
            Node::Directory(dir) => dir.clone(),
            _ if depth == segments.len() => return Err(FsError::AlreadyExists(path.to_string())),
            _ => return Err(FsError::NotADirectory(path.to_string())),
        };
        if depth == segments.len() {
            return Ok(());
        }
        // e.g. a dangling symlink occupies the name
        if anchor.children.contains_key(&segments[depth]) {
            return Err(FsError::AlreadyExists(crate::tree::path::join(
                &segments[..=depth],
            )));
        }
        require(&anchor.meta, caller, Access::Write, path)?;

        let now = self.clock.now();
        let innermost = self.new_directory(BTreeMap::new(), caller, now);
        let mut child = self.store.put(innermost);
        for name in segments[depth + 1..].iter().rev() {
            let mut children = BTreeMap::new();
            children.insert(name.clone(), child);
            let dir = self.new_directory(children, caller, now);
            child = self.store.put(dir);
        }
        let anchor_id = self
            .store
            .put(Node::Directory(anchor.with_child(&segments[depth], child, now)));
        let root = mutate::rebuild(&mut self.store, &existing.steps, anchor_id)?;
        self.commit(root, "mkdir", path)
    }

    fn new_directory(
        &self,
        children: BTreeMap<String, NodeID>,
        caller: &Caller,
        now: Timestamp,
    ) -> Node {
        Node::directory(
            children,
            self.options.dir_mode,
            caller.uid,
            caller.gid,
            now,
        )
    }

    /// Soft delete: drop the parent's entry, keep the node until `purge`.
    ///
    /// Directories need `recursive`; the caller must be able to write every
    /// non-empty directory in the removed subtree.
    pub fn rm(&mut self, path: &str, recursive: bool, caller: &Caller) -> Result<(), FsError> {
        let loc = self.resolver().locate(path, false)?;
        let id = loc
            .existing
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        if self.store.get(&id)?.is_directory() {
            if !recursive {
                return Err(FsError::NotAFile(path.to_string()));
            }
            self.require_subtree_writable(id, &loc.path(), caller)?;
        }
        self.require_parent(&loc, caller, path)?;
        let now = self.clock.now();
        let root = mutate::apply(&mut self.store, &loc, EntryChange::Remove, now)?;
        self.commit(root, "rm", path)
    }

    fn require_subtree_writable(
        &self,
        id: NodeID,
        path: &str,
        caller: &Caller,
    ) -> Result<(), FsError> {
        if caller.is_root() {
            return Ok(());
        }
        let mut stack = vec![(id, path.to_string())];
        while let Some((id, path)) = stack.pop() {
            if let Node::Directory(dir) = self.store.get(&id)? {
                if dir.is_empty() {
                    continue;
                }
                require(&dir.meta, caller, Access::Write, &path)?;
                for (name, child) in &dir.children {
                    stack.push((*child, format!("{}/{}", path, name)));
                }
            }
        }
        Ok(())
    }

    /// Remove an empty directory
    pub fn rmdir(&mut self, path: &str, caller: &Caller) -> Result<(), FsError> {
        let loc = self.resolver().locate(path, false)?;
        let id = loc
            .existing
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;
        match self.store.get(&id)? {
            Node::Directory(dir) if !dir.is_empty() => {
                return Err(FsError::NotEmpty(path.to_string()))
            }
            Node::Directory(_) => {}
            _ => return Err(FsError::NotADirectory(path.to_string())),
        }
        self.require_parent(&loc, caller, path)?;
        let now = self.clock.now();
        let root = mutate::apply(&mut self.store, &loc, EntryChange::Remove, now)?;
        self.commit(root, "rmdir", path)
    }

    /// Move an entry. Unlink and link are applied to an uncommitted tree and
    /// published with one root swap, so no observer sees the entry missing
    /// or present twice.
    pub fn rename(&mut self, old: &str, new: &str, caller: &Caller) -> Result<(), FsError> {
        let src = self.resolver().locate(old, false)?;
        let src_id = src
            .existing
            .ok_or_else(|| FsError::NotFound(old.to_string()))?;
        let dst = self.resolver().locate(new, false)?;
        let (src_segments, dst_segments) = (src.segments(), dst.segments());
        if src_segments == dst_segments {
            return Ok(());
        }
        let src_is_dir = self.store.get(&src_id)?.is_directory();
        // both names already refer to the same node
        if !src_is_dir && dst.existing == Some(src_id) {
            return Ok(());
        }
        if src_is_dir && is_within(&src_segments, &dst_segments) {
            return Err(FsError::InvalidArgument(format!(
                "cannot move {} into itself",
                old
            )));
        }
        if let Some(existing) = dst.existing {
            match (src_is_dir, self.store.get(&existing)?) {
                (true, Node::Directory(dir)) if !dir.is_empty() => {
                    return Err(FsError::NotEmpty(new.to_string()))
                }
                (true, Node::Directory(_)) => {}
                (true, _) => return Err(FsError::NotADirectory(new.to_string())),
                (false, Node::Directory(_)) => return Err(FsError::NotAFile(new.to_string())),
                (false, _) => {}
            }
        }
        self.require_parent(&src, caller, old)?;
        self.require_parent(&dst, caller, new)?;

        let now = self.clock.now();
        let unlinked = mutate::apply(&mut self.store, &src, EntryChange::Remove, now)?;
        let dst = Resolver::new(&self.store, unlinked, self.options.symlink_hop_limit)
            .locate(new, false)?;
        let root = mutate::apply(&mut self.store, &dst, EntryChange::Insert(src_id), now)?;
        self.commit(root, "rename", new)
    }

    /// Hard link: a second entry naming the same node
    pub fn link(&mut self, existing: &str, new: &str, caller: &Caller) -> Result<(), FsError> {
        let id = self.resolve(existing, false)?;
        if self.store.get(&id)?.is_directory() {
            return Err(FsError::InvalidArgument(format!(
                "hard link to directory {}",
                existing
            )));
        }
        let loc = self.resolver().locate(new, false)?;
        if loc.existing.is_some() {
            return Err(FsError::AlreadyExists(new.to_string()));
        }
        self.require_parent(&loc, caller, new)?;
        let now = self.clock.now();
        let root = mutate::apply(&mut self.store, &loc, EntryChange::Insert(id), now)?;
        self.commit(root, "link", new)
    }

    pub fn symlink(&mut self, target: &str, path: &str, caller: &Caller) -> Result<(), FsError> {
        if target.is_empty() || target.contains('\0') {
            return Err(FsError::InvalidArgument(format!(
                "invalid symlink target {:?}",
                target
            )));
        }
        let loc = self.resolver().locate(path, false)?;
        if loc.existing.is_some() {
            return Err(FsError::AlreadyExists(path.to_string()));
        }
        self.require_parent(&loc, caller, path)?;
        let now = self.clock.now();
        let id = self.store.put(Node::symlink(
            target.to_string(),
            caller.uid,
            caller.gid,
            now,
        ));
        let root = mutate::apply(&mut self.store, &loc, EntryChange::Insert(id), now)?;
        self.commit(root, "symlink", path)
    }

    /// Copy a file, or with `recursive` a directory. Directory copies share
    /// the source subtree as-is.
    pub fn cp(
        &mut self,
        src: &str,
        dst: &str,
        recursive: bool,
        caller: &Caller,
    ) -> Result<(), FsError> {
        let src_id = self.resolve(src, true)?;
        let (content, perms) = match self.store.get(&src_id)? {
            Node::File(file) => {
                require(&file.meta, caller, Access::Read, src)?;
                (file.content.clone(), file.meta.perms())
            }
            Node::Directory(dir) => {
                if !recursive {
                    return Err(FsError::NotAFile(src.to_string()));
                }
                require(&dir.meta, caller, Access::Read, src)?;
                let loc = self.resolver().locate(dst, true)?;
                if loc.existing.is_some() {
                    return Err(FsError::AlreadyExists(dst.to_string()));
                }
                self.require_parent(&loc, caller, dst)?;
                let now = self.clock.now();
                let root = mutate::apply(&mut self.store, &loc, EntryChange::Insert(src_id), now)?;
                return self.commit(root, "cp", dst);
            }
            Node::Device(_) | Node::Symlink(_) => {
                return Err(FsError::InvalidArgument(format!(
                    "cannot copy special file {}",
                    src
                )))
            }
        };
        self.store_content(dst, caller, perms, "cp", |_| content)
    }

    /// Insert a subtree built by `build` as a new entry at `path`.
    ///
    /// The destination and the caller's write access are checked before
    /// `build` runs; its nodes become reachable with one root swap.
    pub(crate) fn graft(
        &mut self,
        path: &str,
        caller: &Caller,
        op: &'static str,
        build: impl FnOnce(&mut NodeStore, Timestamp) -> Result<NodeID, ApiError>,
    ) -> Result<NodeID, ApiError> {
        let loc = self.resolver().locate(path, false)?;
        if loc.existing.is_some() {
            return Err(FsError::AlreadyExists(path.to_string()).into());
        }
        self.require_parent(&loc, caller, path)?;
        let now = self.clock.now();
        let id = build(&mut self.store, now)?;
        let root = mutate::apply(&mut self.store, &loc, EntryChange::Insert(id), now)?;
        self.commit(root, op, path)?;
        Ok(id)
    }

    // ---- metadata mutations ----

    /// Replace permission bits; only the owner or root may
    pub fn chmod(&mut self, path: &str, mode: Mode, caller: &Caller) -> Result<(), FsError> {
        self.replace_node(path, "chmod", |node, _| {
            let meta = node.meta();
            if !caller.is_root() && caller.uid != meta.uid {
                return Err(FsError::PermissionDenied(format!(
                    "{} (chmod as uid {})",
                    path, caller.uid
                )));
            }
            Ok(node.with_meta(NodeMeta {
                mode: meta.file_type() | (mode & PERM_MASK),
                ..*meta
            }))
        })
    }

    /// Change ownership. Root may set anything; an owner may only move the
    /// group to one of their own groups.
    pub fn chown(
        &mut self,
        path: &str,
        uid: Uid,
        gid: Gid,
        caller: &Caller,
    ) -> Result<(), FsError> {
        self.replace_node(path, "chown", |node, _| {
            let meta = node.meta();
            let allowed = caller.is_root()
                || (caller.uid == meta.uid && uid == meta.uid && caller.in_group(gid));
            if !allowed {
                return Err(FsError::PermissionDenied(format!(
                    "{} (chown as uid {})",
                    path, caller.uid
                )));
            }
            Ok(node.with_meta(NodeMeta { uid, gid, ..*meta }))
        })
    }

    // ---- maintenance ----

    /// Sweep every node unreachable from the current root
    pub fn purge(&mut self) -> usize {
        gc::purge(&mut self.store)
    }

    /// Check every reachable node hashes to its key and every entry resolves
    pub fn verify(&self) -> Result<VerifyReport, FsError> {
        let reachable = gc::mark(&self.store);
        for id in &reachable {
            let node = self.store.get(id).map_err(|_| {
                FsError::CorruptDocument(format!("dangling reference {}", short_id(id)))
            })?;
            if compute_node_id(node) != *id {
                return Err(FsError::CorruptDocument(format!(
                    "node {} does not hash to its key",
                    short_id(id)
                )));
            }
        }
        Ok(VerifyReport {
            reachable: reachable.len(),
            stored: self.store.len(),
        })
    }
}
