//! Shared access to one filesystem
//!
//! Readers share a guard; every mutation holds the exclusive guard from
//! path resolution through the root swap, so writers are serialized and a
//! reader only ever sees committed roots.

use crate::fs::FileSystem;
use crate::types::NodeID;
use parking_lot::RwLock;
use std::sync::Arc;

/// Cloneable handle to a filesystem guarded by a read-write lock
#[derive(Clone)]
pub struct SharedFileSystem {
    inner: Arc<RwLock<FileSystem>>,
}

impl SharedFileSystem {
    pub fn new(fs: FileSystem) -> Self {
        Self {
            inner: Arc::new(RwLock::new(fs)),
        }
    }

    /// Run `f` under a shared guard
    pub fn read<T>(&self, f: impl FnOnce(&FileSystem) -> T) -> T {
        let guard = self.inner.read();
        f(&guard)
    }

    /// Run `f` under the exclusive guard
    pub fn write<T>(&self, f: impl FnOnce(&mut FileSystem) -> T) -> T {
        let mut guard = self.inner.write();
        f(&mut guard)
    }

    pub fn root_hash(&self) -> NodeID {
        self.inner.read().root_hash()
    }

    /// Take the filesystem back if this is the last handle
    pub fn try_unwrap(self) -> Result<FileSystem, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl Default for SharedFileSystem {
    fn default() -> Self {
        Self::new(FileSystem::new())
    }
}

impl From<FileSystem> for SharedFileSystem {
    fn from(fs: FileSystem) -> Self {
        Self::new(fs)
    }
}
