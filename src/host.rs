//! Copy trees between the virtual filesystem and a real host directory

use crate::error::{ApiError, FsError};
use crate::fs::FileSystem;
use crate::permissions::{self, Access, Caller};
use crate::tree::node::PERM_MASK;
use crate::tree::Node;
use crate::types::{Mode, NodeID};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostOptions {
    /// Carry permission bits across (Unix only)
    pub preserve_permissions: bool,
}

/// Materialise the subtree at `vpath` at `host_path`. Devices are skipped.
/// Returns the number of entries written.
pub fn export_to_host(
    fs: &FileSystem,
    vpath: &str,
    host_path: &Path,
    options: HostOptions,
    caller: &Caller,
) -> Result<usize, ApiError> {
    let id = fs.stat(vpath, caller)?.hash;
    let mut written = 0;
    // applied last so read-only directories can still be filled
    let mut dir_modes = Vec::new();
    let mut stack: Vec<(NodeID, PathBuf, String)> =
        vec![(id, host_path.to_path_buf(), vpath.to_string())];

    while let Some((id, target, vpath)) = stack.pop() {
        let node = fs.get_node(&id)?;
        let meta = node.meta();
        match node {
            Node::File(file) => {
                if !permissions::check(meta, caller, Access::Read) {
                    return Err(denied(&vpath, caller).into());
                }
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&target, &file.content)?;
            }
            Node::Directory(dir) => {
                if !permissions::check(meta, caller, Access::Read)
                    || !permissions::check(meta, caller, Access::Execute)
                {
                    return Err(denied(&vpath, caller).into());
                }
                std::fs::create_dir_all(&target)?;
                for (name, child) in &dir.children {
                    stack.push((
                        *child,
                        target.join(name),
                        format!("{}/{}", vpath.trim_end_matches('/'), name),
                    ));
                }
                dir_modes.push((target, meta.perms()));
                written += 1;
                continue;
            }
            Node::Symlink(link) => {
                write_symlink(&link.target, &target)?;
                written += 1;
                continue;
            }
            Node::Device(dev) => {
                debug!(path = %vpath, device = %dev.kind, "Skipping device on export");
                continue;
            }
        }
        if options.preserve_permissions {
            set_mode(&target, meta.perms())?;
        }
        written += 1;
    }
    if options.preserve_permissions {
        for (dir, perms) in dir_modes.iter().rev() {
            set_mode(dir, *perms)?;
        }
    }

    debug!(vpath, host = %host_path.display(), written, "Exported to host");
    Ok(written)
}

/// Copy a host file or directory tree to `vpath` as a single mutation.
/// New nodes are owned by the caller. Returns the number of entries imported.
pub fn import_from_host(
    fs: &mut FileSystem,
    host_path: &Path,
    vpath: &str,
    options: HostOptions,
    caller: &Caller,
) -> Result<usize, ApiError> {
    let (file_mode, dir_mode) = (fs.options().file_mode, fs.options().dir_mode);
    let mut imported = 0;

    fs.graft(vpath, caller, "import", |store, now| {
        let mut pending: HashMap<PathBuf, BTreeMap<String, NodeID>> = HashMap::new();
        let mut top = None;

        // children are yielded before their directory
        for entry in WalkDir::new(host_path)
            .follow_links(false)
            .contents_first(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(std::io::Error::from)?;
            let file_type = entry.file_type();
            let perms = |default: Mode| -> Result<Mode, ApiError> {
                if options.preserve_permissions {
                    Ok(host_mode(&entry.metadata().map_err(std::io::Error::from)?)
                        .unwrap_or(default))
                } else {
                    Ok(default)
                }
            };

            let node = if file_type.is_dir() {
                let children = pending.remove(entry.path()).unwrap_or_default();
                Node::directory(children, perms(dir_mode)?, caller.uid, caller.gid, now)
            } else if file_type.is_symlink() {
                let target = std::fs::read_link(entry.path())?;
                Node::symlink(target.to_string_lossy().into_owned(), caller.uid, caller.gid, now)
            } else if file_type.is_file() {
                let content = std::fs::read(entry.path())?;
                Node::file(content, perms(file_mode)?, caller.uid, caller.gid, now)
            } else {
                debug!(path = %entry.path().display(), "Skipping special host file");
                continue;
            };

            let id = store.put(node);
            imported += 1;
            if entry.depth() == 0 {
                top = Some(id);
            } else if let Some(parent) = entry.path().parent() {
                pending
                    .entry(parent.to_path_buf())
                    .or_default()
                    .insert(entry.file_name().to_string_lossy().into_owned(), id);
            }
        }

        top.ok_or_else(|| {
            FsError::InvalidArgument(format!("nothing to import at {}", host_path.display()))
                .into()
        })
    })?;

    debug!(vpath, host = %host_path.display(), imported, "Imported from host");
    Ok(imported)
}

fn denied(vpath: &str, caller: &Caller) -> FsError {
    FsError::PermissionDenied(format!("{} (read as uid {})", vpath, caller.uid))
}

#[cfg(unix)]
fn write_symlink(target: &str, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::os::unix::fs::symlink(target, path)
}

#[cfg(not(unix))]
fn write_symlink(target: &str, path: &Path) -> std::io::Result<()> {
    debug!(target, path = %path.display(), "Symlinks not exported on this platform");
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, perms: Mode) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(perms))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _perms: Mode) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn host_mode(metadata: &std::fs::Metadata) -> Option<Mode> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & PERM_MASK)
}

#[cfg(not(unix))]
fn host_mode(_metadata: &std::fs::Metadata) -> Option<Mode> {
    None
}
