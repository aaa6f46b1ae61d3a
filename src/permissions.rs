//! Permission checking
//!
//! Standard Unix precedence: the owner triad applies when the caller owns the
//! node, else the group triad when the node's group is one of the caller's
//! groups, else the other triad. uid 0 bypasses every check. The bits are
//! advisory bookkeeping; nothing stops code with direct store access.

use crate::tree::NodeMeta;
use crate::types::{Gid, Mode, Uid};

/// Kind of access being checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Execute,
}

impl Access {
    /// Bit within a single rwx triad
    fn triad_bit(&self) -> Mode {
        match self {
            Access::Read => 0o4,
            Access::Write => 0o2,
            Access::Execute => 0o1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Read => "read",
            Access::Write => "write",
            Access::Execute => "execute",
        }
    }
}

/// Identity an operation runs as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub uid: Uid,
    pub gid: Gid,
    /// Supplementary groups
    pub groups: Vec<Gid>,
}

impl Caller {
    pub fn new(uid: Uid, gid: Gid) -> Self {
        Self {
            uid,
            gid,
            groups: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(0, 0)
    }

    pub fn with_groups(mut self, groups: impl IntoIterator<Item = Gid>) -> Self {
        self.groups = groups.into_iter().collect();
        self
    }

    pub fn is_root(&self) -> bool {
        self.uid == 0
    }

    pub fn in_group(&self, gid: Gid) -> bool {
        self.gid == gid || self.groups.contains(&gid)
    }
}

/// Evaluate `access` for `caller` against a node's metadata
pub fn check(meta: &NodeMeta, caller: &Caller, access: Access) -> bool {
    if caller.is_root() {
        return true;
    }
    let shift = if caller.uid == meta.uid {
        6
    } else if caller.in_group(meta.gid) {
        3
    } else {
        0
    };
    meta.mode & (access.triad_bit() << shift) != 0
}

pub fn can_read(meta: &NodeMeta, caller: &Caller) -> bool {
    check(meta, caller, Access::Read)
}

pub fn can_write(meta: &NodeMeta, caller: &Caller) -> bool {
    check(meta, caller, Access::Write)
}

pub fn can_execute(meta: &NodeMeta, caller: &Caller) -> bool {
    check(meta, caller, Access::Execute)
}

/// Render permission bits as `rwxr-xr-x`
pub fn format_perms(mode: Mode) -> String {
    let mut out = String::with_capacity(9);
    for shift in [6, 3, 0] {
        let triad = (mode >> shift) & 0o7;
        out.push(if triad & 0o4 != 0 { 'r' } else { '-' });
        out.push(if triad & 0o2 != 0 { 'w' } else { '-' });
        out.push(if triad & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}
