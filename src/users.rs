//! User database backed by `/etc/passwd` and `/etc/group`
//!
//! Both files live inside the filesystem itself, so edits to them take
//! effect on the next lookup. Malformed lines are skipped.

use crate::error::FsError;
use crate::fs::FileSystem;
use crate::permissions::Caller;
use crate::types::{Gid, Uid};
use std::collections::BTreeSet;
use tracing::debug;

pub const PASSWD_PATH: &str = "/etc/passwd";
pub const GROUP_PATH: &str = "/etc/group";

/// One `/etc/passwd` record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntry {
    pub name: String,
    pub uid: Uid,
    pub gid: Gid,
    pub home: String,
}

/// One `/etc/group` record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    pub gid: Gid,
    pub members: Vec<String>,
}

/// Parse `name:x:uid:gid:gecos:home:shell` lines
pub fn parse_passwd(content: &str) -> Vec<UserEntry> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(':').collect();
            if fields.len() < 4 {
                debug!(line, "Skipping malformed passwd line");
                return None;
            }
            Some(UserEntry {
                name: fields[0].to_string(),
                uid: fields[2].parse().ok()?,
                gid: fields[3].parse().ok()?,
                home: fields.get(5).map(|s| s.to_string()).unwrap_or_default(),
            })
        })
        .collect()
}

/// Parse `name:x:gid:member,member` lines
pub fn parse_group(content: &str) -> Vec<GroupEntry> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(':').collect();
            if fields.len() < 3 {
                debug!(line, "Skipping malformed group line");
                return None;
            }
            let members = fields
                .get(3)
                .map(|m| {
                    m.split(',')
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            Some(GroupEntry {
                name: fields[0].to_string(),
                gid: fields[2].parse().ok()?,
                members,
            })
        })
        .collect()
}

fn read_db(fs: &FileSystem, path: &str) -> Result<String, FsError> {
    let bytes = fs.read(path, &Caller::root())?;
    String::from_utf8(bytes)
        .map_err(|_| FsError::InvalidArgument(format!("{} is not valid UTF-8", path)))
}

pub fn users(fs: &FileSystem) -> Result<Vec<UserEntry>, FsError> {
    Ok(parse_passwd(&read_db(fs, PASSWD_PATH)?))
}

pub fn groups(fs: &FileSystem) -> Result<Vec<GroupEntry>, FsError> {
    Ok(parse_group(&read_db(fs, GROUP_PATH)?))
}

/// Look up a user by name
pub fn lookup_user(fs: &FileSystem, name: &str) -> Result<UserEntry, FsError> {
    users(fs)?
        .into_iter()
        .find(|u| u.name == name)
        .ok_or_else(|| FsError::NotFound(format!("user {}", name)))
}

/// Primary group plus every group listing the user as a member
pub fn user_groups(fs: &FileSystem, name: &str) -> Result<BTreeSet<Gid>, FsError> {
    let user = lookup_user(fs, name)?;
    let mut gids = BTreeSet::from([user.gid]);
    // a missing group file just means no supplementary groups
    let extra = match groups(fs) {
        Ok(groups) => groups,
        Err(FsError::NotFound(_)) => Vec::new(),
        Err(e) => return Err(e),
    };
    for group in extra {
        if group.members.iter().any(|m| m == name) {
            gids.insert(group.gid);
        }
    }
    Ok(gids)
}

/// Build the caller identity for a named user
pub fn caller_for(fs: &FileSystem, name: &str) -> Result<Caller, FsError> {
    let user = lookup_user(fs, name)?;
    let groups = user_groups(fs, name)?;
    Ok(Caller::new(user.uid, user.gid).with_groups(groups.into_iter().filter(|g| *g != user.gid)))
}

/// Name for a uid, if the passwd file knows it
pub fn user_name(fs: &FileSystem, uid: Uid) -> Option<String> {
    users(fs)
        .ok()?
        .into_iter()
        .find(|u| u.uid == uid)
        .map(|u| u.name)
}

/// Name for a gid, if the group file knows it
pub fn group_name(fs: &FileSystem, gid: Gid) -> Option<String> {
    groups(fs)
        .ok()?
        .into_iter()
        .find(|g| g.gid == gid)
        .map(|g| g.name)
}
