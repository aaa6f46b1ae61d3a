//! Path normalization
//!
//! Paths are never stored. They are normalized lexically (collapsing `.`,
//! `..` and repeated separators) into segments and then walked from the root.

use crate::error::FsError;

/// Split an absolute path into normalized segments.
///
/// `..` at the root stays at the root.
pub fn normalize(path: &str) -> Result<Vec<String>, FsError> {
    if path.is_empty() {
        return Err(FsError::InvalidArgument("empty path".to_string()));
    }
    if !path.starts_with('/') {
        return Err(FsError::InvalidArgument(format!(
            "path must be absolute: {}",
            path
        )));
    }
    if path.contains('\0') {
        return Err(FsError::InvalidArgument(format!(
            "path contains NUL byte: {:?}",
            path
        )));
    }
    let mut segments = Vec::new();
    push_segments(&mut segments, path);
    Ok(segments)
}

/// Apply the components of `path` on top of `segments`.
///
/// Used for symlink targets: an absolute target starts over from the root,
/// a relative one continues from the link's directory.
pub fn push_segments(segments: &mut Vec<String>, path: &str) {
    if path.starts_with('/') {
        segments.clear();
    }
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name.to_string()),
        }
    }
}

/// Render segments back as an absolute path
pub fn join(segments: &[String]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// Validate a single directory entry name
pub fn validate_name(name: &str) -> Result<(), FsError> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(FsError::InvalidArgument(format!(
            "invalid entry name: {:?}",
            name
        )));
    }
    if name.contains('/') || name.contains('\0') {
        return Err(FsError::InvalidArgument(format!(
            "invalid entry name: {:?}",
            name
        )));
    }
    Ok(())
}

/// Whether `descendant` equals `ancestor` or lies beneath it
pub fn is_within(ancestor: &[String], descendant: &[String]) -> bool {
    descendant.len() >= ancestor.len() && descendant[..ancestor.len()] == *ancestor
}
