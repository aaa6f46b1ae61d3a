//! Core types for the dagfs content-addressed filesystem.

/// NodeID: Deterministic hash of a filesystem node (file, directory, symlink or device)
pub type NodeID = [u8; 32];

/// Owner user id
pub type Uid = u32;

/// Owner group id
pub type Gid = u32;

/// Unix mode word: file type bits plus permission bits
pub type Mode = u32;

/// Modification time in whole seconds since the Unix epoch
pub type Timestamp = u64;

/// Render a NodeID as lowercase hex
pub fn node_id_to_hex(id: &NodeID) -> String {
    hex::encode(id)
}

/// Parse a 64-character hex string into a NodeID
pub fn node_id_from_hex(s: &str) -> Option<NodeID> {
    let bytes = hex::decode(s).ok()?;
    bytes.try_into().ok()
}

/// Short form used in human-readable output
pub fn short_id(id: &NodeID) -> String {
    let full = node_id_to_hex(id);
    full[..12].to_string()
}
