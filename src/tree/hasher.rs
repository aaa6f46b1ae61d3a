//! Hash computation for filesystem nodes
//!
//! The NodeID is a BLAKE3 digest over a canonical encoding of every field of
//! the node, metadata included. Two nodes with identical fields always share
//! a NodeID; changing any single field (even mtime) yields a different one.

use crate::tree::node::{Node, NodeMeta};
use crate::types::NodeID;

const DOMAIN_TAG: &[u8] = b"dagfs.node.v1";

const TAG_FILE: u8 = 0x01;
const TAG_DIRECTORY: u8 = 0x02;
const TAG_SYMLINK: u8 = 0x03;
const TAG_DEVICE: u8 = 0x04;

/// Compute NodeID for a filesystem node
pub fn compute_node_id(node: &Node) -> NodeID {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DOMAIN_TAG);

    match node {
        Node::File(file) => {
            hasher.update(&[TAG_FILE]);
            update_meta(&mut hasher, &file.meta);
            update_bytes(&mut hasher, &file.content);
        }
        Node::Directory(dir) => {
            hasher.update(&[TAG_DIRECTORY]);
            update_meta(&mut hasher, &dir.meta);
            hasher.update(&(dir.children.len() as u64).to_le_bytes());
            // BTreeMap iterates in name order
            for (name, child) in &dir.children {
                update_bytes(&mut hasher, name.as_bytes());
                hasher.update(child);
            }
        }
        Node::Symlink(link) => {
            hasher.update(&[TAG_SYMLINK]);
            update_meta(&mut hasher, &link.meta);
            update_bytes(&mut hasher, link.target.as_bytes());
        }
        Node::Device(device) => {
            hasher.update(&[TAG_DEVICE]);
            update_meta(&mut hasher, &device.meta);
            update_bytes(&mut hasher, device.kind.as_str().as_bytes());
        }
    }

    *hasher.finalize().as_bytes()
}

fn update_meta(hasher: &mut blake3::Hasher, meta: &NodeMeta) {
    hasher.update(&meta.mode.to_le_bytes());
    hasher.update(&meta.uid.to_le_bytes());
    hasher.update(&meta.gid.to_le_bytes());
    hasher.update(&meta.mtime.to_le_bytes());
}

fn update_bytes(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
