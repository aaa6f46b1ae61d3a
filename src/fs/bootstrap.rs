//! Initial filesystem layout: `/etc` user database and `/dev` devices

use crate::store::NodeStore;
use crate::tree::node::{DIR_DEFAULT_PERMS, FILE_DEFAULT_PERMS};
use crate::tree::{DeviceKind, Node};
use crate::types::{NodeID, Timestamp};
use std::collections::BTreeMap;

pub const DEFAULT_PASSWD: &str = "root:x:0:0:root:/root:/bin/sh
user:x:1000:1000:Default User:/home/user:/bin/sh
alice:x:1001:1001:Alice:/home/alice:/bin/sh
bob:x:1002:1002:Bob:/home/bob:/bin/sh
";

pub const DEFAULT_GROUP: &str = "root:x:0:
user:x:1000:
alice:x:1001:
bob:x:1002:
developers:x:2000:alice,bob
";

/// Empty root directory owned by root
pub(crate) fn empty_root(now: Timestamp) -> Node {
    Node::directory(BTreeMap::new(), DIR_DEFAULT_PERMS, 0, 0, now)
}

/// Build the default layout into `store` and return the new root hash
pub(crate) fn populate(store: &mut NodeStore, now: Timestamp) -> NodeID {
    let passwd = store.put(Node::file(
        DEFAULT_PASSWD.as_bytes().to_vec(),
        FILE_DEFAULT_PERMS,
        0,
        0,
        now,
    ));
    let group = store.put(Node::file(
        DEFAULT_GROUP.as_bytes().to_vec(),
        FILE_DEFAULT_PERMS,
        0,
        0,
        now,
    ));
    let mut etc = BTreeMap::new();
    etc.insert("passwd".to_string(), passwd);
    etc.insert("group".to_string(), group);
    let etc = store.put(Node::directory(etc, DIR_DEFAULT_PERMS, 0, 0, now));

    let mut dev = BTreeMap::new();
    for kind in DeviceKind::ALL {
        let id = store.put(Node::device(kind, now));
        dev.insert(kind.as_str().to_string(), id);
    }
    let dev = store.put(Node::directory(dev, DIR_DEFAULT_PERMS, 0, 0, now));

    let mut root = BTreeMap::new();
    root.insert("etc".to_string(), etc);
    root.insert("dev".to_string(), dev);
    store.put(Node::directory(root, DIR_DEFAULT_PERMS, 0, 0, now))
}
