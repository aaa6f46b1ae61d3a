use crate::support::{file_nodes_with, fixed_fs, root};
use dagfs::tree::{compute_node_id, Node};
use dagfs::{Caller, FsError};
use proptest::prelude::*;
use std::collections::BTreeMap;

#[test]
fn hash_is_deterministic_and_field_sensitive() {
    let base = Node::file(b"data".to_vec(), 0o644, 1000, 1000, 42);
    assert_eq!(
        compute_node_id(&base),
        compute_node_id(&Node::file(b"data".to_vec(), 0o644, 1000, 1000, 42))
    );

    let variants = [
        Node::file(b"datA".to_vec(), 0o644, 1000, 1000, 42),
        Node::file(b"data".to_vec(), 0o600, 1000, 1000, 42),
        Node::file(b"data".to_vec(), 0o644, 1001, 1000, 42),
        Node::file(b"data".to_vec(), 0o644, 1000, 1001, 42),
        Node::file(b"data".to_vec(), 0o644, 1000, 1000, 43),
        Node::symlink("data".to_string(), 1000, 1000, 42),
    ];
    for variant in &variants {
        assert_ne!(compute_node_id(&base), compute_node_id(variant));
    }

    // entry order never leaks into the digest
    let mut forward = BTreeMap::new();
    forward.insert("a".to_string(), [1u8; 32]);
    forward.insert("b".to_string(), [2u8; 32]);
    let mut backward = BTreeMap::new();
    backward.insert("b".to_string(), [2u8; 32]);
    backward.insert("a".to_string(), [1u8; 32]);
    assert_eq!(
        compute_node_id(&Node::directory(forward, 0o755, 0, 0, 0)),
        compute_node_id(&Node::directory(backward, 0o755, 0, 0, 0))
    );
}

#[test]
fn identical_content_is_stored_once() {
    let (mut fs, _clock) = fixed_fs(1_000);
    fs.mkdir("/p", false, &root()).unwrap();
    fs.write("/p/one", b"same bytes", &root()).unwrap();
    fs.write("/p/two", b"same bytes", &root()).unwrap();

    assert_eq!(
        fs.stat("/p/one", &root()).unwrap().hash,
        fs.stat("/p/two", &root()).unwrap().hash
    );
    assert_eq!(file_nodes_with(&fs, b"same bytes"), 1);
}

#[test]
fn overwritten_node_stays_fetchable_until_purge() {
    let (mut fs, clock) = fixed_fs(1_000);
    fs.write("/doc", b"v1", &root()).unwrap();
    let v1 = fs.stat("/doc", &root()).unwrap().hash;
    clock.advance(1);
    fs.write("/doc", b"v2", &root()).unwrap();
    clock.advance(1);
    fs.write("/doc", b"v3", &root()).unwrap();

    assert!(matches!(fs.get_node(&v1).unwrap(), Node::File(f) if f.content == b"v1"));
    fs.purge();
    assert!(matches!(fs.get_node(&v1), Err(FsError::NotFound(_))));
    assert_eq!(fs.read("/doc", &root()).unwrap(), b"v3");
}

#[test]
fn rm_is_soft_until_purge() {
    let (mut fs, _clock) = fixed_fs(1_000);
    fs.write("/gone", b"bye", &root()).unwrap();
    let id = fs.stat("/gone", &root()).unwrap().hash;

    fs.rm("/gone", false, &root()).unwrap();
    assert!(matches!(fs.stat("/gone", &root()), Err(FsError::NotFound(_))));
    assert!(fs.get_node(&id).is_ok());

    fs.purge();
    assert!(fs.get_node(&id).is_err());
}

#[test]
fn purge_keeps_nodes_reachable_from_other_paths() {
    let (mut fs, _clock) = fixed_fs(1_000);
    fs.write("/a", b"shared", &root()).unwrap();
    fs.link("/a", "/b", &root()).unwrap();
    let id = fs.stat("/a", &root()).unwrap().hash;
    fs.rm("/a", false, &root()).unwrap();
    fs.purge();
    assert!(fs.get_node(&id).is_ok());
    assert_eq!(fs.read("/b", &root()).unwrap(), b"shared");
}

#[test]
fn symlink_cycle_fails_fast() {
    let (mut fs, _clock) = fixed_fs(1_000);
    fs.symlink("/b", "/a", &root()).unwrap();
    fs.symlink("/a", "/b", &root()).unwrap();
    assert!(matches!(fs.resolve("/a", true), Err(FsError::SymlinkLoop(_))));
    assert!(matches!(fs.read("/a/x", &root()), Err(FsError::SymlinkLoop(_))));
    assert!(matches!(fs.readlink("/a", &root()).as_deref(), Ok("/b")));
}

#[test]
fn denied_write_leaves_root_unchanged() {
    let (mut fs, _clock) = fixed_fs(1_000);
    fs.write("/protected", b"original", &root()).unwrap();
    fs.chmod("/protected", 0o644, &root()).unwrap();
    let before = fs.root_hash();

    let stranger = Caller::new(1002, 1002);
    let err = fs.write("/protected", b"tampered", &stranger).unwrap_err();
    assert!(matches!(err, FsError::PermissionDenied(_)));
    assert_eq!(fs.root_hash(), before);
    assert_eq!(fs.read("/protected", &stranger).unwrap(), b"original");
}

#[test]
fn group_members_get_group_access() {
    let (mut fs, _clock) = fixed_fs(1_000);
    fs.mkdir("/team", false, &root()).unwrap();
    fs.chown("/team", 0, 2000, &root()).unwrap();
    fs.chmod("/team", 0o775, &root()).unwrap();

    let alice = dagfs::users::caller_for(&fs, "alice").unwrap();
    fs.write("/team/plan", b"ship it", &alice).unwrap();
    let user = dagfs::users::caller_for(&fs, "user").unwrap();
    assert!(matches!(
        fs.write("/team/other", b"x", &user),
        Err(FsError::PermissionDenied(_))
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn written_bytes_read_back_and_dedupe(
        name_a in "[a-z]{1,8}",
        name_b in "[A-Z]{1,8}",
        content in proptest::collection::vec(any::<u8>(), 1..256),
    ) {
        let (mut fs, _clock) = fixed_fs(1_000);
        let a = format!("/a_{}", name_a);
        let b = format!("/b_{}", name_b);
        fs.write(&a, &content, &root()).unwrap();
        fs.write(&b, &content, &root()).unwrap();

        prop_assert_eq!(fs.read(&a, &root()).unwrap(), content.clone());
        prop_assert_eq!(
            fs.stat(&a, &root()).unwrap().hash,
            fs.stat(&b, &root()).unwrap().hash
        );
        prop_assert_eq!(file_nodes_with(&fs, &content), 1);
    }

    #[test]
    fn node_hash_tracks_every_field(
        content in proptest::collection::vec(any::<u8>(), 0..64),
        mode in 0u32..0o7777,
        uid in 0u32..5000,
        mtime in 0u64..1_000_000,
    ) {
        let node = Node::file(content.clone(), mode, uid, 0, mtime);
        prop_assert_eq!(
            compute_node_id(&node),
            compute_node_id(&Node::file(content.clone(), mode, uid, 0, mtime))
        );
        prop_assert_ne!(
            compute_node_id(&node),
            compute_node_id(&Node::file(content, mode, uid, 0, mtime + 1))
        );
    }
}
