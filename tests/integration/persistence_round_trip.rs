use crate::support::{fixed_fs, root};
use dagfs::store::persistence::{load_document, save_document, NodeRecord};
use dagfs::tree::compute_node_id;
use dagfs::types::node_id_to_hex;
use dagfs::{ApiError, Document, FileSystem, FsError};
use tempfile::TempDir;

fn populated() -> FileSystem {
    let (mut fs, clock) = fixed_fs(1_000);
    let caller = root();
    fs.mkdir("/srv/www", true, &caller).unwrap();
    fs.write("/srv/www/index.html", b"<h1>hi</h1>", &caller).unwrap();
    fs.write("/srv/blob", &[0u8, 1, 2, 254, 255], &caller).unwrap();
    fs.symlink("/srv/www", "/www", &caller).unwrap();
    fs.symlink("/missing", "/broken", &caller).unwrap();
    clock.advance(5);
    fs.write("/srv/blob", b"replaced", &caller).unwrap();
    fs.chown("/srv/www", 1001, 2000, &caller).unwrap();
    fs
}

const PATHS: &[&str] = &[
    "/",
    "/srv",
    "/srv/www",
    "/srv/www/index.html",
    "/srv/blob",
    "/www",
    "/broken",
    "/etc/passwd",
    "/dev/random",
];

#[test]
fn import_of_export_resolves_every_path_identically() {
    let fs = populated();
    let json = fs.export().to_json().unwrap();
    let restored = FileSystem::import(&Document::from_json(&json).unwrap()).unwrap();

    assert_eq!(restored.root_hash(), fs.root_hash());
    assert_eq!(restored.node_count(), fs.node_count());
    for path in PATHS {
        assert_eq!(
            restored.resolve(path, false).unwrap(),
            fs.resolve(path, false).unwrap(),
            "{}",
            path
        );
    }
    for (id, node) in restored.store().iter() {
        assert_eq!(compute_node_id(node), *id);
    }
    // history travels with the document
    let report = restored.verify().unwrap();
    assert!(report.stored > report.reachable);
}

#[test]
fn document_file_round_trip() {
    let fs = populated();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/state.json");
    save_document(&fs.export(), &path).unwrap();
    let restored = FileSystem::import(&load_document(&path).unwrap()).unwrap();
    assert_eq!(
        restored.read("/srv/blob", &root()).unwrap(),
        b"replaced".to_vec()
    );
    assert_eq!(restored.stat("/srv/www", &root()).unwrap().gid, 2000);
}

#[test]
fn tampered_content_is_rejected() {
    let fs = populated();
    let mut doc = fs.export();
    let id = node_id_to_hex(&fs.resolve("/srv/www/index.html", true).unwrap());
    match doc.nodes.get_mut(&id) {
        Some(NodeRecord::File { content, .. }) => *content = hex::encode(b"<h1>pwned</h1>"),
        other => panic!("unexpected record {:?}", other),
    }
    assert!(matches!(
        FileSystem::import(&doc),
        Err(FsError::CorruptDocument(_))
    ));
}

#[test]
fn dangling_entry_and_bad_root_are_rejected() {
    let fs = populated();

    let mut doc = fs.export();
    let www = node_id_to_hex(&fs.resolve("/srv/www", true).unwrap());
    doc.nodes.remove(&www);
    assert!(matches!(
        FileSystem::import(&doc),
        Err(FsError::CorruptDocument(_))
    ));

    let mut doc = fs.export();
    doc.root = node_id_to_hex(&fs.resolve("/srv/blob", true).unwrap());
    assert!(matches!(
        FileSystem::import(&doc),
        Err(FsError::CorruptDocument(_))
    ));
}

#[test]
fn malformed_document_file_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{\"version\": 1, \"root\": ").unwrap();
    assert!(matches!(
        load_document(&path),
        Err(ApiError::Fs(FsError::CorruptDocument(_)))
    ));
}
