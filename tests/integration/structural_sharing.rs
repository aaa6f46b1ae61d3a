use crate::support::{fixed_fs, root};
use dagfs::{FsError, SharedFileSystem};
use std::thread;

#[test]
fn write_rewrites_only_the_ancestor_chain() {
    let (mut fs, clock) = fixed_fs(1_000);
    let caller = root();
    fs.mkdir("/a/b/c", true, &caller).unwrap();
    fs.mkdir("/side/deep", true, &caller).unwrap();
    fs.write("/side/deep/f", b"untouched", &caller).unwrap();

    let side = fs.stat("/side", &caller).unwrap().hash;
    let etc = fs.stat("/etc", &caller).unwrap().hash;
    let a_before = fs.stat("/a", &caller).unwrap();
    let b_before = fs.stat("/a/b", &caller).unwrap();
    let c_before = fs.stat("/a/b/c", &caller).unwrap();

    clock.advance(30);
    fs.write("/a/b/c/new", b"x", &caller).unwrap();

    // siblings are shared as-is
    assert_eq!(fs.stat("/side", &caller).unwrap().hash, side);
    assert_eq!(fs.stat("/etc", &caller).unwrap().hash, etc);

    // every ancestor gets a new hash; only the direct parent a new mtime
    let a_after = fs.stat("/a", &caller).unwrap();
    let b_after = fs.stat("/a/b", &caller).unwrap();
    let c_after = fs.stat("/a/b/c", &caller).unwrap();
    assert_ne!(a_after.hash, a_before.hash);
    assert_ne!(b_after.hash, b_before.hash);
    assert_ne!(c_after.hash, c_before.hash);
    assert_eq!(a_after.mtime, a_before.mtime);
    assert_eq!(b_after.mtime, b_before.mtime);
    assert_eq!(c_after.mtime, c_before.mtime + 30);
}

#[test]
fn writes_through_symlinked_directories_update_the_target() {
    let (mut fs, _clock) = fixed_fs(1_000);
    let caller = root();
    fs.mkdir("/data/current", true, &caller).unwrap();
    fs.symlink("/data/current", "/cur", &caller).unwrap();
    fs.write("/cur/file", b"via link", &caller).unwrap();
    assert_eq!(fs.read("/data/current/file", &caller).unwrap(), b"via link");
    assert_eq!(fs.readlink("/cur", &caller).unwrap(), "/data/current");
}

#[test]
fn rename_never_exposes_an_intermediate_tree() {
    let (mut fs, _clock) = fixed_fs(1_000);
    let caller = root();
    fs.mkdir("/left", false, &caller).unwrap();
    fs.mkdir("/right", false, &caller).unwrap();
    fs.write("/left/token", b"t", &caller).unwrap();
    let shared = SharedFileSystem::new(fs);

    let mover = {
        let shared = shared.clone();
        thread::spawn(move || {
            for i in 0..100 {
                let (from, to) = if i % 2 == 0 {
                    ("/left/token", "/right/token")
                } else {
                    ("/right/token", "/left/token")
                };
                shared.write(|fs| fs.rename(from, to, &root())).unwrap();
            }
        })
    };

    for _ in 0..200 {
        let present = shared.read(|fs| {
            ["/left/token", "/right/token"]
                .iter()
                .filter(|p| fs.exists(p, &caller))
                .count()
        });
        assert_eq!(present, 1);
    }
    mover.join().unwrap();
}

#[test]
fn failed_rename_changes_nothing() {
    let (mut fs, _clock) = fixed_fs(1_000);
    let caller = root();
    fs.mkdir("/dir/sub", true, &caller).unwrap();
    fs.write("/file", b"f", &caller).unwrap();
    let before = fs.root_hash();
    let count = fs.node_count();

    assert!(matches!(
        fs.rename("/file", "/dir", &caller),
        Err(FsError::NotAFile(_))
    ));
    assert!(matches!(
        fs.rename("/dir", "/dir/sub/inside", &caller),
        Err(FsError::InvalidArgument(_))
    ));
    assert!(matches!(
        fs.rename("/file", "/nope/file", &caller),
        Err(FsError::NotFound(_))
    ));
    assert_eq!(fs.root_hash(), before);
    assert_eq!(fs.node_count(), count);
}
