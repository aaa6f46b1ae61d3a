use crate::support::{file_nodes_with, fixed_fs, root};
use dagfs::FsError;

#[test]
fn shared_file_survives_until_last_reference_is_purged() {
    let (mut fs, _clock) = fixed_fs(1_700_000_000);
    let caller = root();

    fs.mkdir("/p", false, &caller).unwrap();
    fs.write("/p/a.txt", b"X", &caller).unwrap();
    fs.write("/p/b.txt", b"X", &caller).unwrap();

    let file = fs.stat("/p/a.txt", &caller).unwrap().hash;
    assert_eq!(fs.stat("/p/b.txt", &caller).unwrap().hash, file);
    assert_eq!(file_nodes_with(&fs, b"X"), 1);

    fs.rm("/p/a.txt", false, &caller).unwrap();
    assert_eq!(fs.ls("/p", &caller).unwrap(), vec!["b.txt"]);

    // No file node is reclaimed, only superseded directories: the bootstrap
    // root plus the root and /p of each of the three edits (mkdir, two
    // writes) that the rm replaced.
    let before = fs.node_count();
    assert_eq!(fs.purge(), 7);
    assert_eq!(fs.node_count(), before - 7);
    assert!(fs.get_node(&file).is_ok());
    assert_eq!(file_nodes_with(&fs, b"X"), 1);

    // the file node, the /p holding only b.txt and the root above it
    fs.rm("/p/b.txt", false, &caller).unwrap();
    assert_eq!(fs.purge(), 3);
    assert!(matches!(fs.get_node(&file), Err(FsError::NotFound(_))));
    assert_eq!(file_nodes_with(&fs, b"X"), 0);
    assert!(fs.ls("/p", &caller).unwrap().is_empty());
}

#[test]
fn user_session_in_home_directory() {
    let (mut fs, clock) = fixed_fs(1_700_000_000);
    let admin = root();
    fs.mkdir("/home/alice", true, &admin).unwrap();
    fs.chown("/home/alice", 1001, 1001, &admin).unwrap();

    let alice = dagfs::users::caller_for(&fs, "alice").unwrap();
    fs.mkdir("/home/alice/notes", false, &alice).unwrap();
    fs.write("/home/alice/notes/todo.txt", b"- buy milk\n", &alice).unwrap();
    clock.advance(60);
    fs.append("/home/alice/notes/todo.txt", b"- write tests\n", &alice).unwrap();
    fs.symlink("notes/todo.txt", "/home/alice/todo", &alice).unwrap();

    assert_eq!(
        fs.read("/home/alice/todo", &alice).unwrap(),
        b"- buy milk\n- write tests\n"
    );
    fs.rename("/home/alice/notes", "/home/alice/archive", &alice).unwrap();
    // relative link now dangles
    assert!(matches!(fs.read("/home/alice/todo", &alice), Err(FsError::NotFound(_))));

    let bob = dagfs::users::caller_for(&fs, "bob").unwrap();
    fs.chmod("/home/alice/archive/todo.txt", 0o600, &alice).unwrap();
    assert!(matches!(
        fs.read("/home/alice/archive/todo.txt", &bob),
        Err(FsError::PermissionDenied(_))
    ));
    assert!(matches!(
        fs.rm("/home/alice/archive", true, &bob),
        Err(FsError::PermissionDenied(_))
    ));
    fs.verify().unwrap();
}
