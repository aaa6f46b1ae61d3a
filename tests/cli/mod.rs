//! CLI command surface tests

use clap::Parser;
use dagfs::tooling::cli::{Cli, CliContext, Commands};
use dagfs::{ApiError, FsError};
use std::path::Path;
use tempfile::TempDir;

/// Parse and run one invocation against `doc`
fn run(doc: &Path, args: &[&str]) -> Result<String, ApiError> {
    let mut argv = vec!["dagfs", "--doc", doc.to_str().unwrap()];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    let context = CliContext::new(&cli)?;
    context.execute(&cli.command)
}

#[test]
fn state_persists_between_invocations() {
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("fs.json");

    run(&doc, &["init"]).unwrap();
    assert!(doc.exists());
    run(&doc, &["mkdir", "-p", "/srv/app"]).unwrap();
    run(&doc, &["write", "/srv/app/conf", "port=80"]).unwrap();
    run(&doc, &["write", "-a", "/srv/app/conf", "\nhost=::"]).unwrap();

    assert_eq!(run(&doc, &["cat", "/srv/app/conf"]).unwrap(), "port=80\nhost=::");
    assert_eq!(run(&doc, &["ls", "/srv"]).unwrap(), "app");
    assert!(run(&doc, &["verify"]).unwrap().starts_with("OK"));
}

#[test]
fn init_refuses_to_clobber_without_force() {
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("fs.json");
    run(&doc, &["init"]).unwrap();
    run(&doc, &["write", "/keep", "x"]).unwrap();

    let err = run(&doc, &["init"]).unwrap_err();
    assert!(matches!(err, ApiError::Fs(FsError::AlreadyExists(_))));
    assert_eq!(run(&doc, &["cat", "/keep"]).unwrap(), "x");

    run(&doc, &["init", "--force"]).unwrap();
    assert!(run(&doc, &["cat", "/keep"]).is_err());
}

#[test]
fn read_only_commands_leave_document_untouched() {
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("fs.json");
    run(&doc, &["init"]).unwrap();
    let before = std::fs::read(&doc).unwrap();
    run(&doc, &["ls", "-l", "/"]).unwrap();
    run(&doc, &["stat", "/etc/passwd"]).unwrap();
    assert_eq!(std::fs::read(&doc).unwrap(), before);
}

#[test]
fn user_identity_is_enforced() {
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("fs.json");
    run(&doc, &["init"]).unwrap();
    run(&doc, &["mkdir", "/home"]).unwrap();
    run(&doc, &["mkdir", "/home/alice"]).unwrap();
    run(&doc, &["chown", "alice:alice", "/home/alice"]).unwrap();

    run(&doc, &["--user", "alice", "write", "/home/alice/diary", "dear"]).unwrap();
    run(&doc, &["--user", "alice", "chmod", "600", "/home/alice/diary"]).unwrap();

    let err = run(&doc, &["--user", "bob", "cat", "/home/alice/diary"]).unwrap_err();
    assert!(matches!(err, ApiError::Fs(FsError::PermissionDenied(_))));
    let err = run(&doc, &["--uid", "1002", "write", "/etc/passwd", ""]).unwrap_err();
    assert!(matches!(err, ApiError::Fs(FsError::PermissionDenied(_))));
    let err = run(&doc, &["--user", "mallory", "ls"]).unwrap_err();
    assert!(matches!(err, ApiError::Fs(FsError::NotFound(_))));
}

#[test]
fn long_listing_and_stat_output() {
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("fs.json");
    run(&doc, &["init"]).unwrap();
    run(&doc, &["ln", "-s", "/etc/passwd", "/pw"]).unwrap();

    let listing = run(&doc, &["ls", "-l", "/"]).unwrap();
    assert!(listing.contains("drwxr-xr-x"));
    assert!(listing.contains("pw -> /etc/passwd"));
    assert!(listing.contains("root"));

    let stat = run(&doc, &["stat", "/pw"]).unwrap();
    assert!(stat.contains("Type: symlink"));
    let stat = run(&doc, &["stat", "-L", "/pw"]).unwrap();
    assert!(stat.contains("Type: file"));
    assert!(stat.contains("Mode: 0644 (-rw-r--r--)"));
    assert_eq!(run(&doc, &["readlink", "/pw"]).unwrap(), "/etc/passwd");
}

#[test]
fn rm_then_purge_through_cli() {
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("fs.json");
    run(&doc, &["init"]).unwrap();
    run(&doc, &["mkdir", "-p", "/tmp/work"]).unwrap();
    run(&doc, &["write", "/tmp/work/a", "1"]).unwrap();
    run(&doc, &["mv", "/tmp/work/a", "/tmp/b"]).unwrap();
    run(&doc, &["cp", "-r", "/tmp/work", "/tmp/copy"]).unwrap();
    run(&doc, &["rm", "-r", "/tmp/work"]).unwrap();
    run(&doc, &["rmdir", "/tmp/copy"]).unwrap();

    let out = run(&doc, &["purge"]).unwrap();
    assert!(out.starts_with("Purged "));
    assert_eq!(run(&doc, &["ls", "/tmp"]).unwrap(), "b");
    assert_eq!(run(&doc, &["purge"]).unwrap(), "Purged 0 unreachable nodes");
}

#[test]
fn host_import_and_export() {
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("fs.json");
    let src = dir.path().join("src");
    std::fs::create_dir_all(src.join("lib")).unwrap();
    std::fs::write(src.join("lib/mod.txt"), "module").unwrap();

    run(&doc, &["init"]).unwrap();
    let out = run(&doc, &["import", src.to_str().unwrap(), "/project"]).unwrap();
    assert_eq!(out, "Imported 3 entries into /project");
    assert_eq!(run(&doc, &["cat", "/project/lib/mod.txt"]).unwrap(), "module");

    let out_dir = dir.path().join("out");
    run(&doc, &["export", "/project", out_dir.to_str().unwrap()]).unwrap();
    assert_eq!(
        std::fs::read_to_string(out_dir.join("lib/mod.txt")).unwrap(),
        "module"
    );
}

#[test]
fn missing_document_starts_from_bootstrap_layout() {
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("never-written.json");
    assert_eq!(run(&doc, &["ls"]).unwrap(), "dev\netc");
    assert!(!doc.exists());
}

#[test]
fn command_names_cover_parsed_commands() {
    let cli = Cli::try_parse_from(["dagfs", "chown", "1000:1000", "/x"]).unwrap();
    assert_eq!(cli.command.name(), "chown");
    assert!(matches!(cli.command, Commands::Chown { .. }));
    assert!(Cli::try_parse_from(["dagfs", "--user", "alice", "--uid", "1", "ls"]).is_err());
}
