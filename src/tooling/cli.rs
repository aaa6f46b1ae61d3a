//! CLI Tooling
//!
//! Command surface of the `dagfs` binary. Each invocation loads the document,
//! runs one command as one caller and writes the document back when the
//! command changed anything.

use crate::clock::SystemClock;
use crate::concurrency::SharedFileSystem;
use crate::config::{ConfigLoader, DagfsConfig};
use crate::error::{ApiError, FsError};
use crate::fs::{FileSystem, FsOptions, Stat};
use crate::host::{self, HostOptions};
use crate::permissions::{format_perms, Caller};
use crate::store::persistence::{load_document, save_document};
use crate::tree::node::PERM_MASK;
use crate::tree::NodeKind;
use crate::types::{node_id_to_hex, short_id, Gid, Mode, Timestamp, Uid};
use crate::users;
use clap::{Parser, Subcommand};
use comfy_table::{presets, Table};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// dagfs - content-addressed virtual filesystem
#[derive(Parser)]
#[command(name = "dagfs")]
#[command(about = "Content-addressed virtual filesystem backed by a Merkle DAG")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Filesystem document to load and save (default: store.document or dagfs.json)
    #[arg(long)]
    pub doc: Option<PathBuf>,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Act as a user listed in /etc/passwd
    #[arg(long, conflicts_with_all = ["uid", "gid"])]
    pub user: Option<String>,

    /// Act as this uid (default: 0)
    #[arg(long)]
    pub uid: Option<Uid>,

    /// Primary gid when using --uid (default: same as uid)
    #[arg(long)]
    pub gid: Option<Gid>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Fold the logging flags into a loaded configuration
    pub fn apply_overrides(&self, config: &mut DagfsConfig) {
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            config.logging.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            config.logging.file = Some(file.clone());
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a fresh filesystem document
    Init {
        /// Overwrite an existing document
        #[arg(long)]
        force: bool,
    },
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
        /// Long listing with mode, owner, size and mtime
        #[arg(short, long)]
        long: bool,
    },
    /// Print file contents
    Cat { path: String },
    /// Write DATA to a file, creating it if needed
    Write {
        path: String,
        data: String,
        /// Append instead of overwriting
        #[arg(short, long)]
        append: bool,
    },
    /// Create a directory
    Mkdir {
        path: String,
        /// Create missing parents; no error if it exists
        #[arg(short, long)]
        parents: bool,
    },
    /// Remove an entry (soft delete until purge)
    Rm {
        path: String,
        #[arg(short, long)]
        recursive: bool,
    },
    /// Remove an empty directory
    Rmdir { path: String },
    /// Move or rename an entry
    Mv { src: String, dst: String },
    /// Copy a file, or a directory with -r
    Cp {
        src: String,
        dst: String,
        #[arg(short, long)]
        recursive: bool,
    },
    /// Create a hard link, or a symbolic link with -s
    Ln {
        target: String,
        link: String,
        #[arg(short, long)]
        symbolic: bool,
    },
    /// Print a symlink's target
    Readlink { path: String },
    /// Change permission bits (octal)
    Chmod { mode: String, path: String },
    /// Change owner: UID[:GID], names or numbers
    Chown { owner: String, path: String },
    /// Show node metadata
    Stat {
        path: String,
        /// Follow a final symlink
        #[arg(short = 'L', long)]
        dereference: bool,
    },
    /// Create an empty file or refresh its mtime
    Touch { path: String },
    /// Drop nodes unreachable from the current root
    Purge,
    /// Check every reachable node against its hash
    Verify,
    /// Copy a host file or directory into the filesystem
    Import {
        host: PathBuf,
        vpath: String,
        #[arg(long)]
        preserve_permissions: bool,
    },
    /// Copy a subtree out to the host
    Export {
        vpath: String,
        host: PathBuf,
        #[arg(long)]
        preserve_permissions: bool,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Init { .. } => "init",
            Commands::Ls { .. } => "ls",
            Commands::Cat { .. } => "cat",
            Commands::Write { .. } => "write",
            Commands::Mkdir { .. } => "mkdir",
            Commands::Rm { .. } => "rm",
            Commands::Rmdir { .. } => "rmdir",
            Commands::Mv { .. } => "mv",
            Commands::Cp { .. } => "cp",
            Commands::Ln { .. } => "ln",
            Commands::Readlink { .. } => "readlink",
            Commands::Chmod { .. } => "chmod",
            Commands::Chown { .. } => "chown",
            Commands::Stat { .. } => "stat",
            Commands::Touch { .. } => "touch",
            Commands::Purge => "purge",
            Commands::Verify => "verify",
            Commands::Import { .. } => "import",
            Commands::Export { .. } => "export",
        }
    }

    /// Whether a successful run must be saved back to the document
    pub fn mutates(&self) -> bool {
        !matches!(
            self,
            Commands::Ls { .. }
                | Commands::Cat { .. }
                | Commands::Readlink { .. }
                | Commands::Stat { .. }
                | Commands::Verify
                | Commands::Export { .. }
        )
    }
}

/// CLI context: one loaded filesystem, one caller, one document path
pub struct CliContext {
    fs: SharedFileSystem,
    document: PathBuf,
    caller: Caller,
    options: FsOptions,
}

impl CliContext {
    /// Load configuration and the document named by the CLI
    pub fn new(cli: &Cli) -> Result<Self, ApiError> {
        let mut config = ConfigLoader::load(cli.config.as_deref())?;
        cli.apply_overrides(&mut config);
        Self::with_config(cli, &config)
    }

    pub fn with_config(cli: &Cli, config: &DagfsConfig) -> Result<Self, ApiError> {
        let document = cli.doc.clone().unwrap_or_else(|| config.document_path());
        let options = config.fs_options();
        let fs = if document.exists() {
            let doc = load_document(&document)?;
            FileSystem::import_with(&doc, options.clone(), Arc::new(SystemClock))?
        } else {
            FileSystem::with_options(options.clone(), Arc::new(SystemClock))
        };
        let caller = resolve_caller(&fs, cli)?;
        Ok(Self {
            fs: SharedFileSystem::new(fs),
            document,
            caller,
            options,
        })
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    pub fn document_path(&self) -> &Path {
        &self.document
    }

    pub fn filesystem(&self) -> &SharedFileSystem {
        &self.fs
    }

    /// Execute a CLI command, saving the document if it mutated state
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let output = self.execute_inner(command)?;
        if command.mutates() {
            self.save()?;
        }
        info!(
            command = command.name(),
            uid = self.caller.uid,
            root = %short_id(&self.fs.root_hash()),
            "Command completed"
        );
        Ok(output)
    }

    fn save(&self) -> Result<(), ApiError> {
        let document = self.fs.read(|fs| fs.export());
        save_document(&document, &self.document)
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        let caller = &self.caller;
        match command {
            Commands::Init { force } => {
                if self.document.exists() && !force {
                    return Err(FsError::AlreadyExists(format!(
                        "{} (use --force to overwrite)",
                        self.document.display()
                    ))
                    .into());
                }
                let fresh = FileSystem::with_options(self.options.clone(), Arc::new(SystemClock));
                self.fs.write(|fs| *fs = fresh);
                Ok(format!("Initialized {}", self.document.display()))
            }
            Commands::Ls { path, long } => self.fs.read(|fs| {
                if *long {
                    self.long_listing(fs, path)
                } else {
                    Ok(fs.ls(path, caller)?.join("\n"))
                }
            }),
            Commands::Cat { path } => self.fs.read(|fs| {
                let data = fs.read(path, caller)?;
                Ok(String::from_utf8_lossy(&data).into_owned())
            }),
            Commands::Write { path, data, append } => self.fs.write(|fs| {
                if *append {
                    fs.append(path, data.as_bytes(), caller)?;
                } else {
                    fs.write(path, data.as_bytes(), caller)?;
                }
                Ok(format!("Wrote {} bytes to {}", data.len(), path))
            }),
            Commands::Mkdir { path, parents } => self.fs.write(|fs| {
                fs.mkdir(path, *parents, caller)?;
                Ok(format!("Created directory {}", path))
            }),
            Commands::Rm { path, recursive } => self.fs.write(|fs| {
                fs.rm(path, *recursive, caller)?;
                Ok(format!("Removed {}", path))
            }),
            Commands::Rmdir { path } => self.fs.write(|fs| {
                fs.rmdir(path, caller)?;
                Ok(format!("Removed directory {}", path))
            }),
            Commands::Mv { src, dst } => self.fs.write(|fs| {
                fs.rename(src, dst, caller)?;
                Ok(format!("Moved {} -> {}", src, dst))
            }),
            Commands::Cp {
                src,
                dst,
                recursive,
            } => self.fs.write(|fs| {
                fs.cp(src, dst, *recursive, caller)?;
                Ok(format!("Copied {} -> {}", src, dst))
            }),
            Commands::Ln {
                target,
                link,
                symbolic,
            } => self.fs.write(|fs| {
                if *symbolic {
                    fs.symlink(target, link, caller)?;
                } else {
                    fs.link(target, link, caller)?;
                }
                Ok(format!("Linked {} -> {}", link, target))
            }),
            Commands::Readlink { path } => Ok(self.fs.read(|fs| fs.readlink(path, caller))?),
            Commands::Chmod { mode, path } => {
                let mode = parse_mode(mode)?;
                self.fs.write(|fs| {
                    fs.chmod(path, mode, caller)?;
                    Ok(format!("Mode of {} set to {:04o}", path, mode))
                })
            }
            Commands::Chown { owner, path } => self.fs.write(|fs| {
                let current = fs.stat(path, caller)?;
                let (uid, gid) = parse_owner(fs, owner, current.gid)?;
                fs.chown(path, uid, gid, caller)?;
                Ok(format!("Owner of {} set to {}:{}", path, uid, gid))
            }),
            Commands::Stat { path, dereference } => self.fs.read(|fs| {
                let stat = if *dereference {
                    fs.stat(path, caller)?
                } else {
                    fs.lstat(path, caller)?
                };
                Ok(format_stat(fs, path, &stat))
            }),
            Commands::Touch { path } => self.fs.write(|fs| {
                fs.touch(path, caller)?;
                Ok(format!("Touched {}", path))
            }),
            Commands::Purge => {
                let purged = self.fs.write(|fs| fs.purge());
                Ok(format!("Purged {} unreachable nodes", purged))
            }
            Commands::Verify => {
                let report = self.fs.read(|fs| fs.verify())?;
                Ok(format!(
                    "OK: {} reachable nodes, {} stored, root {}",
                    report.reachable,
                    report.stored,
                    node_id_to_hex(&self.fs.root_hash())
                ))
            }
            Commands::Import {
                host,
                vpath,
                preserve_permissions,
            } => {
                let options = HostOptions {
                    preserve_permissions: *preserve_permissions,
                };
                let count = self
                    .fs
                    .write(|fs| host::import_from_host(fs, host, vpath, options, caller))?;
                Ok(format!("Imported {} entries into {}", count, vpath))
            }
            Commands::Export {
                vpath,
                host,
                preserve_permissions,
            } => {
                let options = HostOptions {
                    preserve_permissions: *preserve_permissions,
                };
                let count = self
                    .fs
                    .read(|fs| host::export_to_host(fs, vpath, host, options, caller))?;
                Ok(format!("Exported {} entries to {}", count, host.display()))
            }
        }
    }

    fn long_listing(&self, fs: &FileSystem, path: &str) -> Result<String, ApiError> {
        let entries = fs.read_dir(path, &self.caller)?;
        let mut table = Table::new();
        table.load_preset(presets::NOTHING);
        for entry in &entries {
            let stat = &entry.stat;
            let name = if stat.kind == NodeKind::Symlink {
                let link = format!("{}/{}", path.trim_end_matches('/'), entry.name);
                format!("{} -> {}", entry.name, fs.readlink(&link, &self.caller)?)
            } else {
                entry.name.clone()
            };
            table.add_row(vec![
                mode_string(stat.kind, stat.mode),
                owner_name(fs, stat.uid),
                group_label(fs, stat.gid),
                stat.size.to_string(),
                format_mtime(stat.mtime),
                name,
            ]);
        }
        Ok(table.to_string())
    }
}

fn resolve_caller(fs: &FileSystem, cli: &Cli) -> Result<Caller, ApiError> {
    if let Some(name) = &cli.user {
        return Ok(users::caller_for(fs, name)?);
    }
    Ok(match cli.uid {
        Some(uid) => Caller::new(uid, cli.gid.unwrap_or(uid)),
        None => Caller::root(),
    })
}

/// `644`, `0644` or `0o644`
pub fn parse_mode(mode: &str) -> Result<Mode, FsError> {
    let digits = mode.trim_start_matches("0o");
    Mode::from_str_radix(digits, 8)
        .ok()
        .filter(|m| m & !PERM_MASK == 0)
        .ok_or_else(|| FsError::InvalidArgument(format!("invalid mode {:?}", mode)))
}

/// `UID[:GID]` where each part is a number or a name
pub fn parse_owner(fs: &FileSystem, spec: &str, current_gid: Gid) -> Result<(Uid, Gid), FsError> {
    let (user, group) = match spec.split_once(':') {
        Some((user, group)) => (user, Some(group)),
        None => (spec, None),
    };
    let uid = match user.parse::<Uid>() {
        Ok(uid) => uid,
        Err(_) => users::lookup_user(fs, user)?.uid,
    };
    let gid = match group {
        None | Some("") => current_gid,
        Some(group) => match group.parse::<Gid>() {
            Ok(gid) => gid,
            Err(_) => users::groups(fs)?
                .into_iter()
                .find(|g| g.name == group)
                .map(|g| g.gid)
                .ok_or_else(|| FsError::NotFound(format!("group {}", group)))?,
        },
    };
    Ok((uid, gid))
}

fn type_char(kind: NodeKind) -> char {
    match kind {
        NodeKind::File => '-',
        NodeKind::Directory => 'd',
        NodeKind::Symlink => 'l',
        NodeKind::Device => 'c',
    }
}

fn mode_string(kind: NodeKind, mode: Mode) -> String {
    format!("{}{}", type_char(kind), format_perms(mode))
}

fn owner_name(fs: &FileSystem, uid: Uid) -> String {
    users::user_name(fs, uid).unwrap_or_else(|| uid.to_string())
}

fn group_label(fs: &FileSystem, gid: Gid) -> String {
    users::group_name(fs, gid).unwrap_or_else(|| gid.to_string())
}

fn format_mtime(mtime: Timestamp) -> String {
    i64::try_from(mtime)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| mtime.to_string())
}

fn format_stat(fs: &FileSystem, path: &str, stat: &Stat) -> String {
    [
        format!("  Path: {}", path),
        format!("  Type: {}", stat.kind.as_str()),
        format!(
            "  Mode: {:04o} ({})",
            stat.mode & PERM_MASK,
            mode_string(stat.kind, stat.mode)
        ),
        format!("   Uid: {} ({})", stat.uid, owner_name(fs, stat.uid)),
        format!("   Gid: {} ({})", stat.gid, group_label(fs, stat.gid)),
        format!("  Size: {}", stat.size),
        format!("Modify: {}", format_mtime(stat.mtime)),
        format!("  Hash: {}", node_id_to_hex(&stat.hash)),
    ]
    .join("\n")
}
