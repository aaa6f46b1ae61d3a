//! dagfs: Content-Addressed Virtual Filesystem
//!
//! Every file, directory, symlink and device is an immutable node keyed by
//! the BLAKE3 hash of its content and metadata. Directories map names to
//! child hashes, so the whole tree is a Merkle DAG named by its root hash.
//! Mutations build new nodes along the changed path and publish them with a
//! single root swap; replaced nodes stay in the store until `purge`.

pub mod clock;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod fs;
pub mod host;
pub mod logging;
pub mod permissions;
pub mod resolve;
pub mod store;
pub mod tooling;
pub mod tree;
pub mod types;
pub mod users;

pub use clock::{Clock, ManualClock, SystemClock};
pub use concurrency::SharedFileSystem;
pub use error::{ApiError, FsError};
pub use fs::{DirEntry, FileSystem, FsOptions, Stat, VerifyReport};
pub use permissions::{Access, Caller};
pub use store::persistence::Document;
pub use tree::{Node, NodeKind};
pub use types::NodeID;
