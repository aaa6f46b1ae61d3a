//! Error types for dagfs.
//!
//! `FsError` is the closed taxonomy every filesystem operation returns.
//! `ApiError` covers the layers around the core: configuration, logging,
//! host directory copies, document files and the CLI.

use thiserror::Error;

/// Errors returned by filesystem operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    #[error("No such file or directory: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Not a file: {0}")]
    NotAFile(String),

    #[error("Not a symbolic link: {0}")]
    NotASymlink(String),

    #[error("Directory not empty: {0}")]
    NotEmpty(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Too many levels of symbolic links: {0}")]
    SymlinkLoop(String),

    #[error("File exists: {0}")]
    AlreadyExists(String),

    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl FsError {
    /// Stable short name of the error kind, used in CLI output and logs
    pub fn kind(&self) -> &'static str {
        match self {
            FsError::NotFound(_) => "not_found",
            FsError::NotADirectory(_) => "not_a_directory",
            FsError::NotAFile(_) => "not_a_file",
            FsError::NotASymlink(_) => "not_a_symlink",
            FsError::NotEmpty(_) => "not_empty",
            FsError::PermissionDenied(_) => "permission_denied",
            FsError::SymlinkLoop(_) => "symlink_loop",
            FsError::AlreadyExists(_) => "already_exists",
            FsError::CorruptDocument(_) => "corrupt_document",
            FsError::InvalidArgument(_) => "invalid_argument",
        }
    }
}

/// Errors from the layers around the filesystem core
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
