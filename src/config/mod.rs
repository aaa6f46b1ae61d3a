//! Configuration
//!
//! Layered with the `config` crate: built-in defaults, the global
//! `config.toml`, an explicit `--config` file, then `DAGFS__SECTION__KEY`
//! environment variables.

pub mod facade;
pub mod merge;
pub mod sources;

pub use facade::ConfigLoader;

use crate::error::ApiError;
use crate::fs::{FsOptions, DEFAULT_DEVICE_READ_LEN};
use crate::logging::LoggingConfig;
use crate::resolve::DEFAULT_SYMLINK_HOP_LIMIT;
use crate::tree::node::{DIR_DEFAULT_PERMS, FILE_DEFAULT_PERMS, PERM_MASK};
use crate::types::Mode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Document path used when neither the CLI nor the config names one
pub const DEFAULT_DOCUMENT: &str = "dagfs.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagfsConfig {
    #[serde(default)]
    pub filesystem: FsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsConfig {
    #[serde(default = "default_file_mode")]
    pub file_mode: Mode,
    #[serde(default = "default_dir_mode")]
    pub dir_mode: Mode,
    #[serde(default = "default_hop_limit")]
    pub symlink_hop_limit: usize,
    /// Create `/etc` and `/dev` on a fresh filesystem
    #[serde(default = "default_true")]
    pub bootstrap: bool,
    #[serde(default = "default_device_read_len")]
    pub device_read_len: usize,
}

fn default_file_mode() -> Mode {
    FILE_DEFAULT_PERMS
}

fn default_dir_mode() -> Mode {
    DIR_DEFAULT_PERMS
}

fn default_hop_limit() -> usize {
    DEFAULT_SYMLINK_HOP_LIMIT
}

fn default_true() -> bool {
    true
}

fn default_device_read_len() -> usize {
    DEFAULT_DEVICE_READ_LEN
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            file_mode: default_file_mode(),
            dir_mode: default_dir_mode(),
            symlink_hop_limit: default_hop_limit(),
            bootstrap: default_true(),
            device_read_len: default_device_read_len(),
        }
    }
}

impl From<&FsConfig> for FsOptions {
    fn from(config: &FsConfig) -> Self {
        FsOptions {
            file_mode: config.file_mode,
            dir_mode: config.dir_mode,
            symlink_hop_limit: config.symlink_hop_limit,
            device_read_len: config.device_read_len,
            bootstrap: config.bootstrap,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Document the CLI loads and saves
    #[serde(default)]
    pub document: Option<PathBuf>,
}

impl DagfsConfig {
    pub fn validate(&self) -> Result<(), ApiError> {
        let fs = &self.filesystem;
        for (key, mode) in [("file_mode", fs.file_mode), ("dir_mode", fs.dir_mode)] {
            if mode & !PERM_MASK != 0 {
                return Err(ApiError::ConfigError(format!(
                    "filesystem.{} {:o} exceeds {:o}",
                    key, mode, PERM_MASK
                )));
            }
        }
        if fs.symlink_hop_limit == 0 {
            return Err(ApiError::ConfigError(
                "filesystem.symlink_hop_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn fs_options(&self) -> FsOptions {
        FsOptions::from(&self.filesystem)
    }

    pub fn document_path(&self) -> PathBuf {
        self.store
            .document
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOCUMENT))
    }
}
