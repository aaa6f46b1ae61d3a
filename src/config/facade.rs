//! ConfigLoader facade delegating to the merge service.

use super::merge::service::MergeService;
use super::sources::global_file;
use super::DagfsConfig;
use crate::error::ApiError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, the global file, an optional explicit file and the environment.
    pub fn load(explicit: Option<&Path>) -> Result<DagfsConfig, ApiError> {
        MergeService::load(global_file::default_path().as_deref(), explicit)
    }

    /// Load configuration from a specific file, skipping the global one.
    pub fn load_from_file(path: &Path) -> Result<DagfsConfig, ApiError> {
        MergeService::load(None, Some(path))
    }

    pub fn default() -> DagfsConfig {
        DagfsConfig::default()
    }
}
