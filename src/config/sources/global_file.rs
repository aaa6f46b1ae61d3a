//! Per-user config file: `$XDG_CONFIG_HOME/dagfs/config.toml` on Linux

use config::builder::DefaultState;
use config::{ConfigBuilder, File};
use std::path::{Path, PathBuf};

pub fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "dagfs").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Add the global file if it exists.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>, path: &Path) -> ConfigBuilder<DefaultState> {
    builder.add_source(File::from(path).required(false))
}
