//! MergeService: stacks the sources in precedence order and deserializes to DagfsConfig.

use super::builder_with_defaults;
use crate::config::sources::{environment, explicit_file, global_file};
use crate::config::DagfsConfig;
use crate::error::ApiError;
use std::path::Path;
use tracing::debug;

pub struct MergeService;

impl MergeService {
    /// Precedence: defaults (lowest) -> global file -> explicit file -> environment (highest).
    ///
    /// The global file is optional; an explicit file must exist.
    pub fn load(global: Option<&Path>, explicit: Option<&Path>) -> Result<DagfsConfig, ApiError> {
        let builder = builder_with_defaults()?;
        let builder = match global {
            Some(path) => global_file::add_to_builder(builder, path),
            None => builder,
        };
        let builder = match explicit {
            Some(path) => explicit_file::add_to_builder(builder, path)?,
            None => builder,
        };
        let builder = environment::add_to_builder(builder);

        let config: DagfsConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        debug!(?global, ?explicit, "Loaded configuration");
        Ok(config)
    }
}
