//! Environment variable source: DAGFS prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub const ENV_PREFIX: &str = "DAGFS";

/// Add the environment overlay, e.g. `DAGFS__FILESYSTEM__FILE_MODE=384`.
///
/// The double underscore keeps `DAGFS_LOG*` logging variables out of the config tree.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    )
}
