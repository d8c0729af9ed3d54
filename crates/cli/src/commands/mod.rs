pub mod config_cmd;
pub mod doctor;
pub mod talk;

use std::path::Path;

use parley_config::{AppConfig, ConfigError};

use crate::TargetArgs;

/// Load `path`, apply environment then command-line overrides, and validate.
///
/// Precedence, lowest first: defaults, file, `PARLEY_*` env, HOST, `--endpoint`.
pub fn load_config(path: &Path, target: &TargetArgs) -> Result<AppConfig, ConfigError> {
    let mut config = AppConfig::load_with_env(path)?;

    if let Some(host) = &target.host {
        config = config.with_host(host);
    }
    if let Some(endpoint) = &target.endpoint {
        config.endpoint = endpoint.clone();
    }

    config.validate()?;
    Ok(config)
}
