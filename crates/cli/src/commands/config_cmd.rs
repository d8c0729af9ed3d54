//! `parley config`: show the effective configuration.

use std::path::Path;

use crate::TargetArgs;

pub fn run(config_path: &Path, show_path: bool) -> Result<(), Box<dyn std::error::Error>> {
    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    let config = super::load_config(config_path, &TargetArgs::default())
        .map_err(|e| format!("Failed to load config: {e}"))?;
    print!("{}", config.to_toml()?);
    Ok(())
}
