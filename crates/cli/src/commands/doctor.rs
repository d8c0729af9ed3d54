//! `parley doctor`: diagnose configuration and backend health.

use std::path::Path;

use parley_core::provider::Provider;
use parley_providers::OllamaProvider;

use crate::TargetArgs;

pub async fn run(config_path: &Path, target: TargetArgs) -> Result<(), Box<dyn std::error::Error>> {
    println!("Parley Doctor: System Diagnostics");
    println!("=================================\n");

    let mut issues = 0;

    if config_path.exists() {
        println!("  [ok]   Config file found at {}", config_path.display());
    } else {
        println!("  [info] No config file at {}, using defaults", config_path.display());
    }

    let config = match super::load_config(config_path, &target) {
        Ok(config) => {
            println!("  [ok]   Configuration valid");
            config
        }
        Err(e) => {
            println!("  [fail] Configuration invalid: {e}");
            return Err(e.into());
        }
    };

    println!("         Endpoint:  {}", config.endpoint);
    println!("         Model:     {}", config.model);
    println!(
        "         Agents:    {}",
        config
            .agents
            .iter()
            .map(|a| a.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let provider = OllamaProvider::new(
        &config.endpoint,
        config.connect_timeout(),
        config.read_timeout(),
    )?;

    match provider.health_check().await {
        Ok(true) => {
            println!("  [ok]   Backend reachable at {}", provider.endpoint());
            match provider.list_models().await {
                Ok(models) if models.iter().any(|m| m == &config.model) => {
                    println!("  [ok]   Model '{}' is installed", config.model);
                }
                Ok(models) => {
                    println!(
                        "  [warn] Model '{}' not among the {} installed model(s)",
                        config.model,
                        models.len()
                    );
                    issues += 1;
                }
                Err(e) => {
                    println!("  [warn] Could not list models: {e}");
                    issues += 1;
                }
            }
        }
        Ok(false) => {
            println!("  [fail] Backend answered but reported an error");
            issues += 1;
        }
        Err(e) => {
            println!("  [fail] Backend unreachable: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
