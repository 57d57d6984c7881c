//! Configuration management for the CLI
//!
//! Settings are layered: built-in defaults, then the config file, then
//! `KINV_*` environment variables, then command-line flags.

use anyhow::{Context, Result};
use inventory_lib::InventoryConfig;
use std::path::{Path, PathBuf};

use crate::CollectArgs;

/// Load inventory settings from the config file and environment.
///
/// An explicitly given file must exist; the default location is optional.
pub fn load(explicit: Option<&Path>) -> Result<InventoryConfig> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (default_config_path()?, false),
    };

    let settings = config::Config::builder()
        .add_source(config::File::from(path.clone()).required(required))
        .add_source(
            config::Environment::with_prefix("KINV")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

    settings
        .try_deserialize()
        .context("Invalid inventory configuration")
}

/// Command-line flags take precedence over file and environment settings
pub fn apply_flags(mut config: InventoryConfig, args: &CollectArgs) -> InventoryConfig {
    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    if let Some(parallelism) = args.parallelism {
        config.parallelism = Some(parallelism);
    }
    if let Some(discipline) = args.discipline {
        config.discipline = discipline;
    }
    config.obfuscate |= args.obfuscate;
    config.resume |= args.resume;
    config
}

/// Get the configuration file path
fn default_config_path() -> Result<PathBuf> {
    let home = dirs_next::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("kinv").join("config.toml"))
}
