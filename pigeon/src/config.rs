use std::path::{Path, PathBuf};

use crate::controller::Pigeon;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "PIGEON_CONFIG";

/// Places searched, in order, when no configuration file was named
pub const DEFAULT_PATHS: [&str; 2] = ["./pigeon.config.ron", "/etc/pigeon/pigeon.config.ron"];

/// Find the configuration file using the following precedence:
/// 1. `explicit`, usually from the command line
/// 2. `PIGEON_CONFIG` environment variable
/// 3. ./pigeon.config.ron (current working directory)
/// 4. /etc/pigeon/pigeon.config.ron (system-wide config)
///
/// # Errors
/// If a named file does not exist, or none of the default paths do
pub fn find_config_file(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!("Configuration file does not exist: {}", path.display());
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!(
            "{CONFIG_ENV} points to non-existent file: {}",
            path.display()
        );
    }

    if let Some(path) = DEFAULT_PATHS.iter().map(PathBuf::from).find(|p| p.exists()) {
        return Ok(path);
    }

    let paths_tried = DEFAULT_PATHS
        .iter()
        .map(|p| format!("  - {p}"))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - {CONFIG_ENV} environment variable\n{paths_tried}"
    )
}

/// Read and parse the configuration at `path`.
///
/// # Errors
/// If the file cannot be read or is not a valid configuration
pub fn load(path: &Path) -> anyhow::Result<Pigeon> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        anyhow::anyhow!("Failed to read config from {}: {e}", path.display())
    })?;

    parse(&content).map_err(|e| anyhow::anyhow!("Invalid config in {}: {e}", path.display()))
}

/// Parse a configuration from RON text.
///
/// # Errors
/// If `content` is not a valid configuration
pub fn parse(content: &str) -> anyhow::Result<Pigeon> {
    Ok(ron::from_str(content)?)
}
