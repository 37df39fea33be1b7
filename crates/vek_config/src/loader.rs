//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::VekConfig;
use std::path::Path;

/// Name of the configuration file within a project directory.
pub const CONFIG_FILE: &str = "vek.toml";

/// Environment variables that switch on per-file hit/miss logging.
const VERBOSE_ENV_VARS: [&str; 2] = ["VEK_CACHE_DEBUG", "DEBUG"];

/// Loads and validates `<project_dir>/vek.toml`.
pub fn load_config(project_dir: &Path) -> Result<VekConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<VekConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Like [`load_config`], but a missing `vek.toml` yields the defaults.
pub fn load_config_or_default(project_dir: &Path) -> Result<VekConfig, ConfigError> {
    match load_config(project_dir) {
        Err(ConfigError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok(VekConfig::default())
        }
        other => other,
    }
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<VekConfig, ConfigError> {
    let config: VekConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Applies environment-driven settings on top of a loaded configuration.
pub fn apply_env_overrides(config: &mut VekConfig) {
    if verbose_from_env(|key| std::env::var(key).ok()) {
        config.cache.verbose = true;
    }
}

/// Returns `true` if any verbosity variable holds a truthy value.
///
/// `lookup` abstracts `std::env::var` so the rule can be tested without
/// touching the process environment.
pub fn verbose_from_env(lookup: impl Fn(&str) -> Option<String>) -> bool {
    VERBOSE_ENV_VARS.iter().any(|key| {
        lookup(key).is_some_and(|value| {
            let value = value.trim();
            !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
        })
    })
}

fn validate_config(config: &VekConfig) -> Result<(), ConfigError> {
    let cache = &config.cache;
    if cache.cache_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "cache.cache_dir must not be empty".to_string(),
        ));
    }
    if cache.max_entries == 0 {
        return Err(ConfigError::ValidationError(
            "cache.max_entries must be positive".to_string(),
        ));
    }
    for (field, patterns) in [("include", &cache.include), ("exclude", &cache.exclude)] {
        if patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "cache.{field} contains an empty pattern"
            )));
        }
    }
    Ok(())
}
