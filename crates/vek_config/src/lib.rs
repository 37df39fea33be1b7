//! Parsing and validation of `vek.toml` cache configuration.
//!
//! This crate reads the `[cache]` table of the project configuration file and
//! produces a strongly-typed [`CacheConfig`] with defaults, validation, and
//! environment-driven verbosity.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{
    apply_env_overrides, load_config, load_config_file, load_config_from_str,
    load_config_or_default, verbose_from_env, CONFIG_FILE,
};
pub use types::*;
