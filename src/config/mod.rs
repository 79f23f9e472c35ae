//! Configuration module for the harness.
//!
//! This module provides TOML-based configuration of the channel catalog,
//! serial defaults and external command names.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of
//! priority):
//!
//! 1. `HIL_HARNESS_CONFIG` environment variable (explicit path)
//! 2. `./hil-harness.toml` (current directory)
//! 3. Built-in defaults (no file required)
//!
//! # Device Resolution
//!
//! Channel names never carry device paths directly. Each catalog entry names
//! an environment variable (`HIL_SERIAL_DEV` and friends by default) which is
//! read when the channel is opened. A variable that is unset at open time is
//! a fatal configuration error for that open, not for the whole process.

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load, load_from, resolve_config_path, CONFIG_PATH_ENV};
pub use schema::{ChannelSpec, CommandsConfig, HarnessConfig, SerialConfig};
