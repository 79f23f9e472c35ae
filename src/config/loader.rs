//! Configuration loader with file resolution support.

use super::error::{ConfigError, ConfigResult};
use super::schema::HarnessConfig;
use std::path::{Path, PathBuf};

/// Environment variable for an explicit config file path.
pub const CONFIG_PATH_ENV: &str = "HIL_HARNESS_CONFIG";

/// Config file name looked for in the current directory.
const CONFIG_FILE_NAME: &str = "hil-harness.toml";

/// Load configuration using standard resolution order.
///
/// Resolution priority (highest to lowest):
/// 1. `HIL_HARNESS_CONFIG` environment variable (explicit path)
/// 2. `./hil-harness.toml` (current directory)
/// 3. Built-in defaults (no file required)
pub fn load() -> ConfigResult<HarnessConfig> {
    match resolve_config_path() {
        Some(path) => load_from(path),
        None => Ok(HarnessConfig::default()),
    }
}

/// Load configuration from a specific file path.
pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<HarnessConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&contents)?)
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [serial]
            default_baud = 57600

            [commands]
            build = "flash_app"
            "#
        )
        .unwrap();

        let config = load_from(file.path()).unwrap();
        assert_eq!(config.serial.default_baud, 57600);
        assert_eq!(config.commands.build, "flash_app");
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = load_from("/nonexistent/hil-harness.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_from_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "serial = \"not a table\"").unwrap();

        let err = load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
