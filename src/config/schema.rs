//! Configuration schema definitions.
//!
//! This module defines the structure of the harness configuration using
//! serde. All sections carry defaults so no file is required: the stock
//! channel catalog and external command names match the harness's standard
//! bench setup.

use super::error::{ConfigError, ConfigResult};
use crate::transport::{DataBits, SerialParams};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Channel catalog: channel name -> where its device path comes from.
    pub channels: BTreeMap<String, ChannelSpec>,
    /// Serial connection defaults.
    pub serial: SerialConfig,
    /// External command names.
    pub commands: CommandsConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            channels: default_channels(),
            serial: SerialConfig::default(),
            commands: CommandsConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// The environment variable holding `channel`'s device path, if the
    /// channel is part of the catalog.
    pub fn channel_env(&self, channel: &str) -> Option<&str> {
        self.channels.get(channel).map(|spec| spec.env.as_str())
    }

    /// Resolve the device path for a cataloged channel.
    ///
    /// Reads the environment at call time, so a variable exported after
    /// process start is honored. An unset variable is a fatal
    /// [`ConfigError::MissingEnv`].
    pub fn resolve_device(&self, channel: &str, env_var: &str) -> ConfigResult<String> {
        std::env::var(env_var).map_err(|_| ConfigError::MissingEnv {
            var: env_var.to_string(),
            channel: channel.to_string(),
        })
    }

    /// Build serial connection parameters from the configured defaults.
    pub fn serial_params(&self) -> ConfigResult<SerialParams> {
        let data_bits = DataBits::from_count(self.serial.data_bits).ok_or_else(|| {
            ConfigError::invalid(
                "serial.data_bits",
                format!("{} is not a supported data bit count", self.serial.data_bits),
            )
        })?;
        Ok(SerialParams {
            baud_rate: self.serial.default_baud,
            data_bits,
            poll_interval: Duration::from_millis(self.serial.poll_interval_ms),
        })
    }
}

/// One catalog entry: where a named channel's device path comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// Environment variable holding the device path (e.g. `/dev/ttyACM0`).
    pub env: String,
}

impl ChannelSpec {
    pub fn new(env: impl Into<String>) -> Self {
        Self { env: env.into() }
    }
}

/// The stock bench catalog: the device's primary USB CDC port, its hardware
/// UART, and the secondary USB serial interface.
fn default_channels() -> BTreeMap<String, ChannelSpec> {
    BTreeMap::from([
        ("Serial".to_string(), ChannelSpec::new("HIL_SERIAL_DEV")),
        ("Serial1".to_string(), ChannelSpec::new("HIL_SERIAL1_DEV")),
        (
            "USBSerial1".to_string(),
            ChannelSpec::new("HIL_USB_SERIAL1_DEV"),
        ),
    ])
}

/// Serial connection defaults section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Default baud rate for new connections
    pub default_baud: u32,
    /// Default number of data bits
    pub data_bits: u8,
    /// Delivery-loop poll interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            default_baud: 9600,
            data_bits: 8,
            poll_interval_ms: 10,
        }
    }
}

/// External command names section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Command that builds and flashes an application directory.
    pub build: String,
    /// Command that performs a USB control transfer.
    pub usb_transfer: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            build: "make_app".to_string(),
            usb_transfer: "send_usb_req".to_string(),
        }
    }
}
