//! Core traits for channel transport abstraction.
//!
//! Defines the `ChannelTransport` trait that allows both real serial devices
//! and mock implementations to be used interchangeably by the registry and
//! the delivery loop.

use super::error::TransportError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection parameters for a serial channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialParams {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// How long a single delivery-loop read may block waiting for bytes.
    /// Short by design so one slow channel cannot starve the others.
    pub poll_interval: Duration,
}

impl Default for SerialParams {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl SerialParams {
    /// Parameters with a non-default baud rate, everything else default.
    pub fn with_baud(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::default()
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl DataBits {
    /// Map a raw bit count to the enum, `None` for unsupported counts.
    pub fn from_count(count: u8) -> Option<Self> {
        match count {
            5 => Some(Self::Five),
            6 => Some(Self::Six),
            7 => Some(Self::Seven),
            8 => Some(Self::Eight),
            _ => None,
        }
    }
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Trait for channel transport I/O.
///
/// This trait abstracts over the byte-stream endpoints a channel can be
/// backed by, allowing both real serial hardware and mock implementations
/// for testing. A transport hands out an independent read handle via
/// [`ChannelTransport::try_clone`] so that the delivery loop can poll for
/// incoming bytes while the registry keeps the write side.
pub trait ChannelTransport: Send + std::fmt::Debug {
    /// Read whatever bytes have arrived, up to `buffer.len()`.
    ///
    /// Returns `Ok(0)` when nothing arrived within the transport's poll
    /// interval. Real errors (device unplugged, descriptor closed) are
    /// returned as `Err` and cause the delivery loop to drop the channel.
    fn read_chunk(&mut self, buffer: &mut [u8]) -> Result<usize, TransportError>;

    /// Write all of `data` to the transport.
    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Flush any buffered outbound bytes.
    fn flush(&mut self) -> Result<(), TransportError>;

    /// Get the name/path of this transport endpoint.
    fn name(&self) -> &str;

    /// Create an independent handle to the same underlying endpoint.
    ///
    /// The clone is handed to the delivery loop for reading while the
    /// original stays with the registry for writing.
    fn try_clone(&self) -> Result<Box<dyn ChannelTransport>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = SerialParams::default();
        assert_eq!(params.baud_rate, 9600);
        assert_eq!(params.data_bits, DataBits::Eight);
        assert_eq!(params.poll_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_with_baud() {
        let params = SerialParams::with_baud(115200);
        assert_eq!(params.baud_rate, 115200);
        assert_eq!(params.data_bits, DataBits::Eight);
    }

    #[test]
    fn test_data_bits_from_count() {
        assert_eq!(DataBits::from_count(8), Some(DataBits::Eight));
        assert_eq!(DataBits::from_count(5), Some(DataBits::Five));
        assert_eq!(DataBits::from_count(9), None);
    }

    #[test]
    fn test_data_bits_conversion() {
        let bits = DataBits::Seven;
        let serialport_bits: serialport::DataBits = bits.into();
        assert_eq!(serialport_bits, serialport::DataBits::Seven);
    }
}
