//! Serial device transport.
//!
//! Wraps the `serialport` crate's `SerialPort` trait with our own
//! `ChannelTransport` trait for dependency injection and testing.

use super::error::TransportError;
use super::traits::{ChannelTransport, SerialParams};
use std::io::{Read, Write};

/// Serial transport backed by a real device node.
///
/// Opened with a short read timeout (the poll interval) so that the delivery
/// loop's reads return promptly when no bytes have arrived.
pub struct SerialTransport {
    /// The underlying serial port implementation.
    port: Box<dyn serialport::SerialPort>,
    /// The device path for identification.
    name: String,
}

impl SerialTransport {
    /// Open a serial device with the given connection parameters.
    ///
    /// # Arguments
    /// * `device` - The system path of the device (e.g., "/dev/ttyUSB0" or "COM3")
    /// * `params` - Baud rate, data bits and poll interval
    pub fn open(device: &str, params: &SerialParams) -> Result<Self, TransportError> {
        let port = serialport::new(device, params.baud_rate)
            .data_bits(params.data_bits.into())
            .timeout(params.poll_interval)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => TransportError::not_found(device),
                serialport::ErrorKind::InvalidInput => TransportError::config(e.to_string()),
                _ => TransportError::Serial(e),
            })?;

        Ok(Self {
            port,
            name: device.to_string(),
        })
    }

    /// Open a serial device with default parameters (9600 baud, 8 data bits).
    pub fn open_default(device: &str) -> Result<Self, TransportError> {
        Self::open(device, &SerialParams::default())
    }
}

impl ChannelTransport for SerialTransport {
    fn read_chunk(&mut self, buffer: &mut [u8]) -> Result<usize, TransportError> {
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            // An expired poll interval is "no data yet", not a failure.
            Err(e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                Ok(0)
            }
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.port.write_all(data).map_err(TransportError::Io)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.port.flush().map_err(TransportError::Io)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn try_clone(&self) -> Result<Box<dyn ChannelTransport>, TransportError> {
        let port = self.port.try_clone().map_err(TransportError::Serial)?;
        Ok(Box::new(Self {
            port,
            name: self.name.clone(),
        }))
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate())
            .finish()
    }
}
