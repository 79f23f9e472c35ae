//! Transport-specific error types.
//!
//! Defines error types for channel transport operations, separate from
//! registry-level errors to maintain clean separation of concerns.

use thiserror::Error;

/// Errors that can occur during transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The specified device was not found on the system.
    #[error("Device not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during transport operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The transport has been closed and can no longer be used.
    #[error("Transport is closed")]
    Closed,
}

impl TransportError {
    /// Create a NotFound error from a device path.
    pub fn not_found(device: impl Into<String>) -> Self {
        Self::NotFound(device.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::not_found("/dev/ttyUSB0");
        assert_eq!(err.to_string(), "Device not found: /dev/ttyUSB0");

        let err = TransportError::config("Invalid data bits");
        assert_eq!(err.to_string(), "Configuration error: Invalid data bits");

        let err = TransportError::Closed;
        assert_eq!(err.to_string(), "Transport is closed");
    }
}
