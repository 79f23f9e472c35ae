//! Unified error handling.
//!
//! Every failure mode of the harness funnels into [`HarnessError`] so that a
//! scenario runner can use one `Result` alias end to end. All of these are
//! surfaced to the calling scenario step and treated as that step's failure;
//! none are retried automatically.

use crate::buffer::WaitError;
use crate::cmd::CommandError;
use crate::config::ConfigError;
use crate::matcher::MatcherError;
use crate::registry::ChannelError;
use crate::transport::TransportError;
use crate::usb::UsbError;
use thiserror::Error;

/// Umbrella error type for harness operations.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Matcher(#[from] MatcherError),

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error(transparent)]
    Usb(#[from] UsbError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A specialized `Result` type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_error_message_passes_through() {
        let err: HarnessError = ChannelError::NotOpen("Serial1".to_string()).into();
        assert_eq!(err.to_string(), "Channel is not open: Serial1");
    }

    #[test]
    fn test_usb_error_message_passes_through() {
        let err: HarnessError = UsbError::NoReply.into();
        assert_eq!(err.to_string(), "No reply data available");
    }
}
