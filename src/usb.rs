//! USB control request/reply channel.
//!
//! A degenerate channel variant with no persistent connection and no
//! [`ConditionBuffer`](crate::buffer::ConditionBuffer): the transfer runs
//! synchronously through an external CLI tool and the reply is available
//! immediately. At most one reply is retained; a new request overwrites the
//! previous reply. "No reply stored" is a distinct state from an empty reply.
//!
//! Payloads cross the process boundary hex-encoded in both directions.

use crate::cmd::{self, CommandError};
use thiserror::Error;
use tracing::debug;

/// Default control request code, reserved for vendor requests.
pub const DEFAULT_REQUEST: u16 = 80;
/// Default request value field.
pub const DEFAULT_REQUEST_VALUE: u16 = 0;
/// Default request index: the device's test-request interface.
pub const DEFAULT_REQUEST_INDEX: u16 = 60;

/// Errors from USB channel operations.
#[derive(Debug, Error)]
pub enum UsbError {
    /// `take_reply` was called with no request sent since the last reset.
    #[error("No reply data available")]
    NoReply,

    /// The external transfer tool failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The transfer tool's reply was not valid hex.
    #[error("Reply is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Direction of a control transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// The device answers with data (IN transfer).
    #[default]
    DeviceToHost,
    /// The host sends the payload to the device (OUT transfer).
    HostToDevice,
}

/// One USB control request.
#[derive(Debug, Clone)]
pub struct UsbRequest {
    pub request: u16,
    pub value: u16,
    pub index: u16,
    pub direction: Direction,
    pub payload: Vec<u8>,
}

impl Default for UsbRequest {
    fn default() -> Self {
        Self {
            request: DEFAULT_REQUEST,
            value: DEFAULT_REQUEST_VALUE,
            index: DEFAULT_REQUEST_INDEX,
            direction: Direction::DeviceToHost,
            payload: Vec::new(),
        }
    }
}

impl UsbRequest {
    /// A default request with a non-default index.
    pub fn with_index(index: u16) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }
}

/// Performs the actual transfer. The production implementation shells out to
/// the transfer CLI; tests substitute a stub.
pub trait TransferRunner: Send {
    fn transfer(&self, args: &[String]) -> Result<String, CommandError>;
}

/// Runs transfers through the external CLI tool.
#[derive(Debug, Clone)]
pub struct CliTransfer {
    program: String,
}

impl CliTransfer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl TransferRunner for CliTransfer {
    fn transfer(&self, args: &[String]) -> Result<String, CommandError> {
        cmd::run(&self.program, args)
    }
}

/// The USB control channel: synchronous request/reply over an external tool.
pub struct UsbControlChannel {
    runner: Box<dyn TransferRunner>,
    last_reply: Option<Vec<u8>>,
}

impl UsbControlChannel {
    /// Create a channel that shells out to the given transfer program
    /// (see [`CommandsConfig`](crate::config::CommandsConfig)).
    pub fn new(program: impl Into<String>) -> Self {
        Self::with_runner(Box::new(CliTransfer::new(program)))
    }

    /// Create a channel over an explicit runner. Injection seam for tests.
    pub fn with_runner(runner: Box<dyn TransferRunner>) -> Self {
        Self {
            runner,
            last_reply: None,
        }
    }

    /// Send a control request and store its reply, overwriting any prior one.
    ///
    /// The payload is hex-encoded into the tool's `-x` argument; the tool's
    /// stdout is hex-decoded back into the stored reply bytes.
    pub fn send_request(&mut self, request: &UsbRequest) -> Result<(), UsbError> {
        let args = request_args(request);
        debug!(
            request = request.request,
            value = request.value,
            index = request.index,
            direction = ?request.direction,
            "sending USB control request"
        );
        let reply = self.runner.transfer(&args)?;
        self.last_reply = Some(hex::decode(reply.trim())?);
        Ok(())
    }

    /// The reply from the most recent request.
    ///
    /// # Errors
    ///
    /// [`UsbError::NoReply`] if no request has been sent since the last
    /// [`reset`](Self::reset).
    pub fn take_reply(&self) -> Result<&[u8], UsbError> {
        self.last_reply.as_deref().ok_or(UsbError::NoReply)
    }

    /// Discard any stored reply.
    pub fn reset(&mut self) {
        self.last_reply = None;
    }
}

impl std::fmt::Debug for UsbControlChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsbControlChannel")
            .field("has_reply", &self.last_reply.is_some())
            .finish()
    }
}

/// Build the transfer tool's argument list for a request.
fn request_args(request: &UsbRequest) -> Vec<String> {
    let mut args = vec![
        "-r".to_string(),
        request.request.to_string(),
        "-v".to_string(),
        request.value.to_string(),
        "-i".to_string(),
        request.index.to_string(),
    ];
    if request.direction == Direction::HostToDevice {
        args.push("-d".to_string());
        args.push("out".to_string());
    }
    args.push("-x".to_string());
    args.push(hex::encode(&request.payload));
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records transfer invocations and returns a canned hex reply.
    struct StubRunner {
        reply: String,
        calls: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl TransferRunner for StubRunner {
        fn transfer(&self, args: &[String]) -> Result<String, CommandError> {
            self.calls.lock().push(args.to_vec());
            Ok(self.reply.clone())
        }
    }

    fn stub_channel(reply: &str) -> (UsbControlChannel, Arc<Mutex<Vec<Vec<String>>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let channel = UsbControlChannel::with_runner(Box::new(StubRunner {
            reply: reply.to_string(),
            calls: Arc::clone(&calls),
        }));
        (channel, calls)
    }

    #[test]
    fn test_send_then_take_decodes_hex() {
        let (mut channel, _) = stub_channel("4f4b");
        channel.send_request(&UsbRequest::default()).unwrap();
        assert_eq!(channel.take_reply().unwrap(), b"OK");
    }

    #[test]
    fn test_default_request_args() {
        let (mut channel, calls) = stub_channel("");
        channel.send_request(&UsbRequest::default()).unwrap();
        assert_eq!(
            calls.lock()[0],
            vec!["-r", "80", "-v", "0", "-i", "60", "-x", ""]
        );
    }

    #[test]
    fn test_host_to_device_args_and_payload_encoding() {
        let (mut channel, calls) = stub_channel("");
        channel
            .send_request(&UsbRequest {
                index: 7,
                direction: Direction::HostToDevice,
                payload: b"\x01\xff".to_vec(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            calls.lock()[0],
            vec!["-r", "80", "-v", "0", "-i", "7", "-d", "out", "-x", "01ff"]
        );
    }

    #[test]
    fn test_take_before_send_fails() {
        let (channel, _) = stub_channel("");
        assert!(matches!(channel.take_reply(), Err(UsbError::NoReply)));
    }

    #[test]
    fn test_empty_reply_is_distinct_from_no_reply() {
        let (mut channel, _) = stub_channel("");
        channel.send_request(&UsbRequest::default()).unwrap();
        assert_eq!(channel.take_reply().unwrap(), b"");
    }

    #[test]
    fn test_new_request_overwrites_reply() {
        let (mut channel, _) = stub_channel("01");
        channel.send_request(&UsbRequest::default()).unwrap();
        channel.send_request(&UsbRequest::with_index(61)).unwrap();
        assert_eq!(channel.take_reply().unwrap(), &[0x01]);
    }

    #[test]
    fn test_reset_clears_reply() {
        let (mut channel, _) = stub_channel("01");
        channel.send_request(&UsbRequest::default()).unwrap();
        channel.reset();
        assert!(matches!(channel.take_reply(), Err(UsbError::NoReply)));
    }

    #[test]
    fn test_invalid_hex_reply() {
        let (mut channel, _) = stub_channel("zz");
        let err = channel.send_request(&UsbRequest::default()).unwrap_err();
        assert!(matches!(err, UsbError::Hex(_)));
    }
}
