//! Mock transport implementation for testing.
//!
//! Provides a `MockTransport` that simulates a device endpoint without
//! requiring actual hardware. A test pushes bytes into the mock to play the
//! role of the device, and inspects the write log to verify outbound data.

use super::error::TransportError;
use super::traits::ChannelTransport;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Inner state of the mock transport, protected by a mutex so that cloned
/// handles (the delivery loop's read handle and the registry's write handle)
/// observe the same endpoint.
#[derive(Debug, Default)]
struct MockState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all byte blocks written to the transport.
    write_log: Vec<Vec<u8>>,
    /// When set, the next read fails with this message.
    fail_next_read: Option<String>,
    /// When set, every flush fails with this message.
    fail_flush: Option<String>,
}

/// Mock transport for testing.
///
/// This implementation allows you to:
/// - Push bytes that subsequent reads will deliver (simulating device output)
/// - Inspect what data was written
/// - Inject read and flush failures
///
/// # Example
/// ```
/// use hil_harness::transport::{ChannelTransport, MockTransport};
///
/// let mut device = MockTransport::new("MOCK0");
///
/// // Simulate the device emitting some bytes
/// device.push(b"OK\r\n");
///
/// let mut buffer = [0u8; 16];
/// let n = device.read_chunk(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"OK\r\n");
///
/// // Verify what was written
/// device.write_all(b"AT\r\n").unwrap();
/// assert_eq!(device.write_log(), vec![b"AT\r\n".to_vec()]);
/// ```
#[derive(Clone)]
pub struct MockTransport {
    /// The endpoint name/identifier.
    name: String,
    /// Shared state, so clones address the same simulated device.
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a new mock transport with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Push bytes that subsequent read operations will deliver.
    ///
    /// This is the test's stand-in for the device sending data.
    pub fn push(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Get a copy of all byte blocks written to the transport.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Clear the write log.
    pub fn clear_write_log(&self) {
        self.state.lock().write_log.clear();
    }

    /// Make the next read fail with the given message.
    pub fn fail_next_read(&self, message: impl Into<String>) {
        self.state.lock().fail_next_read = Some(message.into());
    }

    /// Make every flush fail with the given message.
    pub fn fail_flush(&self, message: impl Into<String>) {
        self.state.lock().fail_flush = Some(message.into());
    }

    /// Number of pushed bytes not yet consumed by reads.
    pub fn pending_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }
}

impl ChannelTransport for MockTransport {
    fn read_chunk(&mut self, buffer: &mut [u8]) -> Result<usize, TransportError> {
        let mut state = self.state.lock();

        if let Some(message) = state.fail_next_read.take() {
            return Err(TransportError::config(message));
        }

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        Ok(bytes_read)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.state.lock().write_log.push(data.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        let state = self.state.lock();
        match &state.fail_flush {
            Some(message) => Err(TransportError::config(message.clone())),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn try_clone(&self) -> Result<Box<dyn ChannelTransport>, TransportError> {
        Ok(Box::new(self.clone()))
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("name", &self.name)
            .field("pending_bytes", &self.pending_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_read() {
        let mut transport = MockTransport::new("MOCK0");
        transport.push(b"Hello");

        let mut buffer = [0u8; 10];
        let n = transport.read_chunk(&mut buffer).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buffer[..n], b"Hello");
    }

    #[test]
    fn test_empty_read_is_zero() {
        let mut transport = MockTransport::new("MOCK0");
        let mut buffer = [0u8; 10];
        assert_eq!(transport.read_chunk(&mut buffer).unwrap(), 0);
    }

    #[test]
    fn test_partial_read() {
        let mut transport = MockTransport::new("MOCK0");
        transport.push(b"Hello, World!");

        let mut buffer = [0u8; 5];
        let n = transport.read_chunk(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"Hello");
        assert_eq!(transport.pending_bytes(), 8);
    }

    #[test]
    fn test_write_logging() {
        let mut transport = MockTransport::new("MOCK0");
        transport.write_all(b"Test1").unwrap();
        transport.write_all(b"Test2").unwrap();

        let log = transport.write_log();
        assert_eq!(log, vec![b"Test1".to_vec(), b"Test2".to_vec()]);
    }

    #[test]
    fn test_clones_share_state() {
        let transport = MockTransport::new("MOCK0");
        let mut reader = transport.try_clone().unwrap();

        transport.push(b"shared");
        let mut buffer = [0u8; 16];
        let n = reader.read_chunk(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"shared");
    }

    #[test]
    fn test_injected_read_failure() {
        let mut transport = MockTransport::new("MOCK0");
        transport.fail_next_read("device unplugged");

        let mut buffer = [0u8; 10];
        let result = transport.read_chunk(&mut buffer);
        assert!(matches!(result, Err(TransportError::Config(_))));

        // Failure is one-shot; subsequent reads work again.
        assert_eq!(transport.read_chunk(&mut buffer).unwrap(), 0);
    }

    #[test]
    fn test_injected_flush_failure() {
        let mut transport = MockTransport::new("MOCK0");
        transport.fail_flush("flush rejected");
        assert!(transport.flush().is_err());
    }
}
