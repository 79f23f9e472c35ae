//! Shared test utilities for harness integration tests.
//!
//! Provides a registry wired to mock transports so scenarios can run without
//! hardware: the test pushes bytes into the mock to play the device's role,
//! and the delivery loop carries them into the channel buffers exactly as it
//! would for a real serial port.

#![allow(dead_code)]

use hil_harness::{ChannelRegistry, EventLoop, HarnessConfig, MockTransport};

/// A registry over a fresh delivery loop with the stock channel catalog.
pub fn test_registry() -> ChannelRegistry {
    hil_harness::init_tracing();
    let event_loop = EventLoop::new().expect("spawn delivery loop");
    ChannelRegistry::new(HarnessConfig::default(), event_loop)
}

/// Open `name` backed by a mock device and return the device handle.
pub fn open_mock_channel(registry: &mut ChannelRegistry, name: &str) -> MockTransport {
    let device = MockTransport::new(format!("{}-mock", name));
    registry
        .open_with_transport(name, Box::new(device.clone()))
        .expect("open mock channel");
    device
}
