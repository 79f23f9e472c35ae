//! Transport abstraction layer for device communication.
//!
//! Provides traits and implementations for the byte-stream endpoints a
//! channel can be backed by, enabling dependency injection and testing via
//! mocks.

pub mod error;
pub mod mock;
pub mod serial;
pub mod traits;

pub use error::TransportError;
pub use mock::MockTransport;
pub use serial::SerialTransport;
pub use traits::{ChannelTransport, DataBits, SerialParams};
