//! Hardware-in-the-loop acceptance harness library.
//!
//! This library drives a physical device over serial and USB transports,
//! feeds it commands, and lets test scenarios block until the device's
//! output satisfies a predicate. The synchronization core is race-free:
//! incoming bytes are appended by a single background delivery thread while
//! assertions block on a condition variable, so a matching chunk can never
//! slip past a waiter.
//!
//! # Modules
//!
//! - `buffer`: thread-safe accumulation with blocking predicate waits
//! - `cmd`: external command execution (build/flash, USB transfer tool)
//! - `config`: channel catalog and harness configuration (TOML + env)
//! - `error`: unified error handling
//! - `matcher`: the five output comparison operators
//! - `reactor`: the delivery loop servicing every open channel
//! - `registry`: channel lifecycle and naming
//! - `transport`: serial/mock transport abstraction
//! - `usb`: synchronous USB control request/reply channel
//!
//! # Example
//!
//! ```no_run
//! use hil_harness::{ChannelRegistry, EventLoop, HarnessConfig, Matcher, SerialParams};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let event_loop = EventLoop::new()?;
//! let mut registry = ChannelRegistry::new(HarnessConfig::default(), event_loop);
//! registry.open("Serial", &SerialParams::default())?;
//! registry.write("Serial", "version\n")?;
//!
//! let matcher = Matcher::parse("contain", "v1.2")?;
//! registry.check_data("Serial", Duration::from_secs(3), |d| matcher.check(d))?;
//! registry.close_all()?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod cmd;
pub mod config;
pub mod error;
pub mod matcher;
pub mod reactor;
pub mod registry;
pub mod transport;
pub mod usb;

// Re-export commonly used types for convenience
pub use buffer::{ConditionBuffer, WaitError};
pub use cmd::{build_application, CommandError};
pub use config::{ConfigError, ConfigResult, HarnessConfig};
pub use error::{HarnessError, HarnessResult};
pub use matcher::{Check, MatchFailure, MatchOp, Matcher, MatcherError};
pub use reactor::{EventLoop, SubscriptionId};
pub use registry::{ChannelError, ChannelRegistry, ChannelResult, DEFAULT_CHECK_TIMEOUT};
pub use transport::{
    ChannelTransport, DataBits, MockTransport, SerialParams, SerialTransport, TransportError,
};
pub use usb::{
    CliTransfer, Direction, TransferRunner, UsbControlChannel, UsbError, UsbRequest,
    DEFAULT_REQUEST, DEFAULT_REQUEST_INDEX, DEFAULT_REQUEST_VALUE,
};

/// Initialize tracing for harness executables and tests.
///
/// Respects `RUST_LOG`; defaults to `info`. Safe to call more than once.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
