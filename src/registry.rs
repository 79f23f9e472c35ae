//! Channel lifecycle and naming.
//!
//! The [`ChannelRegistry`] owns the configured channel catalog, the injected
//! delivery [`EventLoop`], and every open channel. A channel name maps to at
//! most one open channel at any time; open-after-close is always allowed.

use crate::buffer::{ConditionBuffer, WaitError};
use crate::config::{ConfigError, HarnessConfig};
use crate::matcher::{Check, MatchFailure};
use crate::reactor::{EventLoop, SubscriptionId};
use crate::transport::{ChannelTransport, SerialParams, SerialTransport, TransportError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Attempted to open a channel that is already open.
    #[error("Channel is already open: {0}")]
    AlreadyOpen(String),

    /// The channel name is not part of the configured catalog.
    #[error("Unknown channel: {0}")]
    Unknown(String),

    /// Operation requires the channel to be open, but it is not.
    #[error("Channel is not open: {0}")]
    NotOpen(String),

    /// The predicate never held and never produced comparison detail.
    #[error("{channel} output does not match expected data (no match within {timeout:?})")]
    NoMatch { channel: String, timeout: Duration },

    /// The predicate never held; this wraps its most recent comparison
    /// failure, which is far more actionable than a bare timeout.
    #[error("{channel}: {failure}")]
    Mismatch {
        channel: String,
        #[source]
        failure: MatchFailure,
    },

    /// Channel configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The underlying transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Default timeout for [`ChannelRegistry::check_data`] callers that do not
/// have a step-specified one.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

struct OpenChannel {
    writer: Box<dyn ChannelTransport>,
    buffer: Arc<ConditionBuffer>,
    subscription: SubscriptionId,
}

/// Manages named communication channels backed by [`ConditionBuffer`]s.
///
/// The registry owns the delivery loop, which guarantees the teardown order
/// the concurrency model requires: dropping the registry closes every channel
/// (stopping its delivery subscription) before the loop thread itself is shut
/// down, so no callback can write into a destroyed channel.
pub struct ChannelRegistry {
    config: HarnessConfig,
    event_loop: EventLoop,
    channels: HashMap<String, OpenChannel>,
}

impl ChannelRegistry {
    /// Create a registry over a channel catalog and an injected delivery loop.
    pub fn new(config: HarnessConfig, event_loop: EventLoop) -> Self {
        Self {
            config,
            event_loop,
            channels: HashMap::new(),
        }
    }

    /// Open a cataloged channel.
    ///
    /// The device path is resolved from the channel's environment variable at
    /// this point, then a serial transport is opened and wired to a fresh
    /// buffer on the delivery loop.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::AlreadyOpen`] if the channel is open
    /// - [`ChannelError::Unknown`] if the name is not in the catalog
    /// - [`ChannelError::Config`] if the device environment variable is unset
    /// - [`ChannelError::Transport`] if the device cannot be opened
    pub fn open(&mut self, name: &str, params: &SerialParams) -> ChannelResult<()> {
        if self.channels.contains_key(name) {
            return Err(ChannelError::AlreadyOpen(name.to_string()));
        }
        let env_var = self
            .config
            .channel_env(name)
            .ok_or_else(|| ChannelError::Unknown(name.to_string()))?
            .to_string();
        let device = self.config.resolve_device(name, &env_var)?;
        let transport = SerialTransport::open(&device, params)?;
        self.attach(name, Box::new(transport))
    }

    /// Open a channel over an explicitly supplied transport.
    ///
    /// This is the injection seam used by tests (mock transports) and by
    /// callers with endpoints the catalog does not describe; it performs the
    /// same lifecycle bookkeeping as [`open`](Self::open) without device
    /// resolution.
    pub fn open_with_transport(
        &mut self,
        name: &str,
        transport: Box<dyn ChannelTransport>,
    ) -> ChannelResult<()> {
        if self.channels.contains_key(name) {
            return Err(ChannelError::AlreadyOpen(name.to_string()));
        }
        self.attach(name, transport)
    }

    fn attach(&mut self, name: &str, transport: Box<dyn ChannelTransport>) -> ChannelResult<()> {
        let buffer = Arc::new(ConditionBuffer::new());
        let reader = transport.try_clone()?;
        let subscription = self.event_loop.register(reader, Arc::clone(&buffer));
        debug!(channel = name, endpoint = transport.name(), "channel opened");
        self.channels.insert(
            name.to_string(),
            OpenChannel {
                writer: transport,
                buffer,
                subscription,
            },
        );
        Ok(())
    }

    /// Close an open channel, removing it from the registry.
    pub fn close(&mut self, name: &str) -> ChannelResult<()> {
        let mut channel = self
            .channels
            .remove(name)
            .ok_or_else(|| ChannelError::NotOpen(name.to_string()))?;
        self.event_loop.deregister(channel.subscription);
        debug!(channel = name, "channel closed");
        channel.writer.flush()?;
        Ok(())
    }

    /// Close every open channel, best-effort.
    ///
    /// Every channel is closed regardless of individual failures; each
    /// failure is logged, and the first one is returned after all closes have
    /// been attempted.
    pub fn close_all(&mut self) -> ChannelResult<()> {
        let names: Vec<String> = self.channels.keys().cloned().collect();
        let mut first_error = None;
        for name in names {
            if let Err(err) = self.close(&name) {
                warn!(channel = %name, %err, "close failed during close_all");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Write text to an open channel.
    ///
    /// ASCII payloads get LF translated to CRLF on the way out, matching the
    /// device's line discipline; anything else is forwarded untouched.
    pub fn write(&mut self, name: &str, data: &str) -> ChannelResult<()> {
        let channel = self.channel_mut(name)?;
        if data.is_ascii() {
            channel
                .writer
                .write_all(data.replace('\n', "\r\n").as_bytes())?;
        } else {
            channel.writer.write_all(data.as_bytes())?;
        }
        Ok(())
    }

    /// Write raw bytes to an open channel, with no translation.
    pub fn write_raw(&mut self, name: &str, data: &[u8]) -> ChannelResult<()> {
        self.channel_mut(name)?.writer.write_all(data)?;
        Ok(())
    }

    /// Block until `predicate` holds over the channel's accumulated output,
    /// or `timeout` elapses.
    ///
    /// Failures come back with the channel name attached: either
    /// [`ChannelError::Mismatch`] wrapping the predicate's most recent
    /// comparison failure, or [`ChannelError::NoMatch`] when the predicate
    /// only ever reported a plain non-match.
    pub fn check_data<F>(&self, name: &str, timeout: Duration, predicate: F) -> ChannelResult<()>
    where
        F: FnMut(&str) -> Check,
    {
        let channel = self.channel(name)?;
        channel
            .buffer
            .wait_until(timeout, predicate)
            .map_err(|err| match err {
                WaitError::TimedOut(timeout) => ChannelError::NoMatch {
                    channel: name.to_string(),
                    timeout,
                },
                WaitError::Mismatch(failure) => ChannelError::Mismatch {
                    channel: name.to_string(),
                    failure,
                },
            })
    }

    /// Clear a channel's accumulated output without closing it.
    pub fn reset(&self, name: &str) -> ChannelResult<()> {
        self.channel(name)?.buffer.reset();
        Ok(())
    }

    /// Whether a channel is currently open.
    pub fn is_open(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Names of all currently open channels.
    pub fn open_channels(&self) -> Vec<&str> {
        self.channels.keys().map(String::as_str).collect()
    }

    fn channel(&self, name: &str) -> ChannelResult<&OpenChannel> {
        self.channels
            .get(name)
            .ok_or_else(|| ChannelError::NotOpen(name.to_string()))
    }

    fn channel_mut(&mut self, name: &str) -> ChannelResult<&mut OpenChannel> {
        self.channels
            .get_mut(name)
            .ok_or_else(|| ChannelError::NotOpen(name.to_string()))
    }
}

impl Drop for ChannelRegistry {
    fn drop(&mut self) {
        // Stop deliveries before the event loop itself goes down; errors are
        // already logged by close_all.
        let _ = self.close_all();
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("open_channels", &self.open_channels())
            .finish()
    }
}
