//! The delivery loop: one background thread servicing every open channel.
//!
//! The [`EventLoop`] is an explicitly constructed, explicitly owned object
//! rather than process-wide global state. The registry owns it, registers a
//! transport read handle per open channel, and deregisters on close;
//! dropping the loop shuts the thread down and joins it.
//!
//! The loop polls each registered reader in turn. Bytes are appended to the
//! channel's [`ConditionBuffer`] in arrival order, so a waiting consumer that
//! wakes always observes every append ordered before its wakeup.

use crate::buffer::ConditionBuffer;
use crate::transport::ChannelTransport;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Identifies one reader registration with the delivery loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Read buffer size per poll. Serial traffic in this harness is line-ish
/// text; 512 bytes per poll keeps latency low without churn.
const READ_CHUNK: usize = 512;

/// Back-off applied when a poll pass over all readers produced no bytes and
/// none of the reads blocked (mock transports return immediately).
const IDLE_BACKOFF: Duration = Duration::from_millis(2);

enum Command {
    Register {
        id: SubscriptionId,
        reader: Box<dyn ChannelTransport>,
        buffer: Arc<ConditionBuffer>,
    },
    Deregister(SubscriptionId),
    Shutdown,
}

struct Subscription {
    id: SubscriptionId,
    reader: Box<dyn ChannelTransport>,
    buffer: Arc<ConditionBuffer>,
}

/// Owns the background delivery thread shared by all channels.
pub struct EventLoop {
    tx: mpsc::Sender<Command>,
    next_id: AtomicU64,
    thread: Option<thread::JoinHandle<()>>,
}

impl EventLoop {
    /// Spawn the delivery thread.
    pub fn new() -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("hil-delivery".into())
            .spawn(move || run_loop(rx))?;

        Ok(Self {
            tx,
            next_id: AtomicU64::new(0),
            thread: Some(thread),
        })
    }

    /// Wire a transport read handle to a channel's buffer.
    ///
    /// From this point until [`deregister`](Self::deregister), bytes read
    /// from `reader` are appended to `buffer` from the delivery thread.
    pub fn register(
        &self,
        reader: Box<dyn ChannelTransport>,
        buffer: Arc<ConditionBuffer>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(?id, endpoint = reader.name(), "registering delivery subscription");
        if self
            .tx
            .send(Command::Register { id, reader, buffer })
            .is_err()
        {
            warn!(?id, "delivery thread is gone; registration dropped");
        }
        id
    }

    /// Stop delivering into the buffer registered under `id`.
    ///
    /// The buffer itself is shared via `Arc`, so an append already in flight
    /// on the delivery thread lands harmlessly in the detached buffer.
    pub fn deregister(&self, id: SubscriptionId) {
        debug!(?id, "deregistering delivery subscription");
        let _ = self.tx.send(Command::Deregister(id));
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("next_id", &self.next_id)
            .finish()
    }
}

fn run_loop(rx: Receiver<Command>) {
    let mut subs: Vec<Subscription> = Vec::new();
    let mut scratch = [0u8; READ_CHUNK];

    loop {
        // With no readers registered there is nothing to poll; block on the
        // control channel instead of spinning.
        if subs.is_empty() {
            match rx.recv() {
                Ok(command) => {
                    if handle(command, &mut subs) {
                        return;
                    }
                    continue;
                }
                Err(_) => return,
            }
        }

        loop {
            match rx.try_recv() {
                Ok(command) => {
                    if handle(command, &mut subs) {
                        return;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return,
            }
        }

        let mut delivered = false;
        subs.retain_mut(|sub| match sub.reader.read_chunk(&mut scratch) {
            Ok(0) => true,
            Ok(n) => {
                sub.buffer.append(&scratch[..n]);
                delivered = true;
                true
            }
            Err(err) => {
                warn!(
                    endpoint = sub.reader.name(),
                    %err,
                    "delivery read failed; dropping subscription"
                );
                false
            }
        });

        if !delivered {
            thread::sleep(IDLE_BACKOFF);
        }
    }
}

/// Apply one control command; returns true on shutdown.
fn handle(command: Command, subs: &mut Vec<Subscription>) -> bool {
    match command {
        Command::Register { id, reader, buffer } => {
            subs.push(Subscription { id, reader, buffer });
            false
        }
        Command::Deregister(id) => {
            subs.retain(|sub| sub.id != id);
            false
        }
        Command::Shutdown => true,
    }
}
