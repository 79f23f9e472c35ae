//! Race-free accumulation of asynchronously arriving device output.
//!
//! A [`ConditionBuffer`] sits between one producer (the delivery loop thread
//! appending bytes as they arrive) and consumers that block until a predicate
//! holds over the accumulated data or a timeout expires. All access goes
//! through one mutex; wakeups are broadcast while the lock is held, so a
//! consumer that re-acquires the lock always judges the predicate against the
//! latest appended state and no wakeup can be lost.

use crate::matcher::{Check, MatchFailure};
use parking_lot::{Condvar, Mutex};
use std::borrow::Cow;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Why a [`ConditionBuffer::wait_until`] call failed.
#[derive(Debug, Error)]
pub enum WaitError {
    /// The predicate never held and never produced comparison detail.
    #[error("output does not match expected data (no match within {0:?})")]
    TimedOut(Duration),

    /// The predicate never held; this is the most recent comparison failure.
    #[error(transparent)]
    Mismatch(MatchFailure),
}

/// Thread-safe append-only accumulator with blocking predicate waits.
///
/// One instance exists per communication channel. The delivery loop appends;
/// assertion code waits. The buffer never shrinks except on [`reset`].
///
/// [`reset`]: ConditionBuffer::reset
#[derive(Debug, Default)]
pub struct ConditionBuffer {
    data: Mutex<Vec<u8>>,
    arrived: Condvar,
}

impl ConditionBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of newly arrived bytes and wake all waiters.
    ///
    /// Callable from the delivery context; the broadcast happens under the
    /// lock so a consumer can never miss the state that woke it.
    pub fn append(&self, chunk: &[u8]) {
        let mut data = self.data.lock();
        data.extend_from_slice(chunk);
        self.arrived.notify_all();
    }

    /// Block until `predicate` holds over the normalized accumulated data,
    /// or `timeout` elapses.
    ///
    /// The predicate is re-evaluated under the lock after every wakeup, and
    /// once more after the deadline passes, so success is always judged
    /// against the final buffer state that satisfied it. A
    /// [`Check::Mismatch`] returned by the predicate is remembered and
    /// retried; if the wait ultimately fails, the most recent mismatch is
    /// reported, falling back to a generic timeout error when the predicate
    /// only ever returned [`Check::NoMatch`].
    pub fn wait_until<F>(&self, timeout: Duration, mut predicate: F) -> Result<(), WaitError>
    where
        F: FnMut(&str) -> Check,
    {
        let deadline = Instant::now() + timeout;
        let mut data = self.data.lock();
        let mut last_failure: Option<MatchFailure> = None;

        loop {
            match predicate(&normalize(&data)) {
                Check::Match => return Ok(()),
                Check::Mismatch(failure) => last_failure = Some(failure),
                Check::NoMatch => {}
            }
            if Instant::now() >= deadline {
                break;
            }
            // Spurious wakeups are fine: the loop re-checks the predicate.
            let _ = self.arrived.wait_until(&mut data, deadline);
        }

        Err(match last_failure {
            Some(failure) => WaitError::Mismatch(failure),
            None => WaitError::TimedOut(timeout),
        })
    }

    /// Clear the accumulated data. Does not affect waiters' registration or
    /// the owning channel's open state.
    pub fn reset(&self) {
        self.data.lock().clear();
    }

    /// A normalized copy of the current contents, for diagnostics.
    pub fn snapshot(&self) -> String {
        normalize(&self.data.lock()).into_owned()
    }

    /// Whether any bytes have accumulated since creation or the last reset.
    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }
}

/// Normalize accumulated bytes for predicate evaluation.
///
/// ASCII text gets CRLF converted to LF and trailing whitespace stripped.
/// Valid non-ASCII UTF-8 is treated as opaque and passed through unmodified;
/// invalid UTF-8 is surfaced lossily, also without normalization.
fn normalize(data: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(data) {
        Ok(text) if text.is_ascii() => Cow::Owned(text.replace("\r\n", "\n").trim_end().into()),
        Ok(text) => Cow::Borrowed(text),
        Err(_) => String::from_utf8_lossy(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{MatchOp, Matcher};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_immediate_match() {
        let buffer = ConditionBuffer::new();
        buffer.append(b"ready");
        buffer
            .wait_until(Duration::from_secs(1), |d| (d == "ready").into())
            .unwrap();
    }

    #[test]
    fn test_wakes_on_append_from_another_thread() {
        let buffer = Arc::new(ConditionBuffer::new());
        let producer = Arc::clone(&buffer);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            producer.append(b"foo");
            thread::sleep(Duration::from_millis(30));
            producer.append(b"bar");
        });

        let started = Instant::now();
        buffer
            .wait_until(Duration::from_secs(3), |d| d.contains("bar").into())
            .unwrap();
        assert!(
            started.elapsed() < Duration::from_secs(1),
            "should wake well before the timeout"
        );
        handle.join().unwrap();
    }

    #[test]
    fn test_timeout_without_detail() {
        let buffer = ConditionBuffer::new();
        buffer.append(b"foo");

        let timeout = Duration::from_millis(200);
        let started = Instant::now();
        let err = buffer
            .wait_until(timeout, |d| d.contains("baz").into())
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, WaitError::TimedOut(t) if t == timeout));
        assert!(elapsed >= timeout, "returned before the deadline");
        assert!(
            elapsed < timeout + Duration::from_millis(400),
            "blocked far past the deadline: {:?}",
            elapsed
        );
    }

    #[test]
    fn test_last_mismatch_reflects_final_state() {
        let buffer = Arc::new(ConditionBuffer::new());
        let producer = Arc::clone(&buffer);
        let handle = thread::spawn(move || {
            producer.append(b"x");
            thread::sleep(Duration::from_millis(50));
            producer.append(b"y");
        });

        let matcher = Matcher::new(MatchOp::Be, "zzz").unwrap();
        let err = buffer
            .wait_until(Duration::from_millis(250), |d| matcher.check(d))
            .unwrap_err();
        handle.join().unwrap();

        match err {
            WaitError::Mismatch(failure) => {
                assert_eq!(failure.observed, "xy");
                assert_eq!(failure.expected, "zzz");
                assert_eq!(failure.op, MatchOp::Be);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_match_seen_after_earlier_mismatches() {
        let buffer = Arc::new(ConditionBuffer::new());
        let producer = Arc::clone(&buffer);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(40));
            producer.append(b"a");
            thread::sleep(Duration::from_millis(40));
            producer.append(b"b");
        });

        let matcher = Matcher::new(MatchOp::Be, "ab").unwrap();
        buffer
            .wait_until(Duration::from_secs(2), |d| matcher.check(d))
            .unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_crlf_normalization_and_trailing_strip() {
        let buffer = ConditionBuffer::new();
        buffer.append(b"foo\r\nbar\r\n");
        buffer
            .wait_until(Duration::from_millis(100), |d| (d == "foo\nbar").into())
            .unwrap();
    }

    #[test]
    fn test_non_ascii_text_is_not_normalized() {
        let buffer = ConditionBuffer::new();
        buffer.append("héllo\r\n".as_bytes());
        buffer
            .wait_until(Duration::from_millis(100), |d| (d == "héllo\r\n").into())
            .unwrap();
    }

    #[test]
    fn test_invalid_utf8_is_opaque() {
        let buffer = ConditionBuffer::new();
        buffer.append(&[0xff, 0xfe, b'o', b'k']);
        buffer
            .wait_until(Duration::from_millis(100), |d| d.ends_with("ok").into())
            .unwrap();
    }

    #[test]
    fn test_reset_clears_data() {
        let buffer = ConditionBuffer::new();
        buffer.append(b"stale");
        assert!(!buffer.is_empty());
        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.snapshot(), "");
    }

    #[test]
    fn test_many_appends_preserve_order() {
        let buffer = Arc::new(ConditionBuffer::new());
        let producer = Arc::clone(&buffer);
        let handle = thread::spawn(move || {
            for i in 0..100u32 {
                producer.append(format!("{:03};", i).as_bytes());
            }
        });

        buffer
            .wait_until(Duration::from_secs(3), |d| d.ends_with("099;").into())
            .unwrap();
        handle.join().unwrap();

        let expected: String = (0..100).map(|i| format!("{:03};", i)).collect();
        assert_eq!(buffer.snapshot(), expected.trim_end());
    }
}
