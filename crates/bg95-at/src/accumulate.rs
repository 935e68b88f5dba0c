//! Response accumulation: drive a transport's timed read until a response
//! terminates, the deadline passes or the buffer fills.
//!
//! ```text
//!            read/append           has_terminated
//! Awaiting ──────────────► Awaiting ─────────────► Terminated
//!     │                        │
//!     │ deadline elapsed       │ append would exceed capacity
//!     ▼                        ▼
//!  TimedOut                 Overflow
//! ```
//!
//! All three end states are terminal for one round-trip; the accumulator
//! never retries. Call [`ResponseAccumulator::reset`] before the next
//! command.

use std::time::{Duration, Instant};

use bytes::BytesMut;
use log::{debug, trace, warn};

use crate::codec::escape_for_log;
use crate::commands::{CommandDescriptor, CommandKind};
use crate::error::{AtError, AtResult};
use crate::termination::has_terminated;

/// Default capacity of the raw response buffer.
pub const DEFAULT_RESPONSE_CAPACITY: usize = 1024;

/// Default length of one timed read.
pub const DEFAULT_READ_SLICE: Duration = Duration::from_millis(50);

/// Bytes requested per read.
const READ_CHUNK: usize = 256;

/// Byte-oriented link to the modem.
pub trait Transport {
    /// Write all bytes.
    fn write(&mut self, data: &[u8]) -> AtResult<()>;

    /// Read up to `buf.len()` bytes, waiting at most `timeout`.
    ///
    /// Returns `Ok(0)` when the timeout elapsed with no data.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> AtResult<usize>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, data: &[u8]) -> AtResult<()> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> AtResult<usize> {
        (**self).read(buf, timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> AtResult<()> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> AtResult<usize> {
        (**self).read(buf, timeout)
    }
}

/// State of one accumulation round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccumulatorState {
    /// Reading; the response is not complete yet.
    #[default]
    Awaiting,
    /// A complete response is in the buffer.
    Terminated,
    /// The deadline passed first.
    TimedOut,
    /// The response did not fit the buffer.
    Overflow,
}

impl AccumulatorState {
    /// Check whether the round-trip has ended.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AccumulatorState::Awaiting)
    }
}

/// Bounded raw response buffer plus the read loop that fills it.
#[derive(Debug)]
pub struct ResponseAccumulator {
    /// Bytes received so far.
    buffer: BytesMut,
    /// Maximum number of bytes accepted.
    capacity: usize,
    /// Current state.
    state: AccumulatorState,
    /// Timeout passed to each transport read.
    read_slice: Duration,
}

impl Default for ResponseAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_RESPONSE_CAPACITY)
    }
}

impl ResponseAccumulator {
    /// Create an accumulator holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        ResponseAccumulator {
            buffer: BytesMut::with_capacity(capacity),
            capacity,
            state: AccumulatorState::Awaiting,
            read_slice: DEFAULT_READ_SLICE,
        }
    }

    /// Set the timeout of each individual read.
    pub fn with_read_slice(mut self, read_slice: Duration) -> Self {
        self.read_slice = read_slice;
        self
    }

    /// Maximum number of bytes accepted.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current state.
    pub fn state(&self) -> AccumulatorState {
        self.state
    }

    /// Bytes accumulated so far, including a partial response after a
    /// timeout.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Get the buffer contents as a string (for debugging).
    pub fn buffer_as_str(&self) -> String {
        String::from_utf8_lossy(&self.buffer).to_string()
    }

    /// Empty the buffer and return to [`AccumulatorState::Awaiting`].
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = AccumulatorState::Awaiting;
    }

    /// Append received bytes, failing if they would exceed capacity.
    ///
    /// On overflow nothing is appended and the state becomes
    /// [`AccumulatorState::Overflow`].
    pub fn push(&mut self, data: &[u8]) -> AtResult<()> {
        let needed = self.buffer.len() + data.len();
        if needed > self.capacity {
            warn!(
                "response overflow: {} bytes buffered, {} more received, capacity {}",
                self.buffer.len(),
                data.len(),
                self.capacity
            );
            self.state = AccumulatorState::Overflow;
            return Err(AtError::InvalidSize {
                capacity: self.capacity,
                needed,
            });
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Accumulate the response to `kind` of `descriptor`.
    ///
    /// The deadline is the operation's configured timeout. Returns the
    /// complete raw response.
    pub fn run<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        descriptor: &CommandDescriptor,
        kind: CommandKind,
    ) -> AtResult<&[u8]> {
        let timeout = descriptor.timeout(kind).ok_or(AtError::NotSupported {
            command: descriptor.name,
            kind,
        })?;

        self.run_until(transport, timeout, |raw| has_terminated(raw, descriptor, kind))
    }

    /// Accumulate until `complete` accepts the buffer or `timeout` elapses.
    pub fn run_until<T, F>(
        &mut self,
        transport: &mut T,
        timeout: Duration,
        complete: F,
    ) -> AtResult<&[u8]>
    where
        T: Transport + ?Sized,
        F: Fn(&[u8]) -> bool,
    {
        if self.state.is_terminal() {
            return Err(AtError::InvalidState(format!(
                "accumulator already finished ({:?})",
                self.state
            )));
        }

        let start = Instant::now();
        let deadline = start + timeout;
        let mut chunk = [0u8; READ_CHUNK];

        // Bytes pushed before the loop may already complete the response
        if !self.buffer.is_empty() && complete(&self.buffer) {
            self.state = AccumulatorState::Terminated;
            return Ok(&self.buffer[..]);
        }

        loop {
            let now = Instant::now();
            if now >= deadline {
                self.state = AccumulatorState::TimedOut;
                debug!(
                    "response timed out after {:?}: {}",
                    timeout,
                    escape_for_log(&self.buffer)
                );
                return Err(AtError::Timeout {
                    waited: now - start,
                    received: self.buffer.len(),
                });
            }

            let slice = self.read_slice.min(deadline - now);
            let n = transport.read(&mut chunk, slice)?;
            if n == 0 {
                continue;
            }

            trace!("rx {} bytes: {}", n, escape_for_log(&chunk[..n]));
            self.push(&chunk[..n])?;

            if complete(&self.buffer) {
                self.state = AccumulatorState::Terminated;
                debug!(
                    "response complete after {:?} ({} bytes)",
                    start.elapsed(),
                    self.buffer.len()
                );
                return Ok(&self.buffer[..]);
            }
        }
    }
}
