//! Process-global stream state for the command loop (§4.3, §5).
//!
//! Stdin, stdout, stderr, cwd, and env are process-wide on the native side
//! and are read without any lock: the command loop is single-threaded, so
//! there is nothing to guard against.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
use unix as platform;
#[cfg(windows)]
use windows as platform;

use std::collections::VecDeque;
use std::io::Write;

/// Outcome of one non-blocking attempt to read from the native input
/// stream (§4.3 "Non-blocking input read").
#[derive(Debug)]
pub enum ReadOutcome {
    Data(Vec<u8>),
    WouldBlock,
    Eof,
}

/// A writable stream (stdout or stderr) with idempotent-to-the-caller
/// close tracking: the first close succeeds, the second is an error with
/// a nonempty message (§4.2, §4.3, §8 scenario 6), mirrored here for the
/// output side for symmetry even though the literal scenario in the spec
/// exercises CLOSE_INPUT.
pub struct ClosableWriter<W: Write> {
    inner: W,
    closed: bool,
    label: &'static str,
}

impl<W: Write> ClosableWriter<W> {
    pub fn new(inner: W, label: &'static str) -> Self {
        Self {
            inner,
            closed: false,
            label,
        }
    }

    pub fn write_all(&mut self, buf: &[u8]) -> Result<(), String> {
        if self.closed {
            return Err(format!("{} stream is closed", self.label));
        }
        self.inner
            .write_all(buf)
            .and_then(|_| self.inner.flush())
            .map_err(|e| format!("{} write failed: {e}", self.label))
    }

    pub fn close(&mut self) -> Result<(), String> {
        if self.closed {
            return Err(format!("{} stream already closed", self.label));
        }
        self.closed = true;
        Ok(())
    }
}

/// The native side of the input stream (§4.2 READ_INPUT/CLOSE_INPUT/
/// IS_INPUT_CONNECTED, §4.3's non-blocking read discipline).
///
/// `pending` holds bytes already pulled off the OS stream by an
/// `IS_INPUT_CONNECTED` peek but not yet delivered to a `READ_INPUT`
/// caller, so a peek never loses data.
pub struct InputChannel {
    pending: VecDeque<u8>,
    eof_seen: bool,
    closed_by_us: bool,
}

impl InputChannel {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            eof_seen: false,
            closed_by_us: false,
        }
    }

    /// READ_INPUT: never blocks. Returns the `i32` payload the wire
    /// protocol expects directly (`n=-1` closed, `n=0` no data, `n>0` with
    /// the bytes).
    pub fn read(&mut self, max: usize) -> (i32, Vec<u8>) {
        if self.closed_by_us || self.eof_seen {
            return (-1, Vec::new());
        }

        if !self.pending.is_empty() {
            let take = max.min(self.pending.len());
            let data: Vec<u8> = self.pending.drain(..take).collect();
            return (data.len() as i32, data);
        }

        match platform::try_read(max) {
            ReadOutcome::Data(data) => (data.len() as i32, data),
            ReadOutcome::WouldBlock => (0, Vec::new()),
            ReadOutcome::Eof => {
                self.eof_seen = true;
                (-1, Vec::new())
            }
        }
    }

    /// IS_INPUT_CONNECTED: nonzero iff input is attached and either not
    /// yet at end-of-stream or still has buffered bytes to deliver.
    pub fn is_connected(&mut self) -> bool {
        if self.closed_by_us {
            return false;
        }
        if !self.pending.is_empty() {
            return true;
        }
        if self.eof_seen {
            return false;
        }

        match platform::try_read(1) {
            ReadOutcome::Data(data) => {
                self.pending.extend(data);
                true
            }
            ReadOutcome::WouldBlock => true,
            ReadOutcome::Eof => {
                self.eof_seen = true;
                false
            }
        }
    }

    pub fn close(&mut self) -> Result<(), String> {
        if self.closed_by_us {
            return Err("input stream already closed".to_string());
        }
        self.closed_by_us = true;
        Ok(())
    }
}

impl Default for InputChannel {
    fn default() -> Self {
        Self::new()
    }
}
