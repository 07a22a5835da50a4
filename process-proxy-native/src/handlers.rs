//! Per-opcode handlers (§4.2, §4.3).
//!
//! Each handler reads its request payload in full, performs its side
//! effect, and writes its response envelope in full before returning.
//! None of them retry or partially write: a short write here is a
//! transport failure that propagates up and breaks the command loop.

use std::io::{Read, Write};

use process_proxy_wire::{envelope, framer};

use crate::state::NativeState;
use crate::streams::{ClosableWriter, InputChannel};

/// The native endpoint picks a small power-of-two buffer for its own
/// peek-ahead bookkeeping; the actual READ_INPUT max is caller-supplied
/// and can be larger or smaller.
pub const DEFAULT_READ_CHUNK: usize = 8192;

/// Upper bound on a single READ_INPUT's requested byte count, to keep a
/// malformed or hostile `u32` from forcing an oversized allocation.
pub const MAX_READ_REQUEST: usize = 16 * 1024 * 1024;

pub struct Handlers {
    state: NativeState,
    input: InputChannel,
    stdout: ClosableWriter<std::io::Stdout>,
    stderr: ClosableWriter<std::io::Stderr>,
    exit_code: Option<i32>,
}

impl Handlers {
    pub fn new() -> Self {
        Self {
            state: NativeState::capture(),
            input: InputChannel::new(),
            stdout: ClosableWriter::new(std::io::stdout(), "stdout"),
            stderr: ClosableWriter::new(std::io::stderr(), "stderr"),
            exit_code: None,
        }
    }

    /// `Some(code)` once an EXIT command has been processed successfully;
    /// the caller uses this as the process's final exit status.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn get_args<S: Write>(&mut self, stream: &mut S) -> Result<(), process_proxy_wire::WireError> {
        envelope::write_success(stream)?;
        let argv = self.state.argv();
        framer::write_u32(stream, argv.len() as u32)?;
        for arg in argv {
            framer::write_string(stream, arg)?;
        }
        Ok(())
    }

    pub fn read_input<S: Read + Write>(
        &mut self,
        stream: &mut S,
    ) -> Result<(), process_proxy_wire::WireError> {
        let requested = framer::read_u32(stream)? as usize;
        // Guard against an unreasonable caller-supplied max; the facade on
        // the controller side only ever asks for DEFAULT_READ_CHUNK at a
        // time, but the wire format allows any u32.
        let max = requested.min(MAX_READ_REQUEST);
        let (n, data) = self.input.read(max);

        envelope::write_success(stream)?;
        framer::write_i32(stream, n)?;
        if n > 0 {
            framer::write_bytes(stream, &data)?;
        }
        Ok(())
    }

    pub fn write_out<S: Read + Write>(
        &mut self,
        stream: &mut S,
    ) -> Result<(), process_proxy_wire::WireError> {
        let len = framer::read_u32(stream)? as usize;
        let data = framer::read_bytes(stream, len)?;
        match self.stdout.write_all(&data) {
            Ok(()) => envelope::write_success(stream),
            Err(message) => envelope::write_failure(stream, &message),
        }
    }

    pub fn write_err<S: Read + Write>(
        &mut self,
        stream: &mut S,
    ) -> Result<(), process_proxy_wire::WireError> {
        let len = framer::read_u32(stream)? as usize;
        let data = framer::read_bytes(stream, len)?;
        match self.stderr.write_all(&data) {
            Ok(()) => envelope::write_success(stream),
            Err(message) => envelope::write_failure(stream, &message),
        }
    }

    pub fn get_cwd<S: Write>(&mut self, stream: &mut S) -> Result<(), process_proxy_wire::WireError> {
        match self.state.cwd() {
            Ok(path) => {
                envelope::write_success(stream)?;
                framer::write_string(stream, &path)
            }
            Err(e) => envelope::write_failure(stream, &format!("failed to read cwd: {e}")),
        }
    }

    pub fn get_env<S: Write>(&mut self, stream: &mut S) -> Result<(), process_proxy_wire::WireError> {
        let entries = self.state.env();
        envelope::write_success(stream)?;
        framer::write_u32(stream, entries.len() as u32)?;
        for entry in entries {
            framer::write_string(stream, &entry)?;
        }
        Ok(())
    }

    /// Returns the requested exit code after writing the success response.
    /// Per §4.2 "EXIT ordering", the caller must finish flushing this
    /// response before terminating.
    pub fn exit<S: Read + Write>(
        &mut self,
        stream: &mut S,
    ) -> Result<i32, process_proxy_wire::WireError> {
        let code = framer::read_i32(stream)?;
        envelope::write_success(stream)?;
        self.exit_code = Some(code);
        Ok(code)
    }

    pub fn close_input<S: Write>(&mut self, stream: &mut S) -> Result<(), process_proxy_wire::WireError> {
        match self.input.close() {
            Ok(()) => envelope::write_success(stream),
            Err(message) => envelope::write_failure(stream, &message),
        }
    }

    pub fn close_out<S: Write>(&mut self, stream: &mut S) -> Result<(), process_proxy_wire::WireError> {
        match self.stdout.close() {
            Ok(()) => envelope::write_success(stream),
            Err(message) => envelope::write_failure(stream, &message),
        }
    }

    pub fn close_err<S: Write>(&mut self, stream: &mut S) -> Result<(), process_proxy_wire::WireError> {
        match self.stderr.close() {
            Ok(()) => envelope::write_success(stream),
            Err(message) => envelope::write_failure(stream, &message),
        }
    }

    pub fn is_input_connected<S: Write>(
        &mut self,
        stream: &mut S,
    ) -> Result<(), process_proxy_wire::WireError> {
        let connected = self.input.is_connected();
        envelope::write_success(stream)?;
        framer::write_i32(stream, connected as i32)
    }
}

impl Default for Handlers {
    fn default() -> Self {
        Self::new()
    }
}
