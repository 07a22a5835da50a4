//! Windows non-blocking stdin read: `PeekNamedPipe` to learn how many bytes
//! are available before issuing a bounded, non-blocking-in-effect
//! `ReadFile` (§4.3, §9 "peek-available, then read that many bytes").
//!
//! If the input handle isn't a pipe (e.g. an interactive console), we fall
//! back to `GetNumberOfConsoleInputEvents`, which gives the same
//! "how much is there" answer for a console input buffer.

use std::io;

use windows_sys::Win32::Foundation::{GetLastError, ERROR_BROKEN_PIPE, HANDLE};
use windows_sys::Win32::Storage::FileSystem::ReadFile;
use windows_sys::Win32::System::Console::{
    GetNumberOfConsoleInputEvents, GetStdHandle, STD_INPUT_HANDLE,
};
use windows_sys::Win32::System::Pipes::PeekNamedPipe;

use super::ReadOutcome;

fn stdin_handle() -> HANDLE {
    unsafe { GetStdHandle(STD_INPUT_HANDLE) }
}

/// Bytes currently available without blocking, or `None` if the source is
/// closed.
fn available(handle: HANDLE) -> Option<u32> {
    let mut available: u32 = 0;
    let peeked = unsafe {
        PeekNamedPipe(
            handle,
            std::ptr::null_mut(),
            0,
            std::ptr::null_mut(),
            &mut available,
            std::ptr::null_mut(),
        )
    };

    if peeked != 0 {
        return Some(available);
    }

    if unsafe { GetLastError() } == ERROR_BROKEN_PIPE {
        return None;
    }

    // Not a pipe (e.g. a console handle); ask the console input buffer
    // instead.
    let mut events: u32 = 0;
    if unsafe { GetNumberOfConsoleInputEvents(handle, &mut events) } != 0 {
        Some(events)
    } else {
        // Neither API applies; treat as "nothing available right now"
        // rather than hanging the command loop.
        Some(0)
    }
}

pub fn try_read(max: usize) -> ReadOutcome {
    let handle = stdin_handle();

    let Some(available) = available(handle) else {
        return ReadOutcome::Eof;
    };

    if available == 0 {
        return ReadOutcome::WouldBlock;
    }

    let want = (available as usize).min(max);
    let mut buf = vec![0u8; want];
    let mut read: u32 = 0;
    let ok = unsafe {
        ReadFile(
            handle,
            buf.as_mut_ptr(),
            buf.len() as u32,
            &mut read,
            std::ptr::null_mut(),
        )
    };

    if ok == 0 {
        let err = io::Error::last_os_error();
        return if err.raw_os_error() == Some(ERROR_BROKEN_PIPE as i32) {
            ReadOutcome::Eof
        } else {
            ReadOutcome::Eof
        };
    }

    if read == 0 {
        return ReadOutcome::Eof;
    }

    buf.truncate(read as usize);
    ReadOutcome::Data(buf)
}
