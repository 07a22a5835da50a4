//! Unix non-blocking stdin read: toggle `O_NONBLOCK` on fd 0 for the
//! duration of one read, then restore the original flags (§4.3, §9).

use std::io;
use std::os::fd::AsRawFd;

use super::ReadOutcome;

pub fn try_read(max: usize) -> ReadOutcome {
    let stdin = io::stdin();
    let fd = stdin.as_raw_fd();

    let orig_flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if orig_flags < 0 {
        return ReadOutcome::Eof;
    }

    let set_result = unsafe { libc::fcntl(fd, libc::F_SETFL, orig_flags | libc::O_NONBLOCK) };
    if set_result < 0 {
        return ReadOutcome::Eof;
    }

    let mut buf = vec![0u8; max];
    let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
    let read_errno = io::Error::last_os_error();

    // Best-effort restore; a failure here doesn't change the outcome of
    // this read, only future ones, and there is no recovery action that
    // would make this more correct.
    unsafe {
        libc::fcntl(fd, libc::F_SETFL, orig_flags);
    }

    match n.cmp(&0) {
        std::cmp::Ordering::Greater => {
            buf.truncate(n as usize);
            ReadOutcome::Data(buf)
        }
        std::cmp::Ordering::Equal => ReadOutcome::Eof,
        std::cmp::Ordering::Less => {
            match read_errno.raw_os_error() {
                Some(code) if code == libc::EAGAIN || code == libc::EWOULDBLOCK => {
                    ReadOutcome::WouldBlock
                }
                _ => ReadOutcome::Eof,
            }
        }
    }
}
