//! The response envelope shared by every command (§3, §4.2): a leading
//! `i32` status, zero for success, any other value followed by a
//! length-prefixed UTF-8 error message.

use std::io::{Read, Write};

use crate::error::WireError;
use crate::framer::{read_i32, read_string, write_i32, write_string};

/// The status value written for a successful response.
pub const SUCCESS_STATUS: i32 = 0;

/// The status value this implementation writes for a failed response.
/// The spec only requires "any other value"; native implementations in
/// other languages are free to use a different nonzero convention, so
/// decoders must treat *any* nonzero value as failure rather than
/// matching this constant exactly.
pub const ERROR_STATUS: i32 = -1;

/// The decoded outcome of a response's leading status field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure(String),
}

pub fn write_success<W: Write>(w: &mut W) -> Result<(), WireError> {
    write_i32(w, SUCCESS_STATUS)
}

pub fn write_failure<W: Write>(w: &mut W, message: &str) -> Result<(), WireError> {
    write_i32(w, ERROR_STATUS)?;
    write_string(w, message)
}

/// Reads the leading status field and, on failure, the error message that
/// follows it.
pub fn read_status<R: Read>(r: &mut R) -> Result<Status, WireError> {
    let status = read_i32(r)?;
    if status == SUCCESS_STATUS {
        Ok(Status::Success)
    } else {
        Ok(Status::Failure(read_string(r)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn success_round_trips() {
        let mut buf = Vec::new();
        write_success(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_status(&mut cursor).unwrap(), Status::Success);
    }

    #[test]
    fn failure_round_trips_with_message() {
        let mut buf = Vec::new();
        write_failure(&mut buf, "stream already closed").unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(
            read_status(&mut cursor).unwrap(),
            Status::Failure("stream already closed".to_string())
        );
    }

    #[test]
    fn any_nonzero_status_is_treated_as_failure() {
        // A peer using a different nonzero convention (e.g. 1 instead of
        // -1) must still decode as failure.
        let mut buf = Vec::new();
        write_i32(&mut buf, 1).unwrap();
        write_string(&mut buf, "oops").unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(
            read_status(&mut cursor).unwrap(),
            Status::Failure("oops".to_string())
        );
    }
}
