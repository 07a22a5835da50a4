//! Pure, stateless encode/decode of the frame primitives (§4.1).
//!
//! There is no checksum and no delimiter here: every length field is
//! load-bearing and governs exactly how many bytes follow. All multi-byte
//! integers are little-endian.

use std::io::{Read, Write};

use crate::error::WireError;

pub fn read_u8<R: Read>(r: &mut R) -> Result<u8, WireError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn write_u8<W: Write>(w: &mut W, value: u8) -> Result<(), WireError> {
    w.write_all(&[value])?;
    Ok(())
}

pub fn read_u32<R: Read>(r: &mut R) -> Result<u32, WireError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn write_u32<W: Write>(w: &mut W, value: u32) -> Result<(), WireError> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub fn read_i32<R: Read>(r: &mut R) -> Result<i32, WireError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

pub fn write_i32<W: Write>(w: &mut W, value: i32) -> Result<(), WireError> {
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

/// Reads exactly `len` raw bytes. Used for WRITE_OUT/WRITE_ERR payloads and
/// for READ_INPUT response bodies, where the byte count is not a UTF-8
/// string length but a plain data length.
pub fn read_bytes<R: Read>(r: &mut R, len: usize) -> Result<Vec<u8>, WireError> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn write_bytes<W: Write>(w: &mut W, bytes: &[u8]) -> Result<(), WireError> {
    w.write_all(bytes)?;
    Ok(())
}

/// Reads a `u32` length prefix followed by that many bytes, interpreted as
/// UTF-8. Strings are never NUL-terminated on the wire.
pub fn read_string<R: Read>(r: &mut R) -> Result<String, WireError> {
    let len = read_u32(r)? as usize;
    let bytes = read_bytes(r, len)?;
    Ok(String::from_utf8(bytes)?)
}

/// Writes a string as a `u32` byte-length prefix followed by its UTF-8
/// bytes, symmetric with [`read_string`].
pub fn write_string<W: Write>(w: &mut W, value: &str) -> Result<(), WireError> {
    write_u32(w, value.len() as u32)?;
    write_bytes(w, value.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_integers() {
        let mut buf = Vec::new();
        write_u8(&mut buf, 7).unwrap();
        write_u32(&mut buf, 0xDEAD_BEEF).unwrap();
        write_i32(&mut buf, -42).unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_u8(&mut cursor).unwrap(), 7);
        assert_eq!(read_u32(&mut cursor).unwrap(), 0xDEAD_BEEF);
        assert_eq!(read_i32(&mut cursor).unwrap(), -42);
    }

    #[test]
    fn round_trips_strings_including_empty() {
        for s in ["", "hello", "unicode: héllo wörld 🎉"] {
            let mut buf = Vec::new();
            write_string(&mut buf, s).unwrap();
            let mut cursor = Cursor::new(buf);
            assert_eq!(read_string(&mut cursor).unwrap(), s);
        }
    }

    #[test]
    fn string_is_length_prefixed_not_nul_terminated() {
        let mut buf = Vec::new();
        write_string(&mut buf, "ab").unwrap();
        // 4-byte length prefix (2) + 2 payload bytes, no trailing NUL.
        assert_eq!(buf, vec![2, 0, 0, 0, b'a', b'b']);
    }

    #[test]
    fn rejects_invalid_utf8() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 2).unwrap();
        buf.extend_from_slice(&[0xFF, 0xFE]);
        let mut cursor = Cursor::new(buf);
        assert!(matches!(read_string(&mut cursor), Err(WireError::InvalidUtf8(_))));
    }

    #[test]
    fn a_future_opcode_byte_inside_payload_does_not_confuse_length_framing() {
        // A WRITE_OUT payload containing the byte 0x07 (EXIT's opcode)
        // must not be mistaken for a new command; length alone governs
        // extent.
        let payload = vec![0x07u8, 0x01, 0x02, 0x07];
        let mut buf = Vec::new();
        write_u32(&mut buf, payload.len() as u32).unwrap();
        write_bytes(&mut buf, &payload).unwrap();

        let mut cursor = Cursor::new(buf);
        let len = read_u32(&mut cursor).unwrap() as usize;
        let got = read_bytes(&mut cursor, len).unwrap();
        assert_eq!(got, payload);
    }

    #[test]
    fn zero_length_byte_payload_transmits_nothing() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 0).unwrap();
        write_bytes(&mut buf, &[]).unwrap();
        assert_eq!(buf, vec![0, 0, 0, 0]);
    }
}
