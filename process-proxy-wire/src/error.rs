use thiserror::Error;

/// Errors raised while encoding or decoding frames on the wire.
///
/// These are pure framing errors: short reads, invalid UTF-8, an opcode
/// byte outside the closed set. They carry no knowledge of sockets or
/// connection lifecycle — those live in the crates that use this one.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid utf-8 in length-prefixed string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("unknown opcode: 0x{0:02x}")]
    UnknownOpcode(u8),

    #[error("handshake prefix mismatch")]
    BadHandshakePrefix,
}
