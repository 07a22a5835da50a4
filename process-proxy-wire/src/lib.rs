//! Framing and wire protocol for process-proxy's loopback IPC channel.
//!
//! This crate is deliberately I/O-agnostic: every function here takes a
//! generic [`std::io::Read`] or [`std::io::Write`] and does exactly one
//! thing — encode or decode a fixed piece of the wire format. It knows
//! nothing about sockets, threads, or connection lifecycle; those live in
//! `process-proxy-native` and `process-proxy-controller`.

pub mod envelope;
pub mod error;
pub mod framer;
pub mod handshake;
pub mod opcode;

pub use envelope::{Status, ERROR_STATUS, SUCCESS_STATUS};
pub use error::WireError;
pub use handshake::{HANDSHAKE_LEN, PROTOCOL_PREFIX, TOKEN_FIELD_LEN};
pub use opcode::Opcode;
