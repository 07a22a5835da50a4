//! The controller side of process-proxy (§4.4–§4.7): validates an
//! incoming handshake, then hands the caller a [`Connection`] whose
//! three stream facades and data-query operations are all funneled
//! through one serialized command queue.
//!
//! Mirrors the split the native crate uses: pure protocol plumbing lives
//! in `process-proxy-wire`, this crate only adds sockets, threads, and
//! lifecycle.

pub mod acceptor;
pub mod connection;
pub mod error;
mod facades;
mod queue;

pub use acceptor::{Acceptor, AcceptorConfig};
pub use connection::{Connection, ConnectionEvent};
pub use error::{ConnectionError, HandshakeError};
pub use facades::{InputFacade, OutputFacade, OutputKind};
