use thiserror::Error;

/// Errors raised while booting or running the native endpoint.
///
/// Boot errors (`MissingPort`, `InvalidPort`, `Connect`, `HandshakeShortSend`)
/// each map to a distinct nonzero process exit code in [`crate::config`]'s
/// caller; everything else is a per-command failure that gets encoded onto
/// the wire rather than crashing the process (§4.3, §7).
#[derive(Debug, Error)]
pub enum NativeError {
    #[error("{0} is not set")]
    MissingPort(&'static str),

    #[error("{var} is not a valid port in 1..=65535: {value:?}")]
    InvalidPort { var: &'static str, value: String },

    #[error("failed to connect to 127.0.0.1:{port}: {source}")]
    Connect { port: u16, source: std::io::Error },

    #[error("handshake send was short: wrote {wrote} of {expected} bytes")]
    HandshakeShortSend { wrote: usize, expected: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Wire(#[from] process_proxy_wire::WireError),
}

/// Process exit codes for boot failures (§4.3, §6: "nonzero diagnostic
/// codes on missing/invalid port, failed handshake send, or socket
/// creation failure").
pub mod exit_code {
    pub const CLEAN: i32 = 0;
    pub const MISSING_PORT: i32 = 64;
    pub const INVALID_PORT: i32 = 65;
    pub const CONNECT_FAILED: i32 = 66;
    pub const HANDSHAKE_FAILED: i32 = 67;
}
