//! The native endpoint side of process-proxy (§4.3).
//!
//! This crate is a library plus a thin `main.rs` so the boot sequence and
//! command loop can be exercised from integration tests without spawning
//! the binary, the way `fetchbin` and `bkt-build` in this workspace keep
//! their `main.rs` a thin wrapper over a testable library.

pub mod command_loop;
pub mod config;
pub mod error;
pub mod handlers;
pub mod state;
pub mod streams;

use std::net::TcpStream;

pub use config::Config;
pub use error::NativeError;

/// Runs the full boot sequence (§4.3 steps 2-5) against an already-parsed
/// [`Config`] and returns the process's final exit code. Separated from
/// [`Config::from_env`] so tests can supply a config directly instead of
/// mutating process environment variables.
pub fn run(config: &Config) -> Result<i32, NativeError> {
    let stream = TcpStream::connect(("127.0.0.1", config.port))
        .map_err(|source| NativeError::Connect { port: config.port, source })?;

    send_handshake(&stream, &config.token)?;

    let handlers = handlers::Handlers::new();
    Ok(command_loop::run(stream, handlers))
}

/// Sends the handshake block a `write()` call at a time, the way the
/// spec's "if send is short, exit nonzero" implies a transport that can
/// legitimately deliver less than the full block in one call. `Ok(0)`
/// from the underlying socket (no progress, peer gone) is treated as a
/// short send rather than retried forever.
fn send_handshake(mut stream: &TcpStream, token: &[u8]) -> Result<(), NativeError> {
    use std::io::Write;

    let block = process_proxy_wire::handshake::encode(token);
    let mut wrote = 0usize;
    while wrote < block.len() {
        match stream.write(&block[wrote..]) {
            Ok(0) => {
                return Err(NativeError::HandshakeShortSend {
                    wrote,
                    expected: block.len(),
                })
            }
            Ok(n) => wrote += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(source) => return Err(NativeError::Io(source)),
        }
    }
    Ok(())
}
