//! The loopback server acceptor (§4.7): per accepted socket, validates
//! the fixed handshake under a deadline, then hands a live [`Connection`]
//! to the caller's consumer.

use std::io::Read;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::connection::Connection;
use crate::error::HandshakeError;

const DEFAULT_HANDSHAKE_DEADLINE: Duration = Duration::from_millis(1000);

/// A predicate over the handshake token string deciding whether to
/// accept a connection (§4.7, §6).
pub type TokenValidator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct AcceptorConfig {
    pub handshake_deadline: Duration,
    pub token_validator: Option<TokenValidator>,
}

impl Default for AcceptorConfig {
    fn default() -> Self {
        AcceptorConfig {
            handshake_deadline: DEFAULT_HANDSHAKE_DEADLINE,
            token_validator: None,
        }
    }
}

impl std::fmt::Debug for AcceptorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceptorConfig")
            .field("handshake_deadline", &self.handshake_deadline)
            .field("token_validator", &self.token_validator.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Accepts loopback connections and turns each into a validated
/// [`Connection`], or silently drops it on any handshake failure (§4.7).
pub struct Acceptor {
    listener: TcpListener,
    config: AcceptorConfig,
}

impl Acceptor {
    pub fn bind(addr: impl ToSocketAddrs, config: AcceptorConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Acceptor { listener, config })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop. Each accepted socket gets its own thread for
    /// handshake validation so one slow or hostile peer cannot stall
    /// accepting further connections; `consumer` is invoked with the
    /// resulting `Connection` only after validation succeeds.
    pub fn run<F>(&self, consumer: F) -> std::io::Result<()>
    where
        F: Fn(Connection) + Send + Sync + 'static,
    {
        let consumer = Arc::new(consumer);
        for stream in self.listener.incoming() {
            let stream = stream?;
            let config = self.config.clone();
            let consumer = Arc::clone(&consumer);
            std::thread::spawn(move || {
                if let Some(connection) = validate_handshake(stream, &config) {
                    consumer(connection);
                }
            });
        }
        Ok(())
    }
}

fn validate_handshake(stream: TcpStream, config: &AcceptorConfig) -> Option<Connection> {
    match try_handshake(stream, config) {
        Ok((stream, token)) => {
            info!(token_len = token.len(), "handshake accepted");
            Some(Connection::new(stream, token))
        }
        Err(e) => {
            debug!(error = %e, "handshake rejected, closing socket");
            None
        }
    }
}

/// Reads exactly 146 bytes under the configured deadline, validates the
/// prefix, extracts the token, and consults the optional validator.
///
/// Uses the raw socket directly (no `BufReader`): `read_exact` consumes
/// only the 146 bytes it asks for, so any bytes the peer sent immediately
/// after the handshake are left untouched in the kernel's receive buffer
/// and are exactly what the connection's command queue reads first —
/// satisfying §4.7's "after-handshake bytes" requirement without any
/// extra buffering layer.
fn try_handshake(
    mut stream: TcpStream,
    config: &AcceptorConfig,
) -> Result<(TcpStream, String), HandshakeError> {
    stream.set_read_timeout(Some(config.handshake_deadline))?;

    let mut block = [0u8; process_proxy_wire::HANDSHAKE_LEN];
    match stream.read_exact(&mut block) {
        Ok(()) => {}
        Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
            return Err(HandshakeError::Timeout);
        }
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(HandshakeError::ShortRead);
        }
        Err(e) => return Err(HandshakeError::Io(e)),
    }

    let token_bytes = process_proxy_wire::handshake::decode(&block).map_err(|e| match e {
        process_proxy_wire::WireError::BadHandshakePrefix => HandshakeError::BadPrefix,
        other => HandshakeError::Wire(other),
    })?;
    let token = String::from_utf8_lossy(&token_bytes).into_owned();

    if let Some(validator) = &config.token_validator {
        if !validator(&token) {
            return Err(HandshakeError::PolicyRejected);
        }
    }

    stream.set_read_timeout(None)?;
    Ok((stream, token))
}
