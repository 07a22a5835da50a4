//! The controller-side connection object (§4.4).

use std::collections::HashMap;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::ConnectionError;
use crate::facades::{InputFacade, OutputFacade, OutputKind};
use crate::queue::{self, OpReply, QueueOp, QueueOpKind, QueueReply};

/// Events a `Connection` delivers outside the request/response flow
/// (§7, §9). `Closed` fires exactly once; `Error` may fire any number of
/// times and is best-effort.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Closed,
    Error(String),
}

/// A validated, live connection to one native endpoint.
///
/// Constructed only by [`crate::Acceptor`] after a successful handshake.
/// Owns the socket for its whole lifetime via a dedicated worker thread;
/// every public operation round-trips through that thread's queue.
pub struct Connection {
    token: String,
    op_tx: Sender<QueueOp>,
    closed: Arc<AtomicBool>,
    exit_sent: Arc<AtomicBool>,
    events: Receiver<ConnectionEvent>,
    pub input: InputFacade,
    pub stdout: OutputFacade,
    pub stderr: OutputFacade,
}

impl Connection {
    /// Takes ownership of an already-handshaken socket and spins up its
    /// worker thread. `token` is whatever the acceptor extracted from the
    /// handshake block.
    pub(crate) fn new(stream: TcpStream, token: String) -> Self {
        let (op_tx, op_rx) = mpsc::channel::<QueueOp>();
        let (event_tx, events) = mpsc::channel::<ConnectionEvent>();
        let closed = Arc::new(AtomicBool::new(false));
        let exit_sent = Arc::new(AtomicBool::new(false));

        // Detached: the thread runs until every `Sender<QueueOp>` clone
        // (held here, and by each stream facade) is dropped, at which
        // point `op_rx.iter()` ends on its own and the thread exits.
        std::thread::spawn({
            let closed = Arc::clone(&closed);
            let exit_sent = Arc::clone(&exit_sent);
            let event_tx = event_tx.clone();
            move || run_worker(stream, op_rx, closed, exit_sent, event_tx)
        });

        let input = InputFacade::new(op_tx.clone());
        let stdout = OutputFacade::new(op_tx.clone(), OutputKind::Out);
        let stderr = OutputFacade::new(op_tx.clone(), OutputKind::Err);

        Connection {
            token,
            op_tx,
            closed,
            exit_sent,
            events,
            input,
            stdout,
            stderr,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// The connection's event stream. `recv`/`try_recv`/`iter` all work
    /// directly on the returned reference (`mpsc::Receiver::recv` only
    /// needs `&self`).
    pub fn events(&self) -> &Receiver<ConnectionEvent> {
        &self.events
    }

    pub fn get_args(&self) -> Result<Vec<String>, ConnectionError> {
        match self.submit(QueueOpKind::GetArgs)? {
            QueueReply::Args(args) => Ok(args),
            other => unreachable!("GetArgs produced {other:?}"),
        }
    }

    pub fn get_env(&self) -> Result<HashMap<String, String>, ConnectionError> {
        match self.submit(QueueOpKind::GetEnv)? {
            QueueReply::Env(env) => Ok(env),
            other => unreachable!("GetEnv produced {other:?}"),
        }
    }

    pub fn get_cwd(&self) -> Result<String, ConnectionError> {
        match self.submit(QueueOpKind::GetCwd)? {
            QueueReply::Cwd(cwd) => Ok(cwd),
            other => unreachable!("GetCwd produced {other:?}"),
        }
    }

    pub fn is_input_connected(&self) -> Result<bool, ConnectionError> {
        match self.submit(QueueOpKind::IsInputConnected)? {
            QueueReply::Bool(connected) => Ok(connected),
            other => unreachable!("IsInputConnected produced {other:?}"),
        }
    }

    /// Destroys the three stream facades first (so queued writes ahead of
    /// `exit` flush in FIFO order, §4.4), then enqueues EXIT. Rejects
    /// locally, without touching the socket, if the connection is already
    /// closed or a previous `exit` already succeeded.
    pub fn exit(&self, code: i32) -> Result<(), ConnectionError> {
        if self.closed.load(Ordering::Acquire) || self.exit_sent.load(Ordering::Acquire) {
            return Err(ConnectionError::AlreadyClosed);
        }

        self.stdout.destroy();
        self.stderr.destroy();
        self.input.destroy();

        match self.submit(QueueOpKind::Exit(code))? {
            QueueReply::Unit => {
                self.exit_sent.store(true, Ordering::Release);
                Ok(())
            }
            other => unreachable!("Exit produced {other:?}"),
        }
    }

    fn submit(&self, kind: QueueOpKind) -> Result<QueueReply, ConnectionError> {
        let (op, reply_rx) = QueueOp::new(kind);
        self.op_tx
            .send(op)
            .map_err(|_| ConnectionError::Closed)?;
        reply_rx.recv().map_err(|_| ConnectionError::Closed)?
    }
}

fn run_worker(
    mut stream: TcpStream,
    op_rx: Receiver<QueueOp>,
    closed: Arc<AtomicBool>,
    exit_sent: Arc<AtomicBool>,
    event_tx: Sender<ConnectionEvent>,
) {
    // The loop keeps running even after the socket is unusable: stream
    // facades may still submit (idempotent) close commands at any later
    // point, and those must resolve locally rather than hit a Sender with
    // no one left to receive it. The thread only really exits once every
    // `Sender<QueueOp>` clone (the `Connection` itself plus the three
    // facades) has been dropped.
    for op in op_rx.iter() {
        if closed.load(Ordering::Acquire) {
            op.resolve(locally_rejected(&op, ConnectionError::Closed));
            continue;
        }
        if exit_sent.load(Ordering::Acquire) {
            op.resolve(locally_rejected(&op, ConnectionError::AlreadyClosed));
            continue;
        }

        debug!(op = ?op.kind, "dispatching queued operation");
        let is_exit = op.is_exit();
        match queue::execute(&mut stream, &op.kind) {
            Ok(reply) => {
                if is_exit && reply.is_ok() {
                    exit_sent.store(true, Ordering::Release);
                }
                op.resolve(reply);
            }
            Err(transport_err) => {
                warn!(error = %transport_err, "transport failure, closing connection");
                let _ = event_tx.send(ConnectionEvent::Error(transport_err.to_string()));
                closed.store(true, Ordering::Release);
                info!("connection closed");
                let _ = event_tx.send(ConnectionEvent::Closed);
                op.resolve(Err(transport_err));
            }
        }
    }

    // Reached only once every sender has been dropped. If the socket was
    // still healthy at that point (the consumer simply dropped the
    // Connection), this is the one and only `Closed` event.
    if !closed.swap(true, Ordering::AcqRel) {
        info!("connection closed");
        let _ = event_tx.send(ConnectionEvent::Closed);
    }
}

/// Close commands stay idempotent no matter why the gate is shut (§4.4);
/// everything else — including a second `exit` — rejects with whichever
/// reason applies to the gate that stopped it.
fn locally_rejected(op: &QueueOp, reason: ConnectionError) -> OpReply {
    if op.is_close_command() {
        Ok(QueueReply::Unit)
    } else {
        Err(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Duration;

    use process_proxy_wire::{envelope, framer, Opcode};

    fn paired(native: impl FnOnce(TcpStream) + Send + 'static) -> Connection {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            native(stream);
        });
        let stream = TcpStream::connect(addr).unwrap();
        Connection::new(stream, "tok".to_string())
    }

    #[test]
    fn get_cwd_round_trips() {
        let connection = paired(|mut peer| {
            assert_eq!(framer::read_u8(&mut peer).unwrap(), Opcode::GetCwd.as_u8());
            envelope::write_success(&mut peer).unwrap();
            framer::write_string(&mut peer, "/srv/app").unwrap();
        });

        assert_eq!(connection.get_cwd().unwrap(), "/srv/app");
        assert_eq!(connection.token(), "tok");
    }

    #[test]
    fn exit_latches_and_rejects_subsequent_operations_locally() {
        let connection = paired(|mut peer| {
            assert_eq!(framer::read_u8(&mut peer).unwrap(), Opcode::Exit.as_u8());
            assert_eq!(framer::read_i32(&mut peer).unwrap(), 7);
            envelope::write_success(&mut peer).unwrap();
            // Keep the socket open briefly so a second op would otherwise
            // have a chance to reach the wire if our local gate were
            // missing.
            std::thread::sleep(Duration::from_millis(50));
        });

        connection.exit(7).unwrap();
        match connection.exit(7) {
            Err(ConnectionError::AlreadyClosed) => {}
            other => panic!("expected AlreadyClosed, got {other:?}"),
        }
        match connection.get_cwd() {
            Err(ConnectionError::AlreadyClosed) => {}
            other => panic!("expected AlreadyClosed, got {other:?}"),
        }
    }

    #[test]
    fn socket_close_emits_exactly_one_closed_event() {
        let connection = paired(|mut peer| {
            assert_eq!(framer::read_u8(&mut peer).unwrap(), Opcode::GetCwd.as_u8());
            drop(peer.shutdown(std::net::Shutdown::Both));
        });

        assert!(connection.get_cwd().is_err());

        let mut closed_count = 0;
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while std::time::Instant::now() < deadline {
            match connection.events().recv_timeout(Duration::from_millis(100)) {
                Ok(ConnectionEvent::Closed) => {
                    closed_count += 1;
                }
                Ok(ConnectionEvent::Error(_)) => {}
                Err(_) => break,
            }
        }
        assert_eq!(closed_count, 1);
        assert!(connection.closed());
    }

    #[test]
    fn close_command_after_socket_closed_resolves_locally_without_touching_wire() {
        let connection = paired(|mut peer| {
            assert_eq!(framer::read_u8(&mut peer).unwrap(), Opcode::GetCwd.as_u8());
            drop(peer.shutdown(std::net::Shutdown::Both));
        });

        assert!(connection.get_cwd().is_err());
        std::thread::sleep(Duration::from_millis(50));
        assert!(connection.closed());

        // A close command reaching an already-closed connection resolves
        // successfully without touching the socket (§4.4).
        connection.stdout.close().unwrap();
    }
}
