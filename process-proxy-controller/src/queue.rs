//! The per-connection command queue (§4.4, §5).
//!
//! A `Connection` is driven by exactly one owning thread that reads
//! [`QueueOp`]s off an `mpsc::Receiver` and executes them one at a time
//! against the socket — this is what gives "at most one command in
//! flight" for free, without a separate state machine: the thread is
//! simply busy with one op's write-then-read-status-then-read-body
//! sequence before it looks at the next one.

use std::collections::HashMap;
use std::net::TcpStream;
use std::sync::mpsc::Sender;

use process_proxy_wire::{envelope, framer, Opcode, Status};

use crate::error::ConnectionError;

/// The decoded outcome of a READ_INPUT response (§4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n > 0`: this many bytes of data follow.
    Data(Vec<u8>),
    /// `n == 0`: no data available right now.
    Empty,
    /// `n == -1`: input has been closed at the source.
    Closed,
}

#[derive(Debug)]
pub enum QueueOpKind {
    GetArgs,
    GetEnv,
    GetCwd,
    Exit(i32),
    IsInputConnected,
    ReadInput(u32),
    WriteOut(Vec<u8>),
    WriteErr(Vec<u8>),
    CloseInput,
    CloseOut,
    CloseErr,
}

impl QueueOpKind {
    fn is_close_command(&self) -> bool {
        matches!(self, QueueOpKind::CloseInput | QueueOpKind::CloseOut | QueueOpKind::CloseErr)
    }

    fn is_exit(&self) -> bool {
        matches!(self, QueueOpKind::Exit(_))
    }
}

/// What a successful operation resolves with. One variant per distinct
/// response shape in §4.2; callers downcast via the `connection` module's
/// typed wrappers rather than matching this directly.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueReply {
    Args(Vec<String>),
    Env(HashMap<String, String>),
    Cwd(String),
    Bool(bool),
    ReadInput(ReadOutcome),
    Unit,
}

pub type OpReply = Result<QueueReply, ConnectionError>;

pub struct QueueOp {
    pub kind: QueueOpKind,
    reply_tx: Sender<OpReply>,
}

impl QueueOp {
    pub fn new(kind: QueueOpKind) -> (Self, std::sync::mpsc::Receiver<OpReply>) {
        let (reply_tx, reply_rx) = std::sync::mpsc::channel();
        (QueueOp { kind, reply_tx }, reply_rx)
    }

    pub fn is_close_command(&self) -> bool {
        self.kind.is_close_command()
    }

    pub fn is_exit(&self) -> bool {
        self.kind.is_exit()
    }

    pub fn resolve(self, result: OpReply) {
        // The submitter may have given up waiting (dropped the receiver);
        // that is not this op's problem.
        let _ = self.reply_tx.send(result);
    }
}

/// Runs one op's full write/status/body sequence against the socket.
/// Returning `Err` always means the socket itself is no longer usable
/// (io failure, peer closed, or a response we could not frame); a
/// protocol-level rejection (non-zero status) is folded into `Ok` as a
/// [`ConnectionError::Protocol`]... except that the worker loop treats
/// `Protocol` as non-fatal, so it is returned as `Ok` with the rejection
/// carried as the reply's own error, not as this function's `Err`.
pub fn execute(stream: &mut TcpStream, kind: &QueueOpKind) -> Result<OpReply, ConnectionError> {
    match kind {
        QueueOpKind::GetArgs => {
            framer::write_u8(stream, Opcode::GetArgs.as_u8())?;
            match read_status(stream)? {
                Err(rejection) => Ok(Err(rejection)),
                Ok(()) => {
                    let count = framer::read_u32(stream)?;
                    let mut args = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        args.push(framer::read_string(stream)?);
                    }
                    Ok(Ok(QueueReply::Args(args)))
                }
            }
        }
        QueueOpKind::GetEnv => {
            framer::write_u8(stream, Opcode::GetEnv.as_u8())?;
            match read_status(stream)? {
                Err(rejection) => Ok(Err(rejection)),
                Ok(()) => {
                    let count = framer::read_u32(stream)?;
                    let mut env = HashMap::with_capacity(count as usize);
                    for _ in 0..count {
                        let entry = framer::read_string(stream)?;
                        if let Some((key, value)) = entry.split_once('=') {
                            env.insert(key.to_string(), value.to_string());
                        }
                    }
                    Ok(Ok(QueueReply::Env(env)))
                }
            }
        }
        QueueOpKind::GetCwd => {
            framer::write_u8(stream, Opcode::GetCwd.as_u8())?;
            match read_status(stream)? {
                Err(rejection) => Ok(Err(rejection)),
                Ok(()) => Ok(Ok(QueueReply::Cwd(framer::read_string(stream)?))),
            }
        }
        QueueOpKind::Exit(code) => {
            framer::write_u8(stream, Opcode::Exit.as_u8())?;
            framer::write_i32(stream, *code)?;
            match read_status(stream)? {
                Err(rejection) => Ok(Err(rejection)),
                Ok(()) => Ok(Ok(QueueReply::Unit)),
            }
        }
        QueueOpKind::IsInputConnected => {
            framer::write_u8(stream, Opcode::IsInputConnected.as_u8())?;
            match read_status(stream)? {
                Err(rejection) => Ok(Err(rejection)),
                Ok(()) => Ok(Ok(QueueReply::Bool(framer::read_i32(stream)? != 0))),
            }
        }
        QueueOpKind::ReadInput(max) => {
            framer::write_u8(stream, Opcode::ReadInput.as_u8())?;
            framer::write_u32(stream, *max)?;
            match read_status(stream)? {
                Err(rejection) => Ok(Err(rejection)),
                Ok(()) => {
                    let n = framer::read_i32(stream)?;
                    let outcome = match n {
                        -1 => ReadOutcome::Closed,
                        0 => ReadOutcome::Empty,
                        n if n > 0 => ReadOutcome::Data(framer::read_bytes(stream, n as usize)?),
                        other => return Err(ConnectionError::Protocol(format!(
                            "endpoint returned an impossible READ_INPUT count: {other}"
                        ))),
                    };
                    Ok(Ok(QueueReply::ReadInput(outcome)))
                }
            }
        }
        QueueOpKind::WriteOut(buf) => write_payload(stream, Opcode::WriteOut, buf),
        QueueOpKind::WriteErr(buf) => write_payload(stream, Opcode::WriteErr, buf),
        QueueOpKind::CloseInput => close_command(stream, Opcode::CloseInput),
        QueueOpKind::CloseOut => close_command(stream, Opcode::CloseOut),
        QueueOpKind::CloseErr => close_command(stream, Opcode::CloseErr),
    }
}

fn write_payload(stream: &mut TcpStream, opcode: Opcode, buf: &[u8]) -> Result<OpReply, ConnectionError> {
    framer::write_u8(stream, opcode.as_u8())?;
    framer::write_u32(stream, buf.len() as u32)?;
    framer::write_bytes(stream, buf)?;
    match read_status(stream)? {
        Err(rejection) => Ok(Err(rejection)),
        Ok(()) => Ok(Ok(QueueReply::Unit)),
    }
}

fn close_command(stream: &mut TcpStream, opcode: Opcode) -> Result<OpReply, ConnectionError> {
    framer::write_u8(stream, opcode.as_u8())?;
    match read_status(stream)? {
        Err(rejection) => Ok(Err(rejection)),
        Ok(()) => Ok(Ok(QueueReply::Unit)),
    }
}

/// Reads the status envelope and turns a non-zero status into a
/// `Protocol` rejection carrying the endpoint's message, without treating
/// it as a transport failure.
fn read_status(stream: &mut TcpStream) -> Result<Result<(), ConnectionError>, ConnectionError> {
    match envelope::read_status(stream)? {
        Status::Success => Ok(Ok(())),
        Status::Failure(message) => Ok(Err(ConnectionError::Protocol(message))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    /// Spawns a thread that plays a scripted native peer: `respond` is
    /// handed the accepted stream after the opcode byte has already been
    /// consumed by `execute`, and is responsible for reading any request
    /// payload and writing the response envelope.
    fn with_peer<F>(respond: F) -> TcpStream
    where
        F: FnOnce(TcpStream) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            respond(stream);
        });
        TcpStream::connect(addr).unwrap()
    }

    #[test]
    fn get_args_decodes_the_success_payload() {
        let mut stream = with_peer(|mut peer| {
            assert_eq!(framer::read_u8(&mut peer).unwrap(), Opcode::GetArgs.as_u8());
            envelope::write_success(&mut peer).unwrap();
            framer::write_u32(&mut peer, 2).unwrap();
            framer::write_string(&mut peer, "proxy").unwrap();
            framer::write_string(&mut peer, "--flag").unwrap();
        });

        let reply = execute(&mut stream, &QueueOpKind::GetArgs).unwrap().unwrap();
        assert_eq!(reply, QueueReply::Args(vec!["proxy".into(), "--flag".into()]));
    }

    #[test]
    fn get_env_drops_entries_without_equals() {
        let mut stream = with_peer(|mut peer| {
            assert_eq!(framer::read_u8(&mut peer).unwrap(), Opcode::GetEnv.as_u8());
            envelope::write_success(&mut peer).unwrap();
            framer::write_u32(&mut peer, 2).unwrap();
            framer::write_string(&mut peer, "PATH=/usr/bin").unwrap();
            framer::write_string(&mut peer, "MALFORMED").unwrap();
        });

        let reply = execute(&mut stream, &QueueOpKind::GetEnv).unwrap().unwrap();
        match reply {
            QueueReply::Env(env) => {
                assert_eq!(env.get("PATH").map(String::as_str), Some("/usr/bin"));
                assert_eq!(env.len(), 1);
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn a_failure_status_becomes_a_protocol_rejection_not_a_transport_error() {
        let mut stream = with_peer(|mut peer| {
            assert_eq!(framer::read_u8(&mut peer).unwrap(), Opcode::CloseInput.as_u8());
            envelope::write_failure(&mut peer, "input already closed").unwrap();
        });

        let outcome = execute(&mut stream, &QueueOpKind::CloseInput).unwrap();
        assert_eq!(
            outcome.unwrap_err().to_string(),
            "input already closed"
        );
    }

    #[test]
    fn read_input_maps_each_sentinel_value() {
        for (wire_n, expected) in [
            (-1, ReadOutcome::Closed),
            (0, ReadOutcome::Empty),
            (3, ReadOutcome::Data(vec![1, 2, 3])),
        ] {
            let mut stream = with_peer(move |mut peer| {
                assert_eq!(framer::read_u8(&mut peer).unwrap(), Opcode::ReadInput.as_u8());
                assert_eq!(framer::read_u32(&mut peer).unwrap(), 8192);
                envelope::write_success(&mut peer).unwrap();
                framer::write_i32(&mut peer, wire_n).unwrap();
                if wire_n > 0 {
                    framer::write_bytes(&mut peer, &[1, 2, 3]).unwrap();
                }
            });

            let reply = execute(&mut stream, &QueueOpKind::ReadInput(8192)).unwrap().unwrap();
            assert_eq!(reply, QueueReply::ReadInput(expected));
        }
    }

    #[test]
    fn write_out_round_trips_the_buffer_and_length() {
        let payload = vec![0x41u8; 4096];
        let expected = payload.clone();
        let mut stream = with_peer(move |mut peer| {
            assert_eq!(framer::read_u8(&mut peer).unwrap(), Opcode::WriteOut.as_u8());
            let len = framer::read_u32(&mut peer).unwrap() as usize;
            let body = framer::read_bytes(&mut peer, len).unwrap();
            assert_eq!(body, expected);
            envelope::write_success(&mut peer).unwrap();
        });

        let reply = execute(&mut stream, &QueueOpKind::WriteOut(payload)).unwrap().unwrap();
        assert_eq!(reply, QueueReply::Unit);
    }

    #[test]
    fn a_transport_error_surfaces_as_an_err_not_a_rejection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            drop(stream); // close without writing a response
        });
        let mut stream = TcpStream::connect(addr).unwrap();

        let outcome = execute(&mut stream, &QueueOpKind::GetCwd);
        assert!(outcome.is_err(), "peer dropping mid-response should be a transport error");
    }
}
