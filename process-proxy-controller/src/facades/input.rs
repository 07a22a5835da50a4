//! The readable input facade (§4.5): a lazy, finite byte sequence driven
//! by a dedicated polling thread, started only on first demand.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender, TrySendError};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use crate::error::ConnectionError;
use crate::queue::{QueueOp, QueueOpKind, QueueReply, ReadOutcome};

const DEFAULT_CHUNK: u32 = 8192;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// How often the poll thread re-checks `destroyed` while waiting for the
/// consumer to make room for the next chunk. Not a protocol timeout —
/// purely how responsive `destroy()` is to a slow consumer.
const BACKPRESSURE_RETRY: Duration = Duration::from_millis(20);

enum InputEvent {
    Data(Vec<u8>),
    Closed,
}

/// A lazy, finite sequence of input chunks. Not restartable: once
/// exhausted (native-reported close, or an explicit [`InputFacade::close`])
/// it stays exhausted.
pub struct InputFacade {
    op_tx: Sender<QueueOp>,
    destroyed: Arc<AtomicBool>,
    terminated: bool,
    data_rx: mpsc::Receiver<InputEvent>,
    data_tx: Mutex<Option<mpsc::SyncSender<InputEvent>>>,
    start: Once,
    chunk_size: u32,
    poll_interval: Duration,
}

impl InputFacade {
    pub(crate) fn new(op_tx: Sender<QueueOp>) -> Self {
        let (data_tx, data_rx) = mpsc::sync_channel(1);
        InputFacade {
            op_tx,
            destroyed: Arc::new(AtomicBool::new(false)),
            terminated: false,
            data_rx,
            data_tx: Mutex::new(Some(data_tx)),
            start: Once::new(),
            chunk_size: DEFAULT_CHUNK,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    fn ensure_started(&self) {
        self.start.call_once(|| {
            let data_tx = self
                .data_tx
                .lock()
                .expect("data_tx mutex poisoned")
                .take()
                .expect("ensure_started only runs once");
            let op_tx = self.op_tx.clone();
            let destroyed = Arc::clone(&self.destroyed);
            let chunk_size = self.chunk_size;
            let poll_interval = self.poll_interval;
            std::thread::spawn(move || poll_loop(op_tx, data_tx, destroyed, chunk_size, poll_interval));
        });
    }

    /// Blocks for the next chunk of input. Returns `None` once the
    /// native side has reported input closed, or once this facade has
    /// been explicitly closed — never again after that.
    pub fn next_chunk(&mut self) -> Option<Vec<u8>> {
        if self.terminated {
            return None;
        }
        self.ensure_started();
        match self.data_rx.recv() {
            Ok(InputEvent::Data(bytes)) => Some(bytes),
            Ok(InputEvent::Closed) | Err(_) => {
                self.terminated = true;
                None
            }
        }
    }

    /// Enqueues CLOSE_INPUT unconditionally and terminates the sequence
    /// immediately, even if the endpoint had more buffered data (§4.5).
    /// Unlike [`InputFacade::destroy`], this always touches the wire: a
    /// second call surfaces whatever rejection the native side returns
    /// for a redundant close (§4.2, §8 scenario 6), and the caller is
    /// expected to propagate it.
    pub fn close(&mut self) -> Result<(), ConnectionError> {
        self.terminated = true;
        self.destroyed.store(true, Ordering::Release);

        let (op, reply_rx) = QueueOp::new(QueueOpKind::CloseInput);
        self.op_tx.send(op).map_err(|_| ConnectionError::Closed)?;
        let outcome = reply_rx.recv().map_err(|_| ConnectionError::Closed)?;
        match outcome? {
            QueueReply::Unit => Ok(()),
            other => unreachable!("close produced {other:?}"),
        }
    }

    /// Stops polling immediately; no CLOSE_INPUT is sent. A read already
    /// in flight when this is called still completes normally. Called by
    /// `Connection::exit` so the input facade never touches the wire
    /// during teardown (§4.5, contrast with [`crate::OutputFacade::destroy`]).
    pub(crate) fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
    }
}

impl Iterator for InputFacade {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        self.next_chunk()
    }
}

fn poll_loop(
    op_tx: Sender<QueueOp>,
    data_tx: mpsc::SyncSender<InputEvent>,
    destroyed: Arc<AtomicBool>,
    chunk_size: u32,
    poll_interval: Duration,
) {
    loop {
        if destroyed.load(Ordering::Acquire) {
            return;
        }

        let (op, reply_rx) = QueueOp::new(QueueOpKind::ReadInput(chunk_size));
        if op_tx.send(op).is_err() {
            return;
        }
        let reply = match reply_rx.recv() {
            Ok(reply) => reply,
            Err(_) => return,
        };

        let outcome = match reply {
            Ok(QueueReply::ReadInput(outcome)) => outcome,
            Ok(other) => unreachable!("ReadInput produced {other:?}"),
            // A connection-level rejection (closed, transport error) ends
            // the sequence the same way a native-reported close does.
            Err(_) => ReadOutcome::Closed,
        };

        match outcome {
            ReadOutcome::Data(bytes) => {
                if !deliver(&data_tx, &destroyed, InputEvent::Data(bytes)) {
                    return;
                }
            }
            ReadOutcome::Empty => std::thread::sleep(poll_interval),
            ReadOutcome::Closed => {
                let _ = data_tx.try_send(InputEvent::Closed);
                return;
            }
        }
    }
}

/// Hands a chunk to the consumer, retrying against `destroyed` rather
/// than blocking forever so a slow or absent consumer cannot wedge
/// `destroy()`. The real backpressure signal is the channel staying full
/// (capacity 1): the poll loop will not issue the next READ_INPUT until
/// this returns.
fn deliver(data_tx: &mpsc::SyncSender<InputEvent>, destroyed: &Arc<AtomicBool>, event: InputEvent) -> bool {
    let mut pending = event;
    loop {
        if destroyed.load(Ordering::Acquire) {
            return false;
        }
        match data_tx.try_send(pending) {
            Ok(()) => return true,
            Err(TrySendError::Full(ev)) => {
                pending = ev;
                std::thread::sleep(BACKPRESSURE_RETRY);
            }
            Err(TrySendError::Disconnected(_)) => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{TcpListener, TcpStream};
    use process_proxy_wire::{envelope, framer, Opcode};

    fn facade(native: impl FnOnce(TcpStream) + Send + 'static) -> InputFacade {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            native(stream);
        });
        let stream = TcpStream::connect(addr).unwrap();
        let (op_tx, op_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let mut stream = stream;
            for op in op_rx.iter() {
                let reply = crate::queue::execute(&mut stream, &op.kind).unwrap();
                op.resolve(reply);
            }
        });
        InputFacade::new(op_tx)
    }

    #[test]
    fn polls_through_empty_responses_until_data_arrives() {
        let mut input = facade(|mut peer| {
            for _ in 0..3 {
                assert_eq!(framer::read_u8(&mut peer).unwrap(), Opcode::ReadInput.as_u8());
                framer::read_u32(&mut peer).unwrap();
                envelope::write_success(&mut peer).unwrap();
                framer::write_i32(&mut peer, 0).unwrap();
            }
            assert_eq!(framer::read_u8(&mut peer).unwrap(), Opcode::ReadInput.as_u8());
            framer::read_u32(&mut peer).unwrap();
            envelope::write_success(&mut peer).unwrap();
            framer::write_i32(&mut peer, 3).unwrap();
            framer::write_bytes(&mut peer, b"abc").unwrap();
        });

        assert_eq!(input.next_chunk(), Some(b"abc".to_vec()));
    }

    #[test]
    fn terminates_on_native_reported_close_and_stays_terminated() {
        let mut input = facade(|mut peer| {
            assert_eq!(framer::read_u8(&mut peer).unwrap(), Opcode::ReadInput.as_u8());
            framer::read_u32(&mut peer).unwrap();
            envelope::write_success(&mut peer).unwrap();
            framer::write_i32(&mut peer, -1).unwrap();
        });

        assert_eq!(input.next_chunk(), None);
        assert_eq!(input.next_chunk(), None, "sequence must stay exhausted");
    }

    #[test]
    fn explicit_close_enqueues_close_input_and_terminates() {
        let mut input = facade(|mut peer| {
            assert_eq!(framer::read_u8(&mut peer).unwrap(), Opcode::CloseInput.as_u8());
            envelope::write_success(&mut peer).unwrap();
        });

        input.close().unwrap();
        assert_eq!(input.next_chunk(), None);
    }
}
