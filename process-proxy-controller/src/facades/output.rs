//! The two writable stream facades: stdout and stderr (§4.6).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use crate::error::ConnectionError;
use crate::queue::{QueueOp, QueueOpKind, QueueReply};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Out,
    Err,
}

/// A writable sink forwarding buffers to the native endpoint one
/// WRITE_OUT/WRITE_ERR command at a time.
///
/// Not restartable: once [`OutputFacade::close`] has gone out once, every
/// later call is a local no-op (§4.6's "destruction is idempotent and
/// does nothing"). There is no separate internal/external close split
/// the way the input facade has one — a write sink has nothing useful to
/// do once the matching close command has been sent.
pub struct OutputFacade {
    op_tx: Sender<QueueOp>,
    kind: OutputKind,
    closed: AtomicBool,
}

impl OutputFacade {
    pub(crate) fn new(op_tx: Sender<QueueOp>, kind: OutputKind) -> Self {
        OutputFacade { op_tx, kind, closed: AtomicBool::new(false) }
    }

    /// Enqueues a WRITE_OUT/WRITE_ERR command and blocks until the
    /// corresponding response arrives.
    pub fn write(&self, buf: Vec<u8>) -> Result<(), ConnectionError> {
        let kind = match self.kind {
            OutputKind::Out => QueueOpKind::WriteOut(buf),
            OutputKind::Err => QueueOpKind::WriteErr(buf),
        };
        match submit(&self.op_tx, kind)? {
            QueueReply::Unit => Ok(()),
            other => unreachable!("write produced {other:?}"),
        }
    }

    /// Sends the matching close command the first time this is called;
    /// every subsequent call (from `Connection::exit` destroying the
    /// facade, or the consumer calling it again) resolves immediately
    /// without touching the socket.
    pub fn close(&self) -> Result<(), ConnectionError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let kind = match self.kind {
            OutputKind::Out => QueueOpKind::CloseOut,
            OutputKind::Err => QueueOpKind::CloseErr,
        };
        match submit(&self.op_tx, kind)? {
            QueueReply::Unit => Ok(()),
            other => unreachable!("close produced {other:?}"),
        }
    }

    /// Internal teardown used by `Connection::exit`; identical to
    /// [`OutputFacade::close`] for output facades (unlike the input
    /// facade, whose `destroy` never touches the wire).
    pub(crate) fn destroy(&self) {
        let _ = self.close();
    }
}

fn submit(op_tx: &Sender<QueueOp>, kind: QueueOpKind) -> Result<QueueReply, ConnectionError> {
    let (op, reply_rx) = QueueOp::new(kind);
    op_tx.send(op).map_err(|_| ConnectionError::Closed)?;
    reply_rx.recv().map_err(|_| ConnectionError::Closed)?
}
