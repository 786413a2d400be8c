use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, Notify};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("transport error: {0}")]
    Io(String),

    #[error("frame encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One bidirectional connection carrying text frames.
///
/// `read` blocks until the next inbound frame arrives and returns
/// [`TransportError::Closed`] once the peer is gone; `close` is idempotent and
/// unblocks any pending `read`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn read(&self) -> Result<String, TransportError>;

    async fn write(&self, text: String) -> Result<(), TransportError>;

    async fn close(&self);
}

/// Channel-backed transport for embedding the hub without a network socket.
///
/// `pair` returns the transport together with a [`TransportPeer`] playing the
/// remote side: frames the peer sends become `read` results, frames written to
/// the transport show up on `TransportPeer::recv`.
pub struct InProcessTransport {
    inbound: Mutex<mpsc::UnboundedReceiver<String>>,
    outbound: mpsc::UnboundedSender<String>,
    closed: AtomicBool,
    close_signal: Notify,
}

pub struct TransportPeer {
    inbound: mpsc::UnboundedSender<String>,
    outbound: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl InProcessTransport {
    pub fn pair() -> (Self, TransportPeer) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let transport = Self {
            inbound: Mutex::new(inbound_rx),
            outbound: outbound_tx,
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
        };
        let peer = TransportPeer {
            inbound: inbound_tx,
            outbound: Mutex::new(outbound_rx),
        };
        (transport, peer)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn read(&self) -> Result<String, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            _ = self.close_signal.notified() => Err(TransportError::Closed),
            frame = inbound.recv() => frame.ok_or(TransportError::Closed),
        }
    }

    async fn write(&self, text: String) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        self.outbound
            .send(text)
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        // notify_one leaves a permit, so a close landing before the reader's
        // select registers still unblocks it. read() is the only waiter.
        self.close_signal.notify_one();
    }
}

impl TransportPeer {
    /// Push a raw frame toward the hub, as if the remote client sent it.
    pub fn send_raw(&self, text: impl Into<String>) -> bool {
        self.inbound.send(text.into()).is_ok()
    }

    /// Next frame the hub wrote to this connection, or `None` once closed.
    pub async fn recv(&self) -> Option<String> {
        self.outbound.lock().await.recv().await
    }

    /// Simulate the remote side going away; the hub's pending read fails.
    pub fn hang_up(self) {
        drop(self);
    }
}
