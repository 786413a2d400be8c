use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{Mutex, Notify};

use crate::hub::{Transport, TransportError};

/// [`Transport`] over an upgraded axum WebSocket.
///
/// The socket is split so broadcasts can write while the engine blocks on
/// read; the sink sits behind its own lock, held only for one frame write.
pub struct WsTransport {
    sender: Mutex<SplitSink<WebSocket, Message>>,
    receiver: Mutex<SplitStream<WebSocket>>,
    closed: AtomicBool,
    close_signal: Notify,
}

impl WsTransport {
    pub fn new(socket: WebSocket) -> Self {
        let (sender, receiver) = socket.split();
        Self {
            sender: Mutex::new(sender),
            receiver: Mutex::new(receiver),
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn next_text(receiver: &mut SplitStream<WebSocket>) -> Result<String, TransportError> {
        loop {
            match receiver.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.to_string()),
                Some(Ok(Message::Close(_))) | None => return Err(TransportError::Closed),
                // Binary frames carry nothing for the hub; axum answers pings.
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(TransportError::Io(e.to_string())),
            }
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn read(&self) -> Result<String, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let mut receiver = self.receiver.lock().await;
        tokio::select! {
            _ = self.close_signal.notified() => Err(TransportError::Closed),
            result = Self::next_text(&mut receiver) => result,
        }
    }

    async fn write(&self, text: String) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let mut sender = self.sender.lock().await;
        sender
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // notify_one leaves a permit, so a close landing before the reader's
        // select registers still unblocks it. read() is the only waiter.
        self.close_signal.notify_one();

        let mut sender = self.sender.lock().await;
        let _ = sender.close().await;
    }
}
