//! WebSocket transport built on `tokio-tungstenite`.
//!
//! Each `open` spawns one connection task that performs the handshake, then
//! forwards inbound text frames and writes queued outbound frames. `open`
//! itself returns immediately, so a server that never answers the upgrade
//! cannot stall the caller.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol::Message},
};

use super::{Transport, TransportError, TransportEvent, TransportEvents};

/// Upper bound for the closing handshake of a locally closed connection
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket client transport.
///
/// The URL must already carry whatever credentials the server expects.
pub struct WebSocketTransport {
    url: String,
    outgoing: Option<mpsc::UnboundedSender<Message>>,
    /// Dropping this stops the connection task
    shutdown: Option<oneshot::Sender<()>>,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            outgoing: None,
            shutdown: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn map_connect_error(error: tungstenite::Error) -> TransportError {
    match error {
        tungstenite::Error::Http(response) => TransportError::Rejected {
            status: response.status().as_u16(),
        },
        other => TransportError::Connect(other.to_string()),
    }
}

/// Handshake, then shuttle frames until either side closes.
async fn connection_loop(
    url: String,
    mut outgoing: mpsc::UnboundedReceiver<Message>,
    mut shutdown: oneshot::Receiver<()>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let connected = tokio::select! {
        result = connect_async(url.as_str()) => result,
        _ = &mut shutdown => {
            tracing::debug!("Abandoned connection attempt to {}", url);
            return;
        }
    };
    let ws_stream = match connected {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            let error = map_connect_error(e);
            tracing::warn!("Failed to connect to {}: {}", url, error);
            let _ = events.send(TransportEvent::Failed(error));
            return;
        }
    };
    tracing::info!("Connected to {}", url);

    let (mut sink, mut stream) = ws_stream.split();
    loop {
        tokio::select! {
            message = stream.next() => {
                let event = match message {
                    Some(Ok(Message::Text(text))) => TransportEvent::Frame(text.as_str().to_owned()),
                    Some(Ok(Message::Binary(data))) => {
                        tracing::debug!("Ignoring {} bytes of binary data", data.len());
                        continue;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!("Server closed the connection");
                        let _ = events.send(TransportEvent::Closed);
                        return;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket read error: {}", e);
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        return;
                    }
                };
                if events.send(event).is_err() {
                    // Receiver dropped: the connection was detached locally
                    break;
                }
            }
            frame = outgoing.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = sink.send(frame).await {
                        tracing::warn!("WebSocket write error: {}", e);
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        return;
                    }
                }
                None => break,
            },
            _ = &mut shutdown => break,
        }
    }

    match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
        Ok(Ok(())) => tracing::debug!("Closed connection to {}", url),
        Ok(Err(e)) => tracing::debug!("Error while closing WebSocket: {}", e),
        Err(_) => tracing::debug!("Gave up on closing handshake with {}", url),
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&mut self) -> Result<TransportEvents, TransportError> {
        self.close().await;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(connection_loop(
            self.url.clone(),
            outgoing_rx,
            shutdown_rx,
            events_tx,
        ));
        self.outgoing = Some(outgoing_tx);
        self.shutdown = Some(shutdown_tx);

        Ok(events_rx)
    }

    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        let outgoing = self.outgoing.as_ref().ok_or(TransportError::NotOpen)?;
        outgoing
            .send(Message::Text(frame.into()))
            .map_err(|_| TransportError::Send("connection task has stopped".to_string()))
    }

    async fn close(&mut self) {
        self.outgoing = None;
        self.shutdown = None;
    }
}
