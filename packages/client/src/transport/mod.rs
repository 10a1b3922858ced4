//! Duplex transport abstraction.
//!
//! The channel connection is written once against [`Transport`]; the
//! WebSocket implementation is used in production and the in-memory one in
//! tests.

pub mod inmemory;
pub mod websocket;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

pub use inmemory::{InMemoryRemote, InMemoryTransport};
pub use websocket::WebSocketTransport;

/// Something that happened on an open transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One inbound text frame
    Frame(String),
    /// The peer closed the connection
    Closed,
    /// The connection failed
    Error(String),
    /// Establishing the connection failed after `open` had returned
    Failed(TransportError),
}

/// Receiving half handed out by [`Transport::open`].
///
/// Dropping it detaches every handler of that connection.
pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

/// Transport-level errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be established (refused, DNS, TLS, ...)
    #[error("Connection error: {0}")]
    Connect(String),

    /// The server answered the handshake with a non-upgrade HTTP status
    #[error("Handshake rejected with HTTP status {status}")]
    Rejected { status: u16 },

    /// Writing a frame failed
    #[error("Send error: {0}")]
    Send(String),

    /// No connection is open
    #[error("Transport is not open")]
    NotOpen,

    /// The connection was not established in time
    #[error("Timed out opening the connection")]
    Timeout,
}

/// A duplex channel to the chat server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + 'static {
    /// Open a new connection, closing any previous one.
    ///
    /// May return before the connection is established. Frames sent in the
    /// meantime are queued, and a failed handshake is then reported as
    /// [`TransportEvent::Failed`].
    async fn open(&mut self) -> Result<TransportEvents, TransportError>;

    /// Send one text frame on the open connection.
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Close the connection without waiting on the peer. Closing a closed
    /// transport is a no-op.
    async fn close(&mut self);
}
