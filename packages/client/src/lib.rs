//! Client side of the Agora community chat.
//!
//! The core is [`ChatSession`]: it connects to one channel, keeps a
//! presence roster and a message log in sync with the server, reconnects
//! with exponential backoff when the link drops, and debounces the local
//! typing indicator. Observers are exposed as `tokio::sync::watch`
//! receivers.
//!
//! ```no_run
//! use agora_client::{ChatConfig, ChatSession, Identity, WebSocketTransport};
//!
//! # async fn demo() {
//! let session = ChatSession::new(
//!     WebSocketTransport::new("ws://127.0.0.1:8080/ws"),
//!     ChatConfig::default(),
//! );
//! session.connect(Identity::new("alice")).await;
//! session.send("hello").await;
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod domain;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

pub use config::ChatConfig;
pub use domain::{ConnectionState, Identity, LogSnapshot, Message, MessageKind, Participant};
pub use error::ClientError;
pub use session::ChatSession;
pub use transport::{Transport, TransportError, WebSocketTransport};
