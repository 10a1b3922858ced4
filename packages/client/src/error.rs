//! Error types for the chat client front-end.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The username is empty or only whitespace
    #[error("Username must not be empty")]
    InvalidUsername,

    /// The line editor could not be initialized
    #[error("Readline error: {0}")]
    Readline(String),

    /// The session closed without the user asking for it
    #[error("Session closed: {0}")]
    SessionClosed(String),
}
