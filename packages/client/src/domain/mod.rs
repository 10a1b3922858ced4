//! Domain layer: the pure parts of the messaging core.
//!
//! Nothing in here performs I/O or sleeps; time is passed in explicitly.

pub mod backoff;
pub mod message_log;
pub mod model;
pub mod roster;
pub mod timer;
pub mod typing;

pub use backoff::{Backoff, should_attempt_reconnect};
pub use message_log::{LogSnapshot, MessageLog};
pub use model::{ConnectionState, Identity, Message, MessageKind, Participant};
pub use roster::PresenceRoster;
pub use timer::Timer;
pub use typing::TypingDebouncer;
