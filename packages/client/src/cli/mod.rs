//! Interactive terminal front-end for the chat session.

mod formatter;
mod runner;
mod ui;

pub use formatter::MessageFormatter;
pub use runner::run_client;
