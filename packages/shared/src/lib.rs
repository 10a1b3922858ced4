//! Utilities shared by the Agora chat packages.

pub mod logger;
pub mod time;
