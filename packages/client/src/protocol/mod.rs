//! Wire protocol: JSON frames and their decoding into typed events.

pub mod conversion;
pub mod dto;

pub use conversion::{InboundEvent, encode_outbound, parse_inbound};
pub use dto::{InboundFrame, MessageDto, OutboundFrame, ParticipantDto};
