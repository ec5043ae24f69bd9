//! Wire-level framing for the Android Auto protocol.
//!
//! Every unit on the physical link is a frame: a 2-byte header (channel id
//! plus flags), a length field, and a payload. Messages larger than one
//! frame are fragmented into FIRST/MIDDLE/LAST frames; frames of different
//! channels may interleave at frame granularity.

pub mod channel;
pub mod error;
pub mod frame;
pub mod message;

pub use channel::ChannelId;
pub use error::{Result, WireError};
pub use frame::{
    decode_extended_size, decode_short_size, encode_extended_size, encode_short_size,
    EncryptionType, FrameHeader, FrameType, MessageType, FRAME_HEADER_LEN,
    FRAME_SIZE_EXTENDED_LEN, FRAME_SIZE_SHORT_LEN, MAX_FRAME_PAYLOAD_SIZE,
};
pub use message::Message;
