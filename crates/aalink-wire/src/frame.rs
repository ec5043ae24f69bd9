//! Frame header and length-field codec.
//!
//! Wire format of one frame:
//!
//! ```text
//! ┌────────────┬───────────┬───────────────┬───────────────────┬─────────────┐
//! │ Channel    │ Flags     │ Payload len   │ Total message len │ Payload     │
//! │ (1B)       │ (1B)      │ (2B BE)       │ (4B BE, FIRST     │ (len bytes) │
//! │            │           │               │  frames only)     │             │
//! └────────────┴───────────┴───────────────┴───────────────────┴─────────────┘
//! ```
//!
//! Flags: bit 3 encryption, bit 2 message type, bits 1..0 frame type.
//! The header is fetched as one 2-byte unit, then the length field as a
//! 2-byte unit (6 bytes for FIRST frames, which append the total assembled
//! message length so the receiver can pre-size its buffer).

use bytes::{BufMut, BytesMut};

use crate::channel::ChannelId;
use crate::error::WireError;

/// Frame header length on the wire (channel byte + flags byte).
pub const FRAME_HEADER_LEN: usize = 2;

/// Length-field size for MIDDLE/LAST/BULK frames.
pub const FRAME_SIZE_SHORT_LEN: usize = 2;

/// Length-field size for FIRST frames (short length + u32 total).
pub const FRAME_SIZE_EXTENDED_LEN: usize = 6;

/// Largest plaintext payload carried by a single frame (one TLS record).
pub const MAX_FRAME_PAYLOAD_SIZE: usize = 0x4000;

const ENCRYPTION_FLAG: u8 = 1 << 3;
const MESSAGE_TYPE_FLAG: u8 = 1 << 2;
const FRAME_TYPE_MASK: u8 = 0b11;

/// Fragmentation marker, two bits of the flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    /// Continuation of a fragmented message.
    Middle = 0,
    /// Starts a fragmented message; carries the extended total length.
    First = 1,
    /// Final frame of a fragmented message.
    Last = 2,
    /// Entire message in one frame.
    Bulk = 3,
}

impl FrameType {
    fn from_flags(flags: u8) -> Self {
        match flags & FRAME_TYPE_MASK {
            0 => FrameType::Middle,
            1 => FrameType::First,
            2 => FrameType::Last,
            _ => FrameType::Bulk,
        }
    }

    /// Whether a frame of this type completes its message.
    pub fn finishes_message(&self) -> bool {
        matches!(self, FrameType::Bulk | FrameType::Last)
    }
}

/// Whether the frame payload is a TLS record or plaintext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionType {
    Plain,
    Encrypted,
}

/// Whether the payload's leading message id is service-specific or a
/// control-channel id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Specific,
    Control,
}

/// Decoded 2-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub channel_id: ChannelId,
    pub frame_type: FrameType,
    pub encryption: EncryptionType,
    pub message_type: MessageType,
}

impl FrameHeader {
    /// Append the encoded header to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) {
        let mut flags = self.frame_type as u8;
        if self.encryption == EncryptionType::Encrypted {
            flags |= ENCRYPTION_FLAG;
        }
        if self.message_type == MessageType::Control {
            flags |= MESSAGE_TYPE_FLAG;
        }
        dst.put_u8(self.channel_id as u8);
        dst.put_u8(flags);
    }

    /// Decode a header from the first two bytes of `src`.
    pub fn decode(src: &[u8]) -> Result<Self, WireError> {
        if src.len() < FRAME_HEADER_LEN {
            return Err(WireError::Truncated {
                need: FRAME_HEADER_LEN,
                got: src.len(),
            });
        }
        let channel_id = ChannelId::from_u8(src[0])?;
        let flags = src[1];
        Ok(FrameHeader {
            channel_id,
            frame_type: FrameType::from_flags(flags),
            encryption: if flags & ENCRYPTION_FLAG != 0 {
                EncryptionType::Encrypted
            } else {
                EncryptionType::Plain
            },
            message_type: if flags & MESSAGE_TYPE_FLAG != 0 {
                MessageType::Control
            } else {
                MessageType::Specific
            },
        })
    }
}

/// Append a short length field (u16 BE) to `dst`.
pub fn encode_short_size(len: usize, dst: &mut BytesMut) -> Result<(), WireError> {
    if len > u16::MAX as usize {
        return Err(WireError::PayloadTooLarge {
            size: len,
            max: u16::MAX as usize,
        });
    }
    dst.put_u16(len as u16);
    Ok(())
}

/// Append an extended length field (u16 BE frame length + u32 BE total
/// message length) to `dst`.
pub fn encode_extended_size(len: usize, total: u32, dst: &mut BytesMut) -> Result<(), WireError> {
    encode_short_size(len, dst)?;
    dst.put_u32(total);
    Ok(())
}

/// Decode a short length field.
pub fn decode_short_size(src: &[u8]) -> Result<u16, WireError> {
    if src.len() < FRAME_SIZE_SHORT_LEN {
        return Err(WireError::Truncated {
            need: FRAME_SIZE_SHORT_LEN,
            got: src.len(),
        });
    }
    Ok(u16::from_be_bytes([src[0], src[1]]))
}

/// Decode an extended length field; returns `(frame_len, total_len)`.
pub fn decode_extended_size(src: &[u8]) -> Result<(u16, u32), WireError> {
    if src.len() < FRAME_SIZE_EXTENDED_LEN {
        return Err(WireError::Truncated {
            need: FRAME_SIZE_EXTENDED_LEN,
            got: src.len(),
        });
    }
    let len = u16::from_be_bytes([src[0], src[1]]);
    let total = u32::from_be_bytes([src[2], src[3], src[4], src[5]]);
    Ok((len, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip_all_combinations() {
        for frame_type in [
            FrameType::Middle,
            FrameType::First,
            FrameType::Last,
            FrameType::Bulk,
        ] {
            for encryption in [EncryptionType::Plain, EncryptionType::Encrypted] {
                for message_type in [MessageType::Specific, MessageType::Control] {
                    let header = FrameHeader {
                        channel_id: ChannelId::Video,
                        frame_type,
                        encryption,
                        message_type,
                    };
                    let mut buf = BytesMut::new();
                    header.encode_into(&mut buf);
                    assert_eq!(buf.len(), FRAME_HEADER_LEN);
                    assert_eq!(FrameHeader::decode(&buf).unwrap(), header);
                }
            }
        }
    }

    #[test]
    fn flags_bit_layout() {
        let header = FrameHeader {
            channel_id: ChannelId::MediaAudio,
            frame_type: FrameType::Bulk,
            encryption: EncryptionType::Encrypted,
            message_type: MessageType::Control,
        };
        let mut buf = BytesMut::new();
        header.encode_into(&mut buf);
        assert_eq!(buf[0], 4);
        assert_eq!(buf[1], 0b0000_1111);
    }

    #[test]
    fn plain_specific_bulk_flags() {
        let header = FrameHeader {
            channel_id: ChannelId::MediaAudio,
            frame_type: FrameType::Bulk,
            encryption: EncryptionType::Plain,
            message_type: MessageType::Specific,
        };
        let mut buf = BytesMut::new();
        header.encode_into(&mut buf);
        assert_eq!(&buf[..], &[0x04, 0x03]);
    }

    #[test]
    fn header_rejects_short_input() {
        assert!(matches!(
            FrameHeader::decode(&[0x01]),
            Err(WireError::Truncated { need: 2, got: 1 })
        ));
    }

    #[test]
    fn header_rejects_unknown_channel() {
        assert!(matches!(
            FrameHeader::decode(&[0x7F, 0x03]),
            Err(WireError::InvalidChannelId(0x7F))
        ));
    }

    #[test]
    fn short_size_roundtrip() {
        let mut buf = BytesMut::new();
        encode_short_size(0x1234, &mut buf).unwrap();
        assert_eq!(&buf[..], &[0x12, 0x34]);
        assert_eq!(decode_short_size(&buf).unwrap(), 0x1234);
    }

    #[test]
    fn extended_size_roundtrip() {
        let mut buf = BytesMut::new();
        encode_extended_size(0x0400, 17000, &mut buf).unwrap();
        assert_eq!(buf.len(), FRAME_SIZE_EXTENDED_LEN);
        let (len, total) = decode_extended_size(&buf).unwrap();
        assert_eq!(len, 0x0400);
        assert_eq!(total, 17000);
    }

    #[test]
    fn size_encoding_rejects_oversized_payload() {
        let mut buf = BytesMut::new();
        let err = encode_short_size(usize::from(u16::MAX) + 1, &mut buf).unwrap_err();
        assert!(matches!(err, WireError::PayloadTooLarge { .. }));
    }

    #[test]
    fn finishes_message_marks_terminal_frames() {
        assert!(FrameType::Bulk.finishes_message());
        assert!(FrameType::Last.finishes_message());
        assert!(!FrameType::First.finishes_message());
        assert!(!FrameType::Middle.finishes_message());
    }
}
