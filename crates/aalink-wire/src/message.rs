//! Assembled logical messages.

use bytes::{Bytes, BytesMut};

use crate::channel::ChannelId;
use crate::frame::{EncryptionType, MessageType};

/// One application-level unit delivered to or from a service.
///
/// A message is built up frame by frame on the receive side and split into
/// frames on the send side. All frames of one message carry the same
/// channel id, encryption mode and message type. The first two payload
/// bytes are a big-endian message id; the remainder is service-defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    channel_id: ChannelId,
    encryption: EncryptionType,
    message_type: MessageType,
    payload: BytesMut,
}

impl Message {
    /// Create an empty message.
    pub fn new(
        channel_id: ChannelId,
        encryption: EncryptionType,
        message_type: MessageType,
    ) -> Self {
        Self {
            channel_id,
            encryption,
            message_type,
            payload: BytesMut::new(),
        }
    }

    /// Create a message with an initial payload.
    pub fn with_payload(
        channel_id: ChannelId,
        encryption: EncryptionType,
        message_type: MessageType,
        payload: &[u8],
    ) -> Self {
        let mut message = Self::new(channel_id, encryption, message_type);
        message.append(payload);
        message
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn encryption(&self) -> EncryptionType {
        self.encryption
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Pre-size the payload buffer, used when the total assembled length is
    /// known from a FIRST frame.
    pub fn reserve(&mut self, additional: usize) {
        self.payload.reserve(additional);
    }

    /// Append one frame's worth of payload.
    pub fn append(&mut self, chunk: &[u8]) {
        self.payload.extend_from_slice(chunk);
    }

    /// The big-endian message id in the first two payload bytes, if present.
    pub fn message_id(&self) -> Option<u16> {
        if self.payload.len() < 2 {
            return None;
        }
        Some(u16::from_be_bytes([self.payload[0], self.payload[1]]))
    }

    /// Payload bytes following the message id.
    pub fn body(&self) -> &[u8] {
        if self.payload.len() < 2 {
            &[]
        } else {
            &self.payload[2..]
        }
    }

    /// Consume the message and take its payload.
    pub fn into_payload(self) -> Bytes {
        self.payload.freeze()
    }
}
