//! Inbound frame-to-message assembly.

use std::collections::HashMap;
use std::sync::Arc;

use aalink_transport::Transport;
use aalink_wire::{
    decode_extended_size, decode_short_size, ChannelId, FrameHeader, FrameType, Message,
    EncryptionType, FRAME_HEADER_LEN, FRAME_SIZE_EXTENDED_LEN, FRAME_SIZE_SHORT_LEN,
};
use tracing::{debug, trace};

use crate::cryptor::Cryptor;
use crate::error::{MessengerError, Result};

/// Behavior switches for inbound assembly.
#[derive(Debug, Clone, Copy)]
pub struct InStreamConfig {
    /// Reject a MIDDLE/LAST frame whose channel has no message in
    /// progress. When disabled, a fresh message is started from that frame,
    /// which matches how lenient peers behave in the field.
    pub strict_continuation: bool,
}

impl Default for InStreamConfig {
    fn default() -> Self {
        Self {
            strict_continuation: false,
        }
    }
}

/// Reads frames off the transport and assembles them into messages.
///
/// Each channel has at most one message in progress; frames of different
/// channels may interleave freely. [`read_message`](Self::read_message)
/// returns messages in the order their final (BULK/LAST) frame appears on
/// the wire, regardless of which channel they belong to.
pub struct MessageInStream {
    transport: Transport,
    cryptor: Arc<dyn Cryptor>,
    assemblers: HashMap<ChannelId, Message>,
    config: InStreamConfig,
}

impl MessageInStream {
    pub fn new(transport: Transport, cryptor: Arc<dyn Cryptor>) -> Self {
        Self::with_config(transport, cryptor, InStreamConfig::default())
    }

    pub fn with_config(
        transport: Transport,
        cryptor: Arc<dyn Cryptor>,
        config: InStreamConfig,
    ) -> Self {
        Self {
            transport,
            cryptor,
            assemblers: HashMap::new(),
            config,
        }
    }

    /// Read frames until some message completes and return it.
    ///
    /// Holding `&mut self` means only one read can be in flight. The future
    /// must be driven to completion before issuing another read; dropping
    /// it mid-frame loses the partially-fetched frame.
    pub async fn read_message(&mut self) -> Result<Message> {
        loop {
            if let Some(message) = self.read_frame().await? {
                return Ok(message);
            }
        }
    }

    /// Read one frame; returns the assembled message if the frame completed
    /// one.
    async fn read_frame(&mut self) -> Result<Option<Message>> {
        let header_bytes = self.transport.receive(FRAME_HEADER_LEN).await?;
        let header = FrameHeader::decode(&header_bytes)?;

        let (payload_len, total_len) = if header.frame_type == FrameType::First {
            let size_bytes = self.transport.receive(FRAME_SIZE_EXTENDED_LEN).await?;
            let (len, total) = decode_extended_size(&size_bytes)?;
            (len, Some(total))
        } else {
            let size_bytes = self.transport.receive(FRAME_SIZE_SHORT_LEN).await?;
            (decode_short_size(&size_bytes)?, None)
        };

        trace!(
            channel = %header.channel_id,
            frame_type = ?header.frame_type,
            payload_len,
            "frame header received"
        );

        let payload = self.transport.receive(payload_len as usize).await?;
        self.accept_frame(header, total_len, &payload)
    }

    fn accept_frame(
        &mut self,
        header: FrameHeader,
        total_len: Option<u32>,
        payload: &[u8],
    ) -> Result<Option<Message>> {
        let channel = header.channel_id;

        match header.frame_type {
            FrameType::First | FrameType::Bulk => {
                if self.assemblers.remove(&channel).is_some() {
                    debug!(channel = %channel, "discarding stale partial message");
                }
                let mut message =
                    Message::new(channel, header.encryption, header.message_type);
                if let Some(total) = total_len {
                    message.reserve(total as usize);
                }
                self.assemblers.insert(channel, message);
            }
            FrameType::Middle | FrameType::Last => {
                if !self.assemblers.contains_key(&channel) {
                    if self.config.strict_continuation {
                        return Err(MessengerError::UnexpectedContinuation { channel });
                    }
                    debug!(channel = %channel, "continuation without a started message");
                    self.assemblers.insert(
                        channel,
                        Message::new(channel, header.encryption, header.message_type),
                    );
                }
            }
        }

        let chunk = if header.encryption == EncryptionType::Encrypted {
            match self.cryptor.decrypt(payload) {
                Ok(plaintext) => plaintext,
                Err(e) => {
                    // The message cannot be recovered; no partial delivery.
                    self.assemblers.remove(&channel);
                    return Err(e.into());
                }
            }
        } else {
            bytes::Bytes::copy_from_slice(payload)
        };

        if let Some(message) = self.assemblers.get_mut(&channel) {
            message.append(&chunk);
        }

        if header.frame_type.finishes_message() {
            Ok(self.assemblers.remove(&channel))
        } else {
            Ok(None)
        }
    }

    /// `read_message` with ownership threading, for callers that park the
    /// future in a select loop.
    pub(crate) async fn read_message_owned(mut self) -> (Self, Result<Message>) {
        let result = self.read_message().await;
        (self, result)
    }
}
