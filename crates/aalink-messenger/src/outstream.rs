//! Outbound message-to-frame serialization.

use std::sync::Arc;

use aalink_transport::Transport;
use aalink_wire::{
    encode_extended_size, encode_short_size, EncryptionType, FrameHeader, FrameType, Message,
    FRAME_HEADER_LEN, FRAME_SIZE_EXTENDED_LEN, MAX_FRAME_PAYLOAD_SIZE,
};
use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::cryptor::Cryptor;
use crate::error::Result;

/// Behavior switches for outbound serialization.
#[derive(Debug, Clone, Copy)]
pub struct OutStreamConfig {
    /// Largest plaintext payload per frame. Encrypted frames grow by the
    /// TLS record overhead on top of this.
    pub max_frame_payload: usize,
}

impl Default for OutStreamConfig {
    fn default() -> Self {
        Self {
            max_frame_payload: MAX_FRAME_PAYLOAD_SIZE,
        }
    }
}

/// Serializes messages into frames and writes them through the transport.
pub struct MessageOutStream {
    transport: Transport,
    cryptor: Arc<dyn Cryptor>,
    config: OutStreamConfig,
}

impl MessageOutStream {
    pub fn new(transport: Transport, cryptor: Arc<dyn Cryptor>) -> Self {
        Self::with_config(transport, cryptor, OutStreamConfig::default())
    }

    pub fn with_config(
        transport: Transport,
        cryptor: Arc<dyn Cryptor>,
        config: OutStreamConfig,
    ) -> Self {
        Self {
            transport,
            cryptor,
            config,
        }
    }

    /// Write `message` as one BULK frame, or a FIRST/MIDDLE*/LAST sequence
    /// when it exceeds the per-frame payload limit.
    ///
    /// Resolves only after the final frame's transport write completes; the
    /// first failed write stops emission.
    pub async fn write_message(&self, message: &Message) -> Result<()> {
        let payload = message.payload();
        let limit = self.config.max_frame_payload;

        if payload.len() <= limit {
            return self
                .write_frame(message, FrameType::Bulk, payload, None)
                .await;
        }

        let total = payload.len() as u32;
        let mut offset = 0usize;
        while offset < payload.len() {
            let end = (offset + limit).min(payload.len());
            let chunk = &payload[offset..end];
            let frame_type = if offset == 0 {
                FrameType::First
            } else if end == payload.len() {
                FrameType::Last
            } else {
                FrameType::Middle
            };
            let total_len = (frame_type == FrameType::First).then_some(total);
            self.write_frame(message, frame_type, chunk, total_len)
                .await?;
            offset = end;
        }
        Ok(())
    }

    async fn write_frame(
        &self,
        message: &Message,
        frame_type: FrameType,
        chunk: &[u8],
        total_len: Option<u32>,
    ) -> Result<()> {
        let body: Bytes = if message.encryption() == EncryptionType::Encrypted {
            self.cryptor.encrypt(chunk)?
        } else {
            Bytes::copy_from_slice(chunk)
        };

        let mut frame =
            BytesMut::with_capacity(FRAME_HEADER_LEN + FRAME_SIZE_EXTENDED_LEN + body.len());
        FrameHeader {
            channel_id: message.channel_id(),
            frame_type,
            encryption: message.encryption(),
            message_type: message.message_type(),
        }
        .encode_into(&mut frame);
        match total_len {
            Some(total) => encode_extended_size(body.len(), total, &mut frame)?,
            None => encode_short_size(body.len(), &mut frame)?,
        }
        frame.extend_from_slice(&body);

        trace!(
            channel = %message.channel_id(),
            frame_type = ?frame_type,
            body_len = body.len(),
            "sending frame"
        );
        self.transport.send(frame.freeze()).await?;
        Ok(())
    }

    /// `write_message` with ownership threading, for callers that park the
    /// future in a select loop.
    pub(crate) async fn write_message_owned(self, message: Message) -> (Self, Result<()>) {
        let result = self.write_message(&message).await;
        (self, result)
    }
}
