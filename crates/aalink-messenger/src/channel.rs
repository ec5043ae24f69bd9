//! Per-service channel façade.

use aalink_wire::{ChannelId, EncryptionType, Message, MessageType};
use bytes::{BufMut, BytesMut};

use crate::error::{MessengerError, Result};
use crate::messenger::Messenger;

/// Binds one channel id to the messenger.
///
/// Service handlers (media, navigation, input, ...) each own a `Channel`
/// and speak to the phone exclusively through it; the multiplexing core
/// stays unaware of service semantics.
#[derive(Clone)]
pub struct Channel {
    id: ChannelId,
    messenger: Messenger,
}

impl Channel {
    pub fn new(id: ChannelId, messenger: Messenger) -> Self {
        Self { id, messenger }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Await the next message addressed to this channel.
    pub async fn receive(&self) -> Result<Message> {
        self.messenger.receive(self.id).await
    }

    /// Send a pre-built message; its channel id must match this channel.
    pub async fn send_message(&self, message: Message) -> Result<()> {
        if message.channel_id() != self.id {
            return Err(MessengerError::IntertwinedChannels {
                expected: self.id,
                actual: message.channel_id(),
            });
        }
        self.messenger.send(message).await
    }

    /// Build and send a message with the given id and body on this channel.
    pub async fn send(
        &self,
        encryption: EncryptionType,
        message_type: MessageType,
        message_id: u16,
        body: &[u8],
    ) -> Result<()> {
        let mut payload = BytesMut::with_capacity(2 + body.len());
        payload.put_u16(message_id);
        payload.extend_from_slice(body);
        self.send_message(Message::with_payload(
            self.id,
            encryption,
            message_type,
            &payload,
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aalink_transport::{IoLink, Transport};

    use super::*;
    use crate::cryptor::NullCryptor;
    use crate::instream::MessageInStream;
    use crate::outstream::MessageOutStream;

    fn linked_pair() -> (Messenger, Messenger) {
        let (a, b) = tokio::io::duplex(64 * 1024);
        (over(Transport::spawn(IoLink(a))), over(Transport::spawn(IoLink(b))))
    }

    fn over(transport: Transport) -> Messenger {
        let cryptor: Arc<NullCryptor> = Arc::new(NullCryptor);
        Messenger::spawn(
            MessageInStream::new(transport.clone(), cryptor.clone()),
            MessageOutStream::new(transport, cryptor),
        )
    }

    #[tokio::test]
    async fn send_prefixes_message_id() {
        let (near, far) = linked_pair();
        let media = Channel::new(ChannelId::MediaAudio, near);
        let peer = Channel::new(ChannelId::MediaAudio, far);

        media
            .send(
                EncryptionType::Plain,
                MessageType::Specific,
                0x8001,
                b"body",
            )
            .await
            .unwrap();

        let message = peer.receive().await.unwrap();
        assert_eq!(message.message_id(), Some(0x8001));
        assert_eq!(message.body(), b"body");
    }

    #[tokio::test]
    async fn send_message_rejects_wrong_channel() {
        let (near, _far) = linked_pair();
        let media = Channel::new(ChannelId::MediaAudio, near);

        let foreign = Message::with_payload(
            ChannelId::Video,
            EncryptionType::Plain,
            MessageType::Specific,
            b"misrouted",
        );
        let err = media.send_message(foreign).await.unwrap_err();
        assert!(matches!(
            err,
            MessengerError::IntertwinedChannels {
                expected: ChannelId::MediaAudio,
                actual: ChannelId::Video,
            }
        ));
    }

    #[tokio::test]
    async fn channels_share_one_messenger() {
        let (near, far) = linked_pair();
        let nav = Channel::new(ChannelId::Navigation, near.clone());
        let input = Channel::new(ChannelId::Input, near);

        nav.send(EncryptionType::Plain, MessageType::Specific, 1, b"turn")
            .await
            .unwrap();
        input
            .send(EncryptionType::Plain, MessageType::Specific, 2, b"tap")
            .await
            .unwrap();

        let nav_peer = Channel::new(ChannelId::Navigation, far.clone());
        let input_peer = Channel::new(ChannelId::Input, far);
        assert_eq!(input_peer.receive().await.unwrap().body(), b"tap");
        assert_eq!(nav_peer.receive().await.unwrap().body(), b"turn");
    }
}
