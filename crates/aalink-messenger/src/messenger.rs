//! Per-channel send/receive rendezvous.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;

use aalink_io::{pending_or, promise, Completion, Promise};
use aalink_wire::{ChannelId, Message};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::MessengerError;
use crate::instream::MessageInStream;
use crate::outstream::MessageOutStream;

enum ReceiveCmd {
    Receive {
        channel: ChannelId,
        reply: Promise<Message, MessengerError>,
    },
    Stop,
}

enum SendCmd {
    Send {
        message: Message,
        reply: Promise<(), MessengerError>,
    },
    Stop,
}

/// Central message router.
///
/// Runs as two tasks: the receive task owns the in-stream plus the
/// per-channel waiter and holding queues; the send task owns the out-stream
/// plus the global send queue. Handles are cheap to clone.
///
/// Delivery is per-channel FIFO: a caller waiting on channel `c` gets the
/// oldest message of `c`, whether it arrived before or after the call.
/// Sends depart in enqueue order across all channels; there is no fairness
/// between channels on the send path.
#[derive(Clone)]
pub struct Messenger {
    receive_cmds: mpsc::UnboundedSender<ReceiveCmd>,
    send_cmds: mpsc::UnboundedSender<SendCmd>,
}

impl Messenger {
    /// Start the two router tasks over the given streams.
    pub fn spawn(in_stream: MessageInStream, out_stream: MessageOutStream) -> Self {
        let (receive_cmds, receive_rx) = mpsc::unbounded_channel();
        let (send_cmds, send_rx) = mpsc::unbounded_channel();
        tokio::spawn(receive_task(in_stream, receive_rx));
        tokio::spawn(send_task(out_stream, send_rx));
        Self {
            receive_cmds,
            send_cmds,
        }
    }

    /// Request the next message on `channel`.
    ///
    /// Resolves immediately if a message is already buffered for the
    /// channel; otherwise waits for one to arrive.
    pub fn enqueue_receive(&self, channel: ChannelId) -> Completion<Message, MessengerError> {
        let (reply, completion) = promise();
        let _ = self
            .receive_cmds
            .send(ReceiveCmd::Receive { channel, reply });
        completion
    }

    /// Await the next message on `channel`.
    pub async fn receive(&self, channel: ChannelId) -> Result<Message, MessengerError> {
        self.enqueue_receive(channel).await
    }

    /// Queue `message` for transmission.
    pub fn enqueue_send(&self, message: Message) -> Completion<(), MessengerError> {
        let (reply, completion) = promise();
        let _ = self.send_cmds.send(SendCmd::Send { message, reply });
        completion
    }

    /// Send `message` and await its transmission.
    pub async fn send(&self, message: Message) -> Result<(), MessengerError> {
        self.enqueue_send(message).await
    }

    /// Reject every pending receive and send with
    /// [`MessengerError::Stopped`] and drop buffered messages. Later calls
    /// reject immediately. The transport is stopped by the orchestrator,
    /// not here.
    pub fn stop(&self) {
        let _ = self.receive_cmds.send(ReceiveCmd::Stop);
        let _ = self.send_cmds.send(SendCmd::Stop);
    }
}

type ReadOutcome = (MessageInStream, Result<Message, MessengerError>);

async fn receive_task(in_stream: MessageInStream, mut commands: mpsc::UnboundedReceiver<ReceiveCmd>) {
    let mut waiters: HashMap<ChannelId, VecDeque<Promise<Message, MessengerError>>> =
        HashMap::new();
    let mut held: HashMap<ChannelId, VecDeque<Message>> = HashMap::new();
    let mut stream_slot = Some(in_stream);
    let mut read_fut: Option<Pin<Box<dyn Future<Output = ReadOutcome> + Send>>> = None;
    let mut dead: Option<MessengerError> = None;

    loop {
        // Keep exactly one read in flight while anyone is waiting. The
        // future is parked across loop iterations so that commands arriving
        // mid-read are still served.
        if read_fut.is_none()
            && dead.is_none()
            && waiters.values().any(|queue| !queue.is_empty())
        {
            if let Some(stream) = stream_slot.take() {
                read_fut = Some(Box::pin(stream.read_message_owned()));
            }
        }

        tokio::select! {
            biased;
            cmd = commands.recv() => match cmd {
                Some(ReceiveCmd::Receive { channel, reply }) => {
                    // Messages that arrived before the stream died are
                    // still delivered; only new waits fail.
                    if let Some(message) = pop_held(&mut held, channel) {
                        trace!(channel = %channel, "serving buffered message");
                        reply.resolve(message);
                    } else if let Some(cause) = &dead {
                        reply.reject(cause.clone());
                    } else {
                        waiters.entry(channel).or_default().push_back(reply);
                    }
                }
                Some(ReceiveCmd::Stop) | None => {
                    debug!("receive path stopping");
                    reject_waiters(&mut waiters, &MessengerError::Stopped);
                    held.clear();
                    break;
                }
            },
            (stream, result) = pending_or(&mut read_fut) => {
                read_fut = None;
                stream_slot = Some(stream);
                match result {
                    Ok(message) => {
                        let channel = message.channel_id();
                        match waiters.get_mut(&channel).and_then(VecDeque::pop_front) {
                            Some(reply) => {
                                trace!(channel = %channel, "delivering message to waiter");
                                reply.resolve(message);
                            }
                            None => {
                                trace!(channel = %channel, "holding message, no waiter");
                                held.entry(channel).or_default().push_back(message);
                            }
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "inbound stream failed");
                        reject_waiters(&mut waiters, &e);
                        dead = Some(e);
                    }
                }
            }
        }
    }
}

fn pop_held(held: &mut HashMap<ChannelId, VecDeque<Message>>, channel: ChannelId) -> Option<Message> {
    held.get_mut(&channel).and_then(VecDeque::pop_front)
}

fn reject_waiters(
    waiters: &mut HashMap<ChannelId, VecDeque<Promise<Message, MessengerError>>>,
    cause: &MessengerError,
) {
    for (_, queue) in waiters.drain() {
        for reply in queue {
            reply.reject(cause.clone());
        }
    }
}

type WriteOutcome = (MessageOutStream, Result<(), MessengerError>);

async fn send_task(out_stream: MessageOutStream, mut commands: mpsc::UnboundedReceiver<SendCmd>) {
    let mut queue: VecDeque<(Message, Promise<(), MessengerError>)> = VecDeque::new();
    let mut current: Option<Promise<(), MessengerError>> = None;
    let mut stream_slot = Some(out_stream);
    let mut write_fut: Option<Pin<Box<dyn Future<Output = WriteOutcome> + Send>>> = None;
    let mut dead: Option<MessengerError> = None;

    loop {
        if write_fut.is_none() && dead.is_none() {
            if let Some((message, reply)) = queue.pop_front() {
                if let Some(stream) = stream_slot.take() {
                    trace!(
                        channel = %message.channel_id(),
                        payload_len = message.payload_len(),
                        "streaming message"
                    );
                    current = Some(reply);
                    write_fut = Some(Box::pin(stream.write_message_owned(message)));
                }
            }
        }

        tokio::select! {
            biased;
            cmd = commands.recv() => match cmd {
                Some(SendCmd::Send { message, reply }) => {
                    if let Some(cause) = &dead {
                        reply.reject(cause.clone());
                    } else {
                        queue.push_back((message, reply));
                    }
                }
                Some(SendCmd::Stop) | None => {
                    debug!(pending = queue.len(), "send path stopping");
                    if let Some(reply) = current.take() {
                        reply.reject(MessengerError::Stopped);
                    }
                    for (_, reply) in queue.drain(..) {
                        reply.reject(MessengerError::Stopped);
                    }
                    break;
                }
            },
            (stream, result) = pending_or(&mut write_fut) => {
                write_fut = None;
                stream_slot = Some(stream);
                let reply = current.take();
                match result {
                    Ok(()) => {
                        if let Some(reply) = reply {
                            reply.resolve(());
                        }
                    }
                    // One failed write kills the whole send path: the link
                    // is assumed dead and queued sends cannot depart in
                    // order anymore.
                    Err(e) => {
                        debug!(error = %e, "outbound stream failed");
                        if let Some(reply) = reply {
                            reply.reject(e.clone());
                        }
                        for (_, reply) in queue.drain(..) {
                            reply.reject(e.clone());
                        }
                        dead = Some(e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use aalink_transport::{IoLink, Transport};
    use aalink_wire::{EncryptionType, MessageType};
    use bytes::Bytes;

    use super::*;
    use crate::cryptor::NullCryptor;

    /// Two messengers joined by an in-memory duplex link.
    fn linked_pair() -> (Messenger, Messenger) {
        let (a, b) = tokio::io::duplex(256 * 1024);
        (over_transport(Transport::spawn(IoLink(a))), over_transport(Transport::spawn(IoLink(b))))
    }

    fn over_transport(transport: Transport) -> Messenger {
        let cryptor: Arc<NullCryptor> = Arc::new(NullCryptor);
        Messenger::spawn(
            MessageInStream::new(transport.clone(), cryptor.clone()),
            MessageOutStream::new(transport, cryptor),
        )
    }

    fn plain(channel: ChannelId, payload: &[u8]) -> Message {
        Message::with_payload(
            channel,
            EncryptionType::Plain,
            MessageType::Specific,
            payload,
        )
    }

    #[tokio::test]
    async fn send_and_receive_roundtrip() {
        let (near, far) = linked_pair();

        near.send(plain(ChannelId::MediaAudio, b"hello")).await.unwrap();
        let message = far.receive(ChannelId::MediaAudio).await.unwrap();
        assert_eq!(message.payload(), b"hello");
    }

    #[tokio::test]
    async fn per_channel_order_is_preserved() {
        let (near, far) = linked_pair();

        for i in 0..5u8 {
            near.send(plain(ChannelId::Sensor, &[i])).await.unwrap();
        }
        for i in 0..5u8 {
            let message = far.receive(ChannelId::Sensor).await.unwrap();
            assert_eq!(message.payload(), &[i]);
        }
    }

    fn raw_frame(
        channel: ChannelId,
        frame_type: aalink_wire::FrameType,
        payload: &[u8],
        total: Option<u32>,
    ) -> Bytes {
        use aalink_wire::{encode_extended_size, encode_short_size, FrameHeader};
        let mut buf = bytes::BytesMut::new();
        FrameHeader {
            channel_id: channel,
            frame_type,
            encryption: EncryptionType::Plain,
            message_type: MessageType::Specific,
        }
        .encode_into(&mut buf);
        match total {
            Some(total) => encode_extended_size(payload.len(), total, &mut buf).unwrap(),
            None => encode_short_size(payload.len(), &mut buf).unwrap(),
        }
        buf.extend_from_slice(payload);
        buf.freeze()
    }

    #[tokio::test]
    async fn interleaved_channels_resolve_in_wire_order() {
        use aalink_wire::FrameType;

        let (a, b) = tokio::io::duplex(256 * 1024);
        let wire = Transport::spawn(IoLink(a));
        let far = over_transport(Transport::spawn(IoLink(b)));

        let video_waiter = far.enqueue_receive(ChannelId::Video);
        let input_waiter = far.enqueue_receive(ChannelId::Input);

        // An INPUT bulk frame spliced between the VIDEO fragments: the
        // INPUT waiter resolves first, VIDEO once its LAST frame lands.
        wire.send(raw_frame(
            ChannelId::Video,
            FrameType::First,
            &[0x42; 8192],
            Some(8192 + 8192 + 1024),
        ))
        .await
        .unwrap();
        wire.send(raw_frame(ChannelId::Input, FrameType::Bulk, b"tap", None))
            .await
            .unwrap();
        let input = input_waiter.await.unwrap();
        assert_eq!(input.payload(), b"tap");

        wire.send(raw_frame(
            ChannelId::Video,
            FrameType::Middle,
            &[0x43; 8192],
            None,
        ))
        .await
        .unwrap();
        wire.send(raw_frame(
            ChannelId::Video,
            FrameType::Last,
            &[0x44; 1024],
            None,
        ))
        .await
        .unwrap();

        let video = video_waiter.await.unwrap();
        assert_eq!(video.payload_len(), 8192 + 8192 + 1024);
        assert_eq!(&video.payload()[..8192], &[0x42; 8192]);
        assert_eq!(&video.payload()[16384..], &[0x44; 1024]);
    }

    #[tokio::test]
    async fn message_arriving_before_waiter_is_buffered() {
        let (near, far) = linked_pair();

        near.send(plain(ChannelId::MediaStatus, b"track changed"))
            .await
            .unwrap();

        // Give the frame time to arrive with no waiter registered; a read
        // must be triggered by the waiter, not by idle polling.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let message = far.receive(ChannelId::MediaStatus).await.unwrap();
        assert_eq!(message.payload(), b"track changed");
    }

    #[tokio::test]
    async fn buffered_message_resolves_new_waiter_while_reading_other_channel() {
        let (near, far) = linked_pair();

        // Waiter on VIDEO arms the read loop.
        let video_waiter = far.enqueue_receive(ChannelId::Video);

        // An INPUT message arrives with nobody waiting; it is held.
        near.send(plain(ChannelId::Input, b"press")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        // A late INPUT waiter is served from the holding queue even though
        // the read loop is still blocked waiting for VIDEO frames.
        let input = far.receive(ChannelId::Input).await.unwrap();
        assert_eq!(input.payload(), b"press");

        near.send(plain(ChannelId::Video, b"frame")).await.unwrap();
        assert_eq!(video_waiter.await.unwrap().payload(), b"frame");
    }

    #[tokio::test]
    async fn two_waiters_same_channel_resolve_fifo() {
        let (near, far) = linked_pair();

        let first = far.enqueue_receive(ChannelId::Control);
        let second = far.enqueue_receive(ChannelId::Control);

        near.send(plain(ChannelId::Control, b"one")).await.unwrap();
        near.send(plain(ChannelId::Control, b"two")).await.unwrap();

        assert_eq!(first.await.unwrap().payload(), b"one");
        assert_eq!(second.await.unwrap().payload(), b"two");
    }

    #[tokio::test]
    async fn stop_rejects_pending_and_later_operations() {
        let (_near, far) = linked_pair();

        let r1 = far.enqueue_receive(ChannelId::Control);
        let r2 = far.enqueue_receive(ChannelId::Video);
        tokio::time::sleep(Duration::from_millis(10)).await;

        far.stop();

        assert!(matches!(r1.await.unwrap_err(), MessengerError::Stopped));
        assert!(matches!(r2.await.unwrap_err(), MessengerError::Stopped));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(matches!(
            far.receive(ChannelId::Control).await.unwrap_err(),
            MessengerError::Stopped
        ));
        assert!(matches!(
            far.send(plain(ChannelId::Control, b"late")).await.unwrap_err(),
            MessengerError::Stopped
        ));
    }

    #[tokio::test]
    async fn stop_rejects_pending_send() {
        // A tiny duplex that nobody drains: the send stays in flight until
        // stop() rejects it.
        let (a, _b) = tokio::io::duplex(16);
        let near = over_transport(Transport::spawn(IoLink(a)));

        let sending = near.enqueue_send(plain(ChannelId::Video, &vec![0u8; 64 * 1024]));
        tokio::time::sleep(Duration::from_millis(10)).await;
        near.stop();

        assert!(matches!(
            sending.await.unwrap_err(),
            MessengerError::Stopped
        ));
    }

    #[tokio::test]
    async fn transport_stop_rejects_receive_waiters() {
        let (a, b) = tokio::io::duplex(1024);
        let transport = Transport::spawn(IoLink(a));
        let _peer = Transport::spawn(IoLink(b));
        let messenger = over_transport(transport.clone());

        let waiter = messenger.enqueue_receive(ChannelId::Control);
        tokio::time::sleep(Duration::from_millis(10)).await;
        transport.stop();

        assert!(waiter.await.unwrap_err().is_aborted());

        // The receive path is dead; later waiters reject immediately.
        assert!(messenger
            .receive(ChannelId::Control)
            .await
            .unwrap_err()
            .is_aborted());
    }

    #[tokio::test]
    async fn encrypted_roundtrip_through_symmetric_cryptor() {
        struct XorCryptor;

        impl crate::cryptor::Cryptor for XorCryptor {
            fn encrypt(&self, plaintext: &[u8]) -> Result<Bytes, crate::cryptor::CryptorError> {
                Ok(plaintext.iter().map(|b| b ^ 0x77).collect())
            }

            fn decrypt(&self, ciphertext: &[u8]) -> Result<Bytes, crate::cryptor::CryptorError> {
                Ok(ciphertext.iter().map(|b| b ^ 0x77).collect())
            }
        }

        let (a, b) = tokio::io::duplex(256 * 1024);
        let cryptor = Arc::new(XorCryptor);
        let near_transport = Transport::spawn(IoLink(a));
        let far_transport = Transport::spawn(IoLink(b));
        let near = Messenger::spawn(
            MessageInStream::new(near_transport.clone(), cryptor.clone()),
            MessageOutStream::new(near_transport, cryptor.clone()),
        );
        let far = Messenger::spawn(
            MessageInStream::new(far_transport.clone(), cryptor.clone()),
            MessageOutStream::new(far_transport, cryptor),
        );

        let payload = (0u8..=255).cycle().take(50_000).collect::<Vec<_>>();
        near.send(Message::with_payload(
            ChannelId::SpeechAudio,
            EncryptionType::Encrypted,
            MessageType::Specific,
            &payload,
        ))
        .await
        .unwrap();

        let message = far.receive(ChannelId::SpeechAudio).await.unwrap();
        assert_eq!(message.encryption(), EncryptionType::Encrypted);
        assert_eq!(message.payload(), payload.as_slice());
    }

    #[tokio::test]
    async fn sends_depart_in_enqueue_order() {
        let (near, far) = linked_pair();

        let s1 = near.enqueue_send(plain(ChannelId::Control, b"first"));
        let s2 = near.enqueue_send(plain(ChannelId::Input, b"second"));
        let s3 = near.enqueue_send(plain(ChannelId::Control, b"third"));
        s1.await.unwrap();
        s2.await.unwrap();
        s3.await.unwrap();

        assert_eq!(
            far.receive(ChannelId::Control).await.unwrap().payload(),
            b"first"
        );
        assert_eq!(
            far.receive(ChannelId::Input).await.unwrap().payload(),
            b"second"
        );
        assert_eq!(
            far.receive(ChannelId::Control).await.unwrap().payload(),
            b"third"
        );
    }
}
