//! Message multiplexing over a single transport.
//!
//! The [`Messenger`] is the rendezvous point between service channels and
//! the framed byte stream: inbound frames are assembled into messages and
//! demultiplexed by channel id into per-channel queues; outbound messages
//! are serialized into frames through one ordered send path. Frames of
//! different channels may interleave on the wire; a long fragmented video
//! message does not block a short input message spliced between its frames.

pub mod channel;
pub mod cryptor;
pub mod error;
pub mod instream;
pub mod messenger;
pub mod outstream;

pub use channel::Channel;
pub use cryptor::{Cryptor, CryptorError, NullCryptor};
pub use error::{MessengerError, Result};
pub use instream::{InStreamConfig, MessageInStream};
pub use messenger::Messenger;
pub use outstream::{MessageOutStream, OutStreamConfig};
