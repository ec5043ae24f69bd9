use aalink_io::PromiseDropped;
use aalink_transport::TransportError;
use aalink_wire::{ChannelId, WireError};

use crate::cryptor::CryptorError;

/// Errors surfaced by messenger operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MessengerError {
    /// The messenger was stopped; the operation was cancelled.
    #[error("messenger stopped")]
    Stopped,

    /// The underlying transport failed or was stopped.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame on the wire could not be decoded.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Encrypting or decrypting a frame payload failed.
    #[error(transparent)]
    Crypto(#[from] CryptorError),

    /// A MIDDLE or LAST frame arrived with no message in progress on its
    /// channel (strict continuation mode only).
    #[error("continuation frame on channel {channel} without a started message")]
    UnexpectedContinuation { channel: ChannelId },

    /// A message was handed to a channel façade bound to a different id.
    #[error("message for channel {actual} sent through channel {expected}")]
    IntertwinedChannels {
        expected: ChannelId,
        actual: ChannelId,
    },
}

impl From<PromiseDropped> for MessengerError {
    fn from(_: PromiseDropped) -> Self {
        MessengerError::Stopped
    }
}

impl MessengerError {
    /// Whether this error reports cancellation rather than a fault.
    pub fn is_aborted(&self) -> bool {
        matches!(
            self,
            MessengerError::Stopped | MessengerError::Transport(TransportError::Aborted)
        )
    }
}

pub type Result<T, E = MessengerError> = std::result::Result<T, E>;
