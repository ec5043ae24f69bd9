use aalink_io::PromiseDropped;

/// Errors surfaced by transport operations.
///
/// Values are `Clone` so a single link failure can reject every queued
/// operation with the same cause.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The operation was cancelled by `stop()` or teardown.
    #[error("operation aborted")]
    Aborted,

    /// The peer closed the link.
    #[error("link closed by peer")]
    Closed,

    /// A socket operation failed. `code` is the OS errno when known.
    #[error("tcp transfer failed: {message}")]
    TcpTransfer { code: Option<i32>, message: String },

    /// A USB bulk transfer failed. `code` is the native libusb error.
    #[error("usb transfer failed (native code {code}): {message}")]
    UsbTransfer { code: i32, message: String },
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::TcpTransfer {
            code: err.raw_os_error(),
            message: err.to_string(),
        }
    }
}

impl From<PromiseDropped> for TransportError {
    fn from(_: PromiseDropped) -> Self {
        TransportError::Aborted
    }
}

impl TransportError {
    /// Whether this error reports cancellation rather than a link fault.
    pub fn is_aborted(&self) -> bool {
        matches!(self, TransportError::Aborted)
    }
}

pub type Result<T, E = TransportError> = std::result::Result<T, E>;
