use aalink_io::PromiseDropped;
use aalink_transport::TransportError;

/// Errors surfaced by USB discovery and transfers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UsbError {
    /// The operation was cancelled.
    #[error("operation aborted")]
    Aborted,

    /// A discovery is already outstanding.
    #[error("a device discovery is already in progress")]
    OperationInProgress,

    /// The libusb context could not be created or enumerated.
    #[error("failed to list usb devices: {0}")]
    ListDevices(String),

    /// Opening a device failed.
    #[error("failed to open usb device: {0}")]
    Open(String),

    /// Reading the device descriptor failed.
    #[error("failed to read device descriptor: {0}")]
    ObtainDeviceDescriptor(String),

    /// Reading the active configuration descriptor failed.
    #[error("failed to read config descriptor: {0}")]
    ObtainConfigDescriptor(String),

    /// The configuration descriptor does not describe a usable device.
    #[error("invalid config descriptor")]
    InvalidConfigDescriptor,

    /// The device exposes no interfaces.
    #[error("device has no interfaces")]
    EmptyInterfaces,

    /// The claimed interface lacks the required bulk IN/OUT endpoint pair.
    #[error("interface lacks the required bulk endpoints")]
    InvalidDeviceEndpoints,

    /// Claiming the interface failed.
    #[error("failed to claim interface {interface}: {message}")]
    ClaimInterface { interface: u8, message: String },

    /// A control or bulk transfer failed. `code` is the native libusb
    /// error.
    #[error("usb transfer failed (native code {code}): {message}")]
    Transfer { code: i32, message: String },

    /// The device does not speak a usable AOAP protocol version.
    #[error("device reports accessory protocol version {0}")]
    AccessoryModeUnsupported(u16),

    /// This libusb build has no hotplug support.
    #[error("hotplug not supported by this libusb")]
    HotplugUnsupported,
}

impl From<PromiseDropped> for UsbError {
    fn from(_: PromiseDropped) -> Self {
        UsbError::Aborted
    }
}

impl From<UsbError> for TransportError {
    fn from(err: UsbError) -> Self {
        match err {
            UsbError::Aborted => TransportError::Aborted,
            UsbError::Transfer { code, message } => TransportError::UsbTransfer { code, message },
            other => TransportError::UsbTransfer {
                code: 0,
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T, E = UsbError> = std::result::Result<T, E>;
