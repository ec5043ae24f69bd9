//! USB transport variant over a claimed accessory device.

use std::time::Duration;

use aalink_transport::{Link, LinkReader, LinkWriter, Transport, TransportError};
use async_trait::async_trait;

use crate::aoap::AoapDevice;
use crate::endpoint::UsbEndpoint;
use crate::handle::UsbDeviceHandle;

/// Per-chunk timeout for bulk OUT transfers.
pub const USB_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Bulk IN transfers wait as long as it takes (libusb treats zero as no
/// timeout).
pub const USB_RECEIVE_TIMEOUT: Duration = Duration::ZERO;

const READ_TRANSFER_SIZE: usize = 16 * 1024;

/// Factory for transports over accessory-mode devices.
pub struct UsbTransport;

impl UsbTransport {
    /// Start a transport over the device's bulk endpoint pair.
    pub fn spawn<H: UsbDeviceHandle>(device: AoapDevice<H>) -> Transport {
        Transport::spawn(UsbLink { device })
    }
}

/// [`Link`] over an accessory device's bulk endpoints.
pub struct UsbLink<H: UsbDeviceHandle> {
    pub device: AoapDevice<H>,
}

pub struct UsbLinkReader<H: UsbDeviceHandle> {
    endpoint: UsbEndpoint<H>,
}

pub struct UsbLinkWriter<H: UsbDeviceHandle> {
    endpoint: UsbEndpoint<H>,
}

impl<H: UsbDeviceHandle> Link for UsbLink<H> {
    type Reader = UsbLinkReader<H>;
    type Writer = UsbLinkWriter<H>;

    fn into_split(self) -> (Self::Reader, Self::Writer) {
        (
            UsbLinkReader {
                endpoint: self.device.endpoint_in(),
            },
            UsbLinkWriter {
                endpoint: self.device.endpoint_out(),
            },
        )
    }
}

#[async_trait]
impl<H: UsbDeviceHandle> LinkReader for UsbLinkReader<H> {
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let len = buf.len().min(READ_TRANSFER_SIZE);
        let data = self
            .endpoint
            .bulk_read(len, USB_RECEIVE_TIMEOUT)
            .await
            .map_err(TransportError::from)?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}

#[async_trait]
impl<H: UsbDeviceHandle> LinkWriter for UsbLinkWriter<H> {
    async fn write_chunk(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
        // Large payloads go out one bulk transfer at a time, capped at the
        // endpoint's max packet size; the base transport loops until every
        // byte is committed.
        let len = buf.len().min(self.endpoint.max_packet_size());
        self.endpoint
            .bulk_write(buf[..len].to_vec(), USB_SEND_TIMEOUT)
            .await
            .map_err(TransportError::from)
    }
}
