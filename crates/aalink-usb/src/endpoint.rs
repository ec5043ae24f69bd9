//! Async wrapper around one bulk endpoint.

use std::sync::Arc;
use std::time::Duration;

use crate::error::UsbError;
use crate::handle::{EndpointDescriptor, UsbDeviceHandle};

/// One bulk endpoint of a claimed device.
///
/// Transfers run on the blocking pool; operations on a single endpoint are
/// serialized by its owner (each transport direction owns one endpoint).
pub struct UsbEndpoint<H> {
    handle: Arc<H>,
    descriptor: EndpointDescriptor,
}

impl<H: UsbDeviceHandle> UsbEndpoint<H> {
    pub fn new(handle: Arc<H>, descriptor: EndpointDescriptor) -> Self {
        Self { handle, descriptor }
    }

    pub fn address(&self) -> u8 {
        self.descriptor.address
    }

    pub fn max_packet_size(&self) -> usize {
        self.descriptor.max_packet_size as usize
    }

    /// One bulk IN transfer of up to `len` bytes.
    pub async fn bulk_read(&self, len: usize, timeout: Duration) -> Result<Vec<u8>, UsbError> {
        let handle = Arc::clone(&self.handle);
        let address = self.descriptor.address;
        tokio::task::spawn_blocking(move || {
            let mut buf = vec![0u8; len];
            let n = handle.read_bulk(address, &mut buf, timeout)?;
            buf.truncate(n);
            Ok(buf)
        })
        .await
        .map_err(|_| UsbError::Aborted)?
    }

    /// One bulk OUT transfer; returns the number of bytes the device
    /// accepted.
    pub async fn bulk_write(&self, data: Vec<u8>, timeout: Duration) -> Result<usize, UsbError> {
        let handle = Arc::clone(&self.handle);
        let address = self.descriptor.address;
        tokio::task::spawn_blocking(move || handle.write_bulk(address, &data, timeout))
            .await
            .map_err(|_| UsbError::Aborted)?
    }
}
