//! Device handle abstraction over libusb.
//!
//! Everything the rest of the crate needs from a USB device goes through
//! [`UsbDeviceHandle`], so discovery, the query chain, and the transport
//! can run against scripted devices in tests. [`RusbDeviceHandle`] is the
//! real implementation over a `rusb` handle.

use std::time::Duration;

use rusb::UsbContext;

use crate::error::UsbError;

/// Direction bit of `bEndpointAddress`.
pub const ENDPOINT_DIRECTION_IN: u8 = 0x80;

/// One bulk endpoint of an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub address: u8,
    pub max_packet_size: u16,
}

impl EndpointDescriptor {
    /// Whether this endpoint carries device-to-host traffic.
    pub fn is_in(&self) -> bool {
        self.address & ENDPOINT_DIRECTION_IN != 0
    }
}

/// Operations aalink needs from an opened USB device.
///
/// Transfer methods are blocking; callers run them under `spawn_blocking`.
/// A timeout of zero means no timeout.
pub trait UsbDeviceHandle: Send + Sync + 'static {
    fn vendor_id(&self) -> u16;
    fn product_id(&self) -> u16;

    fn claim_interface(&mut self, interface: u8) -> Result<(), UsbError>;
    fn release_interface(&mut self, interface: u8) -> Result<(), UsbError>;

    /// Bulk endpoints of the given interface, default alternate setting.
    fn interface_endpoints(&self, interface: u8) -> Result<Vec<EndpointDescriptor>, UsbError>;

    fn read_bulk(&self, endpoint: u8, buf: &mut [u8], timeout: Duration)
        -> Result<usize, UsbError>;
    fn write_bulk(&self, endpoint: u8, buf: &[u8], timeout: Duration) -> Result<usize, UsbError>;

    fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, UsbError>;
    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        timeout: Duration,
    ) -> Result<usize, UsbError>;
}

/// Native libusb error code for a `rusb` error.
pub(crate) fn native_code(err: &rusb::Error) -> i32 {
    match err {
        rusb::Error::Io => -1,
        rusb::Error::InvalidParam => -2,
        rusb::Error::Access => -3,
        rusb::Error::NoDevice => -4,
        rusb::Error::NotFound => -5,
        rusb::Error::Busy => -6,
        rusb::Error::Timeout => -7,
        rusb::Error::Overflow => -8,
        rusb::Error::Pipe => -9,
        rusb::Error::Interrupted => -10,
        rusb::Error::NoMem => -11,
        rusb::Error::NotSupported => -12,
        _ => -99,
    }
}

fn transfer_error(err: rusb::Error) -> UsbError {
    UsbError::Transfer {
        code: native_code(&err),
        message: err.to_string(),
    }
}

/// Real device handle over libusb.
pub struct RusbDeviceHandle {
    handle: rusb::DeviceHandle<rusb::Context>,
    vendor_id: u16,
    product_id: u16,
}

impl RusbDeviceHandle {
    /// Open `device` and cache its vendor/product ids.
    pub fn open(device: &rusb::Device<rusb::Context>) -> Result<Self, UsbError> {
        let descriptor = device
            .device_descriptor()
            .map_err(|e| UsbError::ObtainDeviceDescriptor(e.to_string()))?;
        let handle = device.open().map_err(|e| UsbError::Open(e.to_string()))?;
        Ok(Self {
            handle,
            vendor_id: descriptor.vendor_id(),
            product_id: descriptor.product_id(),
        })
    }
}

impl UsbDeviceHandle for RusbDeviceHandle {
    fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    fn product_id(&self) -> u16 {
        self.product_id
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), UsbError> {
        self.handle
            .claim_interface(interface)
            .map_err(|e| UsbError::ClaimInterface {
                interface,
                message: e.to_string(),
            })
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), UsbError> {
        self.handle
            .release_interface(interface)
            .map_err(transfer_error)
    }

    fn interface_endpoints(&self, interface: u8) -> Result<Vec<EndpointDescriptor>, UsbError> {
        let device = self.handle.device();
        let config = device
            .active_config_descriptor()
            .map_err(|e| UsbError::ObtainConfigDescriptor(e.to_string()))?;
        let iface = config
            .interfaces()
            .find(|i| i.number() == interface)
            .ok_or(UsbError::EmptyInterfaces)?;
        let descriptor = iface
            .descriptors()
            .next()
            .ok_or(UsbError::InvalidConfigDescriptor)?;
        Ok(descriptor
            .endpoint_descriptors()
            .filter(|e| e.transfer_type() == rusb::TransferType::Bulk)
            .map(|e| EndpointDescriptor {
                address: e.address(),
                max_packet_size: e.max_packet_size(),
            })
            .collect())
    }

    fn read_bulk(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, UsbError> {
        self.handle
            .read_bulk(endpoint, buf, timeout)
            .map_err(transfer_error)
    }

    fn write_bulk(&self, endpoint: u8, buf: &[u8], timeout: Duration) -> Result<usize, UsbError> {
        self.handle
            .write_bulk(endpoint, buf, timeout)
            .map_err(transfer_error)
    }

    fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, UsbError> {
        self.handle
            .read_control(request_type, request, value, index, buf, timeout)
            .map_err(transfer_error)
    }

    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        timeout: Duration,
    ) -> Result<usize, UsbError> {
        self.handle
            .write_control(request_type, request, value, index, buf, timeout)
            .map_err(transfer_error)
    }
}

/// Run the libusb event loop until `done` reports true.
///
/// Hotplug callbacks fire from the thread driving this loop.
pub(crate) fn pump_events<F>(context: &rusb::Context, done: F)
where
    F: Fn() -> bool,
{
    while !done() {
        if context
            .handle_events(Some(Duration::from_millis(250)))
            .is_err()
        {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_bit_identifies_in_endpoints() {
        let ep_in = EndpointDescriptor {
            address: 0x81,
            max_packet_size: 512,
        };
        let ep_out = EndpointDescriptor {
            address: 0x01,
            max_packet_size: 512,
        };
        assert!(ep_in.is_in());
        assert!(!ep_out.is_in());
    }

    #[test]
    fn native_codes_match_libusb() {
        assert_eq!(native_code(&rusb::Error::NoDevice), -4);
        assert_eq!(native_code(&rusb::Error::Timeout), -7);
        assert_eq!(native_code(&rusb::Error::Other), -99);
    }
}
