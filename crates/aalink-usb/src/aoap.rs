//! AOAP device identification, the accessory-mode query chain, and the
//! claimed device wrapper.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::endpoint::UsbEndpoint;
use crate::error::UsbError;
use crate::handle::{EndpointDescriptor, UsbDeviceHandle};

/// Google's USB vendor id.
pub const GOOGLE_VENDOR_ID: u16 = 0x18D1;

/// Product id of a device in accessory mode.
pub const AOAP_PRODUCT_ID: u16 = 0x2D00;

/// Product id of a device in accessory mode with ADB enabled.
pub const AOAP_WITH_ADB_PRODUCT_ID: u16 = 0x2D01;

/// Vendor control request: probe the accessory protocol version.
pub const ACC_REQ_GET_PROTOCOL: u8 = 51;

/// Vendor control request: send one identity string.
pub const ACC_REQ_SEND_STRING: u8 = 52;

/// Vendor control request: switch into accessory mode.
pub const ACC_REQ_START: u8 = 53;

const STRING_MANUFACTURER: u16 = 0;
const STRING_MODEL: u16 = 1;
const STRING_DESCRIPTION: u16 = 2;
const STRING_VERSION: u16 = 3;
const STRING_URI: u16 = 4;
const STRING_SERIAL: u16 = 5;

const REQUEST_TYPE_VENDOR_IN: u8 = 0xC0;
const REQUEST_TYPE_VENDOR_OUT: u8 = 0x40;

const QUERY_TIMEOUT: Duration = Duration::from_secs(2);

const AOAP_INTERFACE: u8 = 0;

/// Whether the ids describe a device already in accessory mode.
pub fn is_aoap_device(vendor_id: u16, product_id: u16) -> bool {
    vendor_id == GOOGLE_VENDOR_ID
        && matches!(product_id, AOAP_PRODUCT_ID | AOAP_WITH_ADB_PRODUCT_ID)
}

/// Identity strings the head unit presents during the query chain.
#[derive(Debug, Clone)]
pub struct AccessoryIdentity {
    pub manufacturer: String,
    pub model: String,
    pub description: String,
    pub version: String,
    pub uri: String,
    pub serial: String,
}

impl Default for AccessoryIdentity {
    fn default() -> Self {
        Self {
            manufacturer: "Android".into(),
            model: "Android Auto".into(),
            description: "Android Auto head unit".into(),
            version: "1.0".into(),
            uri: String::new(),
            serial: String::new(),
        }
    }
}

/// Run the AOAP query chain on a freshly-arrived device.
///
/// Probes the protocol version, sends the identity strings, then requests
/// the switch into accessory mode. The device re-enumerates afterwards;
/// the hub picks it up on its second arrival. Returns the protocol version
/// the device reported.
pub fn start_accessory_mode<H: UsbDeviceHandle>(
    handle: &H,
    identity: &AccessoryIdentity,
) -> Result<u16, UsbError> {
    let mut version_buf = [0u8; 2];
    handle.read_control(
        REQUEST_TYPE_VENDOR_IN,
        ACC_REQ_GET_PROTOCOL,
        0,
        0,
        &mut version_buf,
        QUERY_TIMEOUT,
    )?;
    let version = u16::from_le_bytes(version_buf);
    if version == 0 {
        return Err(UsbError::AccessoryModeUnsupported(version));
    }
    debug!(version, "device speaks the accessory protocol");

    let strings = [
        (STRING_MANUFACTURER, identity.manufacturer.as_str()),
        (STRING_MODEL, identity.model.as_str()),
        (STRING_DESCRIPTION, identity.description.as_str()),
        (STRING_VERSION, identity.version.as_str()),
        (STRING_URI, identity.uri.as_str()),
        (STRING_SERIAL, identity.serial.as_str()),
    ];
    for (index, value) in strings {
        let mut data = value.as_bytes().to_vec();
        data.push(0);
        handle.write_control(
            REQUEST_TYPE_VENDOR_OUT,
            ACC_REQ_SEND_STRING,
            0,
            index,
            &data,
            QUERY_TIMEOUT,
        )?;
    }

    handle.write_control(
        REQUEST_TYPE_VENDOR_OUT,
        ACC_REQ_START,
        0,
        0,
        &[],
        QUERY_TIMEOUT,
    )?;
    debug!("accessory mode start requested");
    Ok(version)
}

/// A device in accessory mode with its interface claimed and its bulk
/// endpoint pair located.
#[derive(Debug)]
pub struct AoapDevice<H: UsbDeviceHandle> {
    handle: Arc<H>,
    interface: u8,
    endpoint_in: EndpointDescriptor,
    endpoint_out: EndpointDescriptor,
}

impl<H: UsbDeviceHandle> AoapDevice<H> {
    /// Claim the accessory interface and label its bulk endpoints by the
    /// direction bit.
    pub fn claim(mut handle: H) -> Result<Self, UsbError> {
        let endpoints = handle.interface_endpoints(AOAP_INTERFACE)?;
        let endpoint_in = endpoints
            .iter()
            .find(|e| e.is_in())
            .copied()
            .ok_or(UsbError::InvalidDeviceEndpoints)?;
        let endpoint_out = endpoints
            .iter()
            .find(|e| !e.is_in())
            .copied()
            .ok_or(UsbError::InvalidDeviceEndpoints)?;

        handle.claim_interface(AOAP_INTERFACE)?;
        debug!(
            endpoint_in = endpoint_in.address,
            endpoint_out = endpoint_out.address,
            "accessory interface claimed"
        );

        Ok(Self {
            handle: Arc::new(handle),
            interface: AOAP_INTERFACE,
            endpoint_in,
            endpoint_out,
        })
    }

    /// The device-to-host bulk endpoint.
    pub fn endpoint_in(&self) -> UsbEndpoint<H> {
        UsbEndpoint::new(Arc::clone(&self.handle), self.endpoint_in)
    }

    /// The host-to-device bulk endpoint.
    pub fn endpoint_out(&self) -> UsbEndpoint<H> {
        UsbEndpoint::new(Arc::clone(&self.handle), self.endpoint_out)
    }
}

impl<H: UsbDeviceHandle> Drop for AoapDevice<H> {
    fn drop(&mut self) {
        // Release requires exclusive access. Endpoints still in flight keep
        // the handle alive; closing the handle tears the claim down with it.
        if let Some(handle) = Arc::get_mut(&mut self.handle) {
            let _ = handle.release_interface(self.interface);
        }
    }
}
