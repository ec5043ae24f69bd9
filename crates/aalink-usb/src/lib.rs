//! USB side of aalink: AOAP device discovery and the USB transport.
//!
//! A phone plugged into the head unit first enumerates as a regular MTP
//! device. The [`UsbHub`] watches for arrivals, switches phones into
//! accessory mode through the AOAP vendor query chain, and hands out an
//! [`AoapDevice`] with the two claimed bulk endpoints once the phone
//! re-enumerates. [`UsbTransport`] then drives those endpoints as an
//! aalink transport.
//!
//! All libusb access goes through the [`UsbDeviceHandle`] trait so device
//! behavior can be scripted in tests.

pub mod aoap;
pub mod endpoint;
pub mod error;
pub mod handle;
pub mod hub;
pub mod transport;

pub use aoap::{
    is_aoap_device, start_accessory_mode, AccessoryIdentity, AoapDevice, AOAP_PRODUCT_ID,
    AOAP_WITH_ADB_PRODUCT_ID, GOOGLE_VENDOR_ID,
};
pub use endpoint::UsbEndpoint;
pub use error::{Result, UsbError};
pub use handle::{EndpointDescriptor, RusbDeviceHandle, UsbDeviceHandle};
pub use hub::UsbHub;
pub use transport::UsbTransport;
