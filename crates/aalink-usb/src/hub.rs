//! Hotplug-driven AOAP device discovery.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use aalink_io::{promise, Completion, Promise};
use rusb::{Context, Device, Hotplug, HotplugBuilder, Registration};
use tracing::{debug, info};

use crate::aoap::{is_aoap_device, start_accessory_mode, AccessoryIdentity, AoapDevice};
use crate::error::UsbError;
use crate::handle::{pump_events, RusbDeviceHandle};

type Discovery = Promise<AoapDevice<RusbDeviceHandle>, UsbError>;

struct HubState {
    pending: Option<Discovery>,
    registration: Option<Registration<Context>>,
    stopped: bool,
}

/// Watches USB arrivals and produces claimed accessory-mode devices.
///
/// Phones already in accessory mode resolve the discovery immediately.
/// Anything else goes through the query chain; the phone drops off the bus,
/// re-enumerates with the accessory product id, and its second arrival
/// completes the rendezvous.
pub struct UsbHub {
    context: Context,
    identity: AccessoryIdentity,
    state: Arc<Mutex<HubState>>,
}

impl UsbHub {
    pub fn new(identity: AccessoryIdentity) -> Result<Self, UsbError> {
        let context = Context::new().map_err(|e| UsbError::ListDevices(e.to_string()))?;
        Ok(Self {
            context,
            identity,
            state: Arc::new(Mutex::new(HubState {
                pending: None,
                registration: None,
                stopped: false,
            })),
        })
    }

    /// Begin discovery. Resolves with the first device that reaches
    /// accessory mode; at most one discovery may be outstanding.
    pub fn start(&self) -> Completion<AoapDevice<RusbDeviceHandle>, UsbError> {
        let (reply, completion) = promise();

        if !rusb::has_hotplug() {
            reply.reject(UsbError::HotplugUnsupported);
            return completion;
        }

        let mut state = lock(&self.state);
        if state.stopped {
            reply.reject(UsbError::Aborted);
            return completion;
        }
        if state.pending.is_some() {
            reply.reject(UsbError::OperationInProgress);
            return completion;
        }
        state.pending = Some(reply);

        if state.registration.is_none() {
            let handler = HotplugHandler {
                state: Arc::clone(&self.state),
                identity: self.identity.clone(),
            };
            match HotplugBuilder::new()
                .enumerate(true)
                .register(&self.context, Box::new(handler))
            {
                Ok(registration) => {
                    state.registration = Some(registration);
                    info!("watching for usb device arrivals");
                }
                Err(e) => {
                    if let Some(reply) = state.pending.take() {
                        reply.reject(UsbError::ListDevices(e.to_string()));
                    }
                    return completion;
                }
            }
        }
        drop(state);

        let context = self.context.clone();
        let state = Arc::clone(&self.state);
        std::thread::spawn(move || {
            pump_events(&context, || {
                let state = lock(&state);
                state.stopped || state.pending.is_none()
            });
        });

        completion
    }

    /// Reject the outstanding discovery with [`UsbError::Aborted`] and stop
    /// watching arrivals.
    pub fn cancel(&self) {
        let mut state = lock(&self.state);
        state.stopped = true;
        state.registration = None;
        if let Some(reply) = state.pending.take() {
            reply.reject(UsbError::Aborted);
        }
    }
}

fn lock<'a>(state: &'a Arc<Mutex<HubState>>) -> MutexGuard<'a, HubState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

struct HotplugHandler {
    state: Arc<Mutex<HubState>>,
    identity: AccessoryIdentity,
}

impl Hotplug<Context> for HotplugHandler {
    fn device_arrived(&mut self, device: Device<Context>) {
        if lock(&self.state).pending.is_none() {
            return;
        }

        let handle = match RusbDeviceHandle::open(&device) {
            Ok(handle) => handle,
            Err(e) => {
                debug!(error = %e, "ignoring unopenable device");
                return;
            }
        };

        use crate::handle::UsbDeviceHandle as _;
        let (vendor_id, product_id) = (handle.vendor_id(), handle.product_id());
        debug!(vendor_id, product_id, "usb device arrived");

        if is_aoap_device(vendor_id, product_id) {
            match AoapDevice::claim(handle) {
                Ok(device) => {
                    if let Some(reply) = lock(&self.state).pending.take() {
                        info!("accessory-mode device ready");
                        reply.resolve(device);
                    }
                }
                Err(e) => debug!(error = %e, "failed to claim accessory device"),
            }
        } else {
            // Control transfers cannot run on the event thread; the switch
            // happens off to the side and the re-enumeration arrives here
            // again with the accessory product id.
            let identity = self.identity.clone();
            std::thread::spawn(move || {
                if let Err(e) = start_accessory_mode(&handle, &identity) {
                    debug!(error = %e, "accessory query chain failed");
                }
            });
        }
    }

    fn device_left(&mut self, _device: Device<Context>) {}
}
