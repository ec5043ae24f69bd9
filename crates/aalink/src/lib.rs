//! Head-unit side transport core for the Android Auto wire protocol.
//!
//! aalink delivers an ordered, reliable stream of logical messages between
//! a head unit and a phone over one physical link (USB accessory-mode bulk
//! endpoints or TCP), multiplexing up to 16 independent channels without
//! head-of-line blocking at the message level.
//!
//! # Crate Structure
//!
//! - [`io`] — Single-shot promise/completion primitives
//! - [`wire`] — Frame and message codec
//! - [`transport`] — Byte-level transport base, TCP variant
//! - [`messenger`] — Per-channel multiplexing, streams, channel façade
//! - [`usb`] — AOAP discovery and the USB transport (behind the `usb`
//!   feature)

/// Re-export promise primitives.
pub mod io {
    pub use aalink_io::*;
}

/// Re-export wire codec types.
pub mod wire {
    pub use aalink_wire::*;
}

/// Re-export transport types.
pub mod transport {
    pub use aalink_transport::*;
}

/// Re-export messenger types.
pub mod messenger {
    pub use aalink_messenger::*;
}

/// Re-export USB types (requires the `usb` feature).
#[cfg(feature = "usb")]
pub mod usb {
    pub use aalink_usb::*;
}
