//! Byte-level reliable duplex transport.
//!
//! A [`Transport`] turns a chunk-oriented physical link (TCP socket, USB
//! bulk endpoints, an in-memory pipe) into two ordered queues of exact-size
//! operations: `receive(n)` resolves with exactly `n` bytes, `send(bytes)`
//! resolves once the whole buffer is committed to the link. Arriving bytes
//! that exceed the front request stay buffered for subsequent requests, so
//! message assembly above this layer is independent of physical chunk
//! boundaries.

pub mod error;
pub mod link;
pub mod sink;
pub mod tcp;
pub mod transport;

pub use error::{Result, TransportError};
pub use link::{IoLink, Link, LinkReader, LinkWriter};
pub use sink::DataSink;
pub use tcp::{TcpTransport, DEFAULT_TCP_PORT};
pub use transport::Transport;
