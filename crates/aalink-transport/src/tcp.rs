//! TCP transport variant.
//!
//! Head units use this for wireless projection: a single connection carries
//! all channels. `TCP_NODELAY` is set so small control frames are not held
//! back by Nagle batching.

use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::error::Result;
use crate::link::IoLink;
use crate::transport::Transport;

/// Port the phone listens on for wireless projection.
pub const DEFAULT_TCP_PORT: u16 = 5277;

/// Factory for transports over TCP connections.
pub struct TcpTransport;

impl TcpTransport {
    /// Connect to `addr` and start a transport over the connection.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Transport> {
        let stream = TcpStream::connect(addr).await?;
        Self::from_stream(stream)
    }

    /// Start a transport over an already-established connection.
    pub fn from_stream(stream: TcpStream) -> Result<Transport> {
        stream.set_nodelay(true)?;
        debug!(peer = ?stream.peer_addr().ok(), "tcp link established");
        Ok(Transport::spawn(IoLink(stream)))
    }
}
