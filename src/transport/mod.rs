//! Transport module - connection establishment.
//!
//! The client never holds a socket type directly; it asks a [`Connector`]
//! for a fresh stream before each exchange:
//! - [`TcpConnector`] - TCP to the configured server address
//! - [`MemoryConnector`] - in-process duplex pipes, paired with a
//!   [`MemoryAcceptor`] playing the server side

mod memory;
mod tcp;

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};

pub use memory::{MemoryAcceptor, MemoryConnector};
pub use tcp::TcpConnector;

/// Opens byte-stream connections to the peer.
pub trait Connector: Send + Sync {
    /// Connected stream type.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Open a new connection.
    fn connect(&self) -> impl Future<Output = std::io::Result<Self::Stream>> + Send;

    /// Human-readable peer description for logs and errors.
    fn peer(&self) -> &str;
}
