//! In-process transport over `tokio::io::duplex`.
//!
//! Every `connect` creates a duplex pipe, keeps the client half and hands the
//! server half to the paired [`MemoryAcceptor`]. The pipe capacity bounds how
//! many bytes a single write may accept, so a small capacity reproduces short
//! writes deterministically.
//!
//! # Example
//!
//! ```
//! use betwire_client::transport::{Connector, MemoryConnector};
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (connector, mut acceptor) = MemoryConnector::pair(16);
//!
//! let mut client = connector.connect().await.unwrap();
//! let mut server = acceptor.accept().await.unwrap();
//!
//! client.write_all(b"PONG").await.unwrap();
//! let mut buf = [0u8; 4];
//! server.read_exact(&mut buf).await.unwrap();
//! assert_eq!(&buf, b"PONG");
//! # }
//! ```

use std::io;

use tokio::io::{duplex, DuplexStream};
use tokio::sync::mpsc;

use super::Connector;

/// Client side of an in-process transport.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    max_buf_size: usize,
    tx: mpsc::UnboundedSender<DuplexStream>,
}

/// Server side of an in-process transport; yields one stream per connect.
#[derive(Debug)]
pub struct MemoryAcceptor {
    rx: mpsc::UnboundedReceiver<DuplexStream>,
}

impl MemoryConnector {
    /// Create a connector/acceptor pair whose pipes buffer at most
    /// `max_buf_size` bytes in each direction.
    pub fn pair(max_buf_size: usize) -> (Self, MemoryAcceptor) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { max_buf_size, tx }, MemoryAcceptor { rx })
    }
}

impl Connector for MemoryConnector {
    type Stream = DuplexStream;

    async fn connect(&self) -> io::Result<DuplexStream> {
        let (client, server) = duplex(self.max_buf_size);
        self.tx.send(server).map_err(|_| {
            io::Error::new(io::ErrorKind::ConnectionRefused, "memory acceptor dropped")
        })?;
        Ok(client)
    }

    fn peer(&self) -> &str {
        "memory"
    }
}

impl MemoryAcceptor {
    /// Wait for the next connection. `None` once every connector is dropped.
    pub async fn accept(&mut self) -> Option<DuplexStream> {
        self.rx.recv().await
    }
}
