//! TCP transport.
//!
//! # Example
//!
//! ```ignore
//! use betwire_client::transport::{Connector, TcpConnector};
//!
//! let connector = TcpConnector::new("server:12345");
//! let stream = connector.connect().await?;
//! ```

use tokio::net::TcpStream;

use super::Connector;

/// Connects to a fixed `host:port` over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Get the peer address.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self) -> std::io::Result<TcpStream> {
        let stream = TcpStream::connect(&self.addr).await?;
        // Chunks are already sized by the caller; do not let Nagle merge them.
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn peer(&self) -> &str {
        &self.addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_and_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            socket.read_exact(&mut buf).await.unwrap();
            socket.write_all(&buf).await.unwrap();
        });

        let connector = TcpConnector::new(addr.clone());
        assert_eq!(connector.peer(), addr);

        let mut stream = connector.connect().await.unwrap();
        stream.write_all(b"PONG").await.unwrap();
        let mut reply = [0u8; 4];
        stream.read_exact(&mut reply).await.unwrap();
        assert_eq!(&reply, b"PONG");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = TcpConnector::new(addr).connect().await;
        assert!(result.is_err());
    }
}
