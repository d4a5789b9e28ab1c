//! Client builder and framed transport client.
//!
//! The [`ClientBuilder`] configures the connector and cancellation token.
//! The [`Client`] owns at most one connection and runs the protocol steps:
//! 1. Open a connection
//! 2. Send bets, batches or control messages in `packet_limit` chunks
//! 3. Listen for a response terminated by the ACK token
//! 4. Close, or poll for winners until a terminal answer
//!
//! Every blocking step races the client's [`CancellationToken`]; connects and
//! response reads are also bounded by deadlines.
//!
//! # Example
//!
//! ```ignore
//! use betwire_client::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::builder(ClientConfig::from_env()?).build()?;
//!
//!     client.open_connection().await?;
//!     client.send_bet_batch(&bets).await?;
//!     client.listen_response().await?;
//!     client.send_fin().await?;
//!     client.close_connection().await?;
//!
//!     let winners = client.get_winners_for_agency(1).await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::io;
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::codec::Bet;
use crate::config::ClientConfig;
use crate::error::{BetwireError, Result};
use crate::protocol::{
    batch_message, bet_message, fin_message, winners_query, ResponseBuffer, ServerResponse,
};
use crate::transport::{Connector, TcpConnector};
use crate::writer::{write_chunked, WriteStats};

/// Builder for configuring and creating a [`Client`].
pub struct ClientBuilder<C = TcpConnector> {
    config: ClientConfig,
    connector: C,
    cancel: CancellationToken,
}

impl ClientBuilder<TcpConnector> {
    /// Create a builder that connects over TCP to `config.server_address`.
    pub fn new(config: ClientConfig) -> Self {
        let connector = TcpConnector::new(config.server_address.clone());
        Self {
            config,
            connector,
            cancel: CancellationToken::new(),
        }
    }
}

impl<C> ClientBuilder<C> {
    /// Use a different transport.
    pub fn connector<D: Connector>(self, connector: D) -> ClientBuilder<D> {
        ClientBuilder {
            config: self.config,
            connector,
            cancel: self.cancel,
        }
    }

    /// Share a cancellation token with the caller (e.g. wired to SIGTERM).
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Set the maximum bytes per write chunk and read buffer size.
    pub fn packet_limit(mut self, limit: usize) -> Self {
        self.config.packet_limit = limit;
        self
    }

    /// Set the deadline for reading a whole response.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the maximum number of winners queries before giving up.
    pub fn max_poll_attempts(mut self, attempts: u32) -> Self {
        self.config.max_poll_attempts = attempts;
        self
    }

    /// Set the jitter range slept between winners queries.
    pub fn poll_backoff(mut self, min: Duration, max: Duration) -> Self {
        self.config.poll_backoff_min_ms = min.as_millis() as u64;
        self.config.poll_backoff_max_ms = max.as_millis() as u64;
        self
    }

    /// Validate the configuration and build the client.
    pub fn build(self) -> Result<Client<C>>
    where
        C: Connector,
    {
        self.config.validate()?;
        Ok(Client {
            config: self.config,
            connector: self.connector,
            conn: None,
            cancel: self.cancel,
        })
    }
}

/// Result of a winners polling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnersPoll {
    /// Winner document numbers.
    pub winners: Vec<String>,
    /// Number of winners queries sent.
    pub attempts: u32,
    /// Number of backoff sleeps taken after a PROCESSING answer.
    pub backoffs: u32,
}

/// States of the winners polling loop. `Failed` is any `Err` leaving the loop.
#[derive(Debug)]
enum PollState {
    Requesting,
    AwaitingResponse,
    Backoff,
    Done(Vec<String>),
}

/// Framed transport client.
///
/// Owns at most one connection at a time. All methods take `&mut self`, so a
/// connection is never used from two call sites at once.
pub struct Client<C: Connector = TcpConnector> {
    config: ClientConfig,
    connector: C,
    conn: Option<C::Stream>,
    cancel: CancellationToken,
}

impl Client<TcpConnector> {
    /// Create a new client builder.
    pub fn builder(config: ClientConfig) -> ClientBuilder<TcpConnector> {
        ClientBuilder::new(config)
    }
}

impl<C: Connector> Client<C> {
    /// Get the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Token that aborts any in-flight step when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether a connection is currently open.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Open a new connection, dropping any previous one.
    ///
    /// # Errors
    ///
    /// [`BetwireError::TransportConnect`] if the peer is unreachable or the
    /// connect deadline passes.
    pub async fn open_connection(&mut self) -> Result<()> {
        self.conn = None;

        let cancel = self.cancel.clone();
        let deadline = self.config.connect_timeout();
        let peer = self.connector.peer().to_string();

        let connect = async {
            match tokio::time::timeout(deadline, self.connector.connect()).await {
                Ok(Ok(stream)) => Ok(stream),
                Ok(Err(source)) => Err(BetwireError::TransportConnect {
                    addr: peer.clone(),
                    source,
                }),
                Err(_) => Err(BetwireError::TransportConnect {
                    addr: peer.clone(),
                    source: io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("connect timed out after {deadline:?}"),
                    ),
                }),
            }
        };

        match cancellable(&cancel, connect).await {
            Ok(stream) => {
                tracing::debug!(client_id = %self.config.id, peer = %peer, "connection opened");
                self.conn = Some(stream);
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    "action: connect | result: fail | client_id: {} | error: {}",
                    self.config.id,
                    e
                );
                Err(e)
            }
        }
    }

    /// Shut down and drop the current connection. No-op when already closed.
    pub async fn close_connection(&mut self) -> Result<()> {
        if let Some(mut stream) = self.conn.take() {
            if let Err(e) = stream.shutdown().await {
                // Peer may already be gone; the stream is dropped either way.
                tracing::debug!(client_id = %self.config.id, error = %e, "shutdown failed");
            }
        }
        Ok(())
    }

    /// Send one bet followed by the end-message marker.
    pub async fn send_bet(&mut self, bet: &Bet) -> Result<()> {
        let payload = bet_message(bet, &self.config.end_message_marker)?;
        self.send_payload(&payload).await?;
        tracing::debug!(agency = bet.agency_id(), "bet sent");
        Ok(())
    }

    /// Send a batch: every bet followed by the end-message marker, then the
    /// batch marker once.
    pub async fn send_bet_batch(&mut self, bets: &[Bet]) -> Result<()> {
        let payload = batch_message(
            bets,
            &self.config.end_message_marker,
            &self.config.batch_marker,
        )?;
        self.send_payload(&payload).await?;
        tracing::debug!(
            agency = bets.first().map(Bet::agency_id),
            bets = bets.len(),
            "bets sent"
        );
        Ok(())
    }

    /// Send the FIN control message and wait for the server's FIN ACK.
    pub async fn send_fin(&mut self) -> Result<String> {
        tracing::debug!("sending FIN message");
        let payload = fin_message(&self.config.server_ack);
        self.send_payload(&payload).await?;

        tracing::debug!("waiting for server FIN ACK");
        self.listen_response().await
    }

    /// Send an arbitrary control message verbatim.
    pub async fn send_message(&mut self, message: &str) -> Result<()> {
        tracing::debug!(msg = message, "sending message");
        self.send_payload(message.as_bytes()).await?;
        Ok(())
    }

    /// Read until the accumulated response ends with the ACK token and return
    /// the whole response (e.g. `PROCESSING|PONG`, not just `PONG`).
    ///
    /// # Errors
    ///
    /// - [`BetwireError::TransportRead`] on read error, EOF before the ACK, or
    ///   more than `max_response_reads` reads
    /// - [`BetwireError::ReadTimeout`] if the response is not complete in time
    /// - [`BetwireError::Cancelled`] if the token fires while waiting
    pub async fn listen_response(&mut self) -> Result<String> {
        let ack = self.config.server_ack.clone();
        let response = self.read_until(&ack).await?;
        tracing::debug!(response = %response, "response from server");
        Ok(response)
    }

    /// Read a single `\n`-terminated line (heartbeat echo replies).
    pub async fn listen_line(&mut self) -> Result<String> {
        self.read_until("\n").await
    }

    /// Poll the server for the winners of `agency_id`.
    ///
    /// See [`Client::poll_winners`].
    pub async fn get_winners_for_agency(&mut self, agency_id: u32) -> Result<Vec<String>> {
        Ok(self.poll_winners(agency_id).await?.winners)
    }

    /// Run the winners polling state machine.
    ///
    /// Each query uses a fresh connection. A `PROCESSING` answer closes the
    /// connection, sleeps a random backoff and asks again; a `WINNERS` answer
    /// ends the loop. Transport errors end it immediately.
    ///
    /// # Errors
    ///
    /// [`BetwireError::PollingTimeout`] once more than `max_poll_attempts`
    /// queries have answered `PROCESSING`, plus any transport or protocol
    /// error.
    pub async fn poll_winners(&mut self, agency_id: u32) -> Result<WinnersPoll> {
        let result = self.run_poll(agency_id).await;
        if result.is_err() {
            self.conn = None;
        }
        result
    }

    async fn run_poll(&mut self, agency_id: u32) -> Result<WinnersPoll> {
        let query = winners_query(agency_id, &self.config.server_ack);
        let mut attempts = 0;
        let mut backoffs = 0;
        let mut state = PollState::Requesting;

        loop {
            state = match state {
                PollState::Requesting => {
                    attempts += 1;
                    self.open_connection().await?;
                    self.send_payload(&query).await?;
                    tracing::debug!(agency = agency_id, attempt = attempts, "waiting for winners");
                    PollState::AwaitingResponse
                }
                PollState::AwaitingResponse => {
                    let response = self.listen_response().await?;
                    let parsed = ServerResponse::parse(&response, &self.config.server_ack)?;
                    self.close_connection().await?;

                    match parsed {
                        ServerResponse::Processing if attempts > self.config.max_poll_attempts => {
                            return Err(BetwireError::PollingTimeout { attempts });
                        }
                        ServerResponse::Processing => {
                            tracing::debug!(agency = agency_id, "keep asking for winners");
                            PollState::Backoff
                        }
                        ServerResponse::Winners(winners) => PollState::Done(winners),
                        ServerResponse::Ack => {
                            return Err(BetwireError::Protocol(
                                "expected winners, got plain ACK".into(),
                            ));
                        }
                    }
                }
                PollState::Backoff => {
                    let delay = self.backoff_delay();
                    cancellable(&self.cancel, async {
                        tokio::time::sleep(delay).await;
                        Ok(())
                    })
                    .await?;
                    backoffs += 1;
                    PollState::Requesting
                }
                PollState::Done(winners) => {
                    tracing::debug!(agency = agency_id, winners = ?winners, "got winners");
                    return Ok(WinnersPoll {
                        winners,
                        attempts,
                        backoffs,
                    });
                }
            };
        }
    }

    /// Uniform random delay in the configured backoff range.
    fn backoff_delay(&self) -> Duration {
        let min = self.config.poll_backoff_min_ms;
        let max = self.config.poll_backoff_max_ms;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    async fn send_payload(&mut self, payload: &[u8]) -> Result<WriteStats> {
        let cancel = self.cancel.clone();
        let packet_limit = self.config.packet_limit;
        let stream = self.conn.as_mut().ok_or(BetwireError::NotConnected)?;

        let stats = cancellable(&cancel, write_chunked(stream, payload, packet_limit)).await?;
        tracing::debug!(
            bytes = stats.bytes,
            chunks = stats.chunks,
            writes = stats.write_calls,
            "payload sent"
        );
        Ok(stats)
    }

    async fn read_until(&mut self, terminator: &str) -> Result<String> {
        let cancel = self.cancel.clone();
        let deadline = self.config.read_timeout();
        let packet_limit = self.config.packet_limit;
        let max_reads = self.config.max_response_reads;
        let stream = self.conn.as_mut().ok_or(BetwireError::NotConnected)?;

        let read = async {
            tokio::time::timeout(
                deadline,
                read_response(stream, terminator, packet_limit, max_reads),
            )
            .await
            .map_err(|_| BetwireError::ReadTimeout(deadline))?
        };

        let bytes = cancellable(&cancel, read).await.map_err(|e| {
            tracing::error!(error = %e, "unexpected error while trying to get server response");
            e
        })?;

        String::from_utf8(bytes.to_vec())
            .map_err(|e| BetwireError::Protocol(format!("response is not UTF-8: {e}")))
    }
}

/// Race `fut` against the cancellation token.
async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BetwireError::Cancelled),
        result = fut => result,
    }
}

/// Read into a [`ResponseBuffer`] up to `packet_limit` bytes at a time until
/// the data ends with `terminator`.
async fn read_response<R>(
    reader: &mut R,
    terminator: &str,
    packet_limit: usize,
    max_reads: usize,
) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = ResponseBuffer::with_capacity(terminator, packet_limit);
    let mut chunk = vec![0u8; packet_limit];

    for _ in 0..max_reads {
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(BetwireError::TransportRead)?;

        if n == 0 {
            return Err(BetwireError::TransportRead(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "connection closed after {} bytes without {terminator:?}: {:?}",
                    buffer.len(),
                    String::from_utf8_lossy(buffer.partial())
                ),
            )));
        }

        if let Some(response) = buffer.push(&chunk[..n]) {
            return Ok(response);
        }
    }

    Err(BetwireError::TransportRead(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("response exceeded read limit of {max_reads} reads"),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryAcceptor, MemoryConnector};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    fn config() -> ClientConfig {
        let mut config = ClientConfig::new("1", "memory");
        config.packet_limit = 4;
        config.poll_backoff_min_ms = 0;
        config.poll_backoff_max_ms = 1;
        config.read_timeout_ms = 2_000;
        config
    }

    fn memory_client(
        config: ClientConfig,
        pipe: usize,
    ) -> (Client<MemoryConnector>, MemoryAcceptor) {
        let (connector, acceptor) = MemoryConnector::pair(pipe);
        let client = ClientBuilder::new(config)
            .connector(connector)
            .build()
            .unwrap();
        (client, acceptor)
    }

    /// Read from `stream` until the received bytes end with `suffix`.
    async fn read_until_suffix(stream: &mut DuplexStream, suffix: &[u8]) -> Vec<u8> {
        let mut received = Vec::new();
        let mut buf = [0u8; 64];
        while !received.ends_with(suffix) {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "client closed early");
            received.extend_from_slice(&buf[..n]);
        }
        received
    }

    #[test]
    fn test_builder_configuration() {
        let builder = Client::builder(ClientConfig::new("1", "server:12345"))
            .packet_limit(16)
            .read_timeout(Duration::from_secs(3))
            .max_poll_attempts(7)
            .poll_backoff(Duration::from_millis(2), Duration::from_millis(9));

        assert_eq!(builder.config.packet_limit, 16);
        assert_eq!(builder.config.read_timeout_ms, 3_000);
        assert_eq!(builder.config.max_poll_attempts, 7);
        assert_eq!(builder.config.poll_backoff_min_ms, 2);
        assert_eq!(builder.config.poll_backoff_max_ms, 9);
        assert_eq!(builder.connector.addr(), "server:12345");
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = Client::builder(ClientConfig::new("1", "server:12345"))
            .packet_limit(0)
            .build();
        assert!(matches!(result, Err(BetwireError::Configuration(_))));

        let result = Client::builder(ClientConfig::new("1", "server:12345"))
            .max_poll_attempts(0)
            .build();
        assert!(matches!(result, Err(BetwireError::Configuration(_))));

        let result = Client::builder(ClientConfig::new("1", "server:12345"))
            .read_timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(BetwireError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_send_without_connection() {
        let (mut client, _acceptor) = memory_client(config(), 64);
        let err = client.send_message("PONG").await.unwrap_err();
        assert!(matches!(err, BetwireError::NotConnected));

        let err = client.listen_response().await.unwrap_err();
        assert!(matches!(err, BetwireError::NotConnected));
    }

    #[tokio::test]
    async fn test_send_bet_batch_with_short_writes() {
        let (mut client, mut acceptor) = memory_client(config(), 3);
        let bets = vec![
            Bet::new(1, 1001, "Ana", "Lopez", "1990-01-01", 42).unwrap(),
            Bet::new(1, 1002, "Ben", "Cruz", "1985-05-05", 7).unwrap(),
        ];

        let server = tokio::spawn(async move {
            let mut stream = acceptor.accept().await.unwrap();
            let received = read_until_suffix(&mut stream, b"PING").await;
            stream.write_all(b"PONG").await.unwrap();
            received
        });

        client.open_connection().await.unwrap();
        client.send_bet_batch(&bets).await.unwrap();
        assert_eq!(client.listen_response().await.unwrap(), "PONG");
        client.close_connection().await.unwrap();

        assert_eq!(
            server.await.unwrap(),
            b"1,1001,Ana,Lopez,1990-01-01,42#1,1002,Ben,Cruz,1985-05-05,7#PING".to_vec()
        );
    }

    #[tokio::test]
    async fn test_listen_returns_full_response() {
        let (mut client, mut acceptor) = memory_client(config(), 64);

        let server = tokio::spawn(async move {
            let mut stream = acceptor.accept().await.unwrap();
            for piece in [&b"PROC"[..], b"ESSING|P", b"ONG"] {
                stream.write_all(piece).await.unwrap();
                tokio::task::yield_now().await;
            }
            stream
        });

        client.open_connection().await.unwrap();
        assert_eq!(client.listen_response().await.unwrap(), "PROCESSING|PONG");
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_listen_eof_before_ack() {
        let (mut client, mut acceptor) = memory_client(config(), 64);

        let server = tokio::spawn(async move {
            let mut stream = acceptor.accept().await.unwrap();
            stream.write_all(b"PROCESSING|").await.unwrap();
        });

        client.open_connection().await.unwrap();
        server.await.unwrap();

        let err = client.listen_response().await.unwrap_err();
        match err {
            BetwireError::TransportRead(e) => {
                assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);
                assert!(e.to_string().contains("PROCESSING|"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_listen_read_limit() {
        let mut config = config();
        config.max_response_reads = 2;
        let (mut client, mut acceptor) = memory_client(config, 64);

        let server = tokio::spawn(async move {
            let mut stream = acceptor.accept().await.unwrap();
            // Three 4-byte reads are needed; the limit allows two.
            stream.write_all(b"WINNERS|1|PONG").await.unwrap();
            stream
        });

        client.open_connection().await.unwrap();
        let _stream = server.await.unwrap();

        let err = client.listen_response().await.unwrap_err();
        assert!(err.to_string().contains("read limit"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_listen_timeout() {
        let mut config = config();
        config.read_timeout_ms = 500;
        let (mut client, mut acceptor) = memory_client(config, 64);

        client.open_connection().await.unwrap();
        let _silent = acceptor.accept().await.unwrap();

        let err = client.listen_response().await.unwrap_err();
        assert!(matches!(err, BetwireError::ReadTimeout(d) if d == Duration::from_millis(500)));
    }

    #[tokio::test]
    async fn test_listen_cancelled() {
        let (mut client, mut acceptor) = memory_client(config(), 64);
        let token = client.cancellation_token();

        client.open_connection().await.unwrap();
        let _silent = acceptor.accept().await.unwrap();

        tokio::spawn(async move {
            tokio::task::yield_now().await;
            token.cancel();
        });

        let err = client.listen_response().await.unwrap_err();
        assert!(matches!(err, BetwireError::Cancelled));
    }

    #[tokio::test]
    async fn test_send_fin_waits_for_ack() {
        let (mut client, mut acceptor) = memory_client(config(), 64);

        let server = tokio::spawn(async move {
            let mut stream = acceptor.accept().await.unwrap();
            let received = read_until_suffix(&mut stream, b"PONG").await;
            stream.write_all(b"PONG").await.unwrap();
            received
        });

        client.open_connection().await.unwrap();
        assert_eq!(client.send_fin().await.unwrap(), "PONG");
        assert_eq!(server.await.unwrap(), b"PONG");
    }

    #[tokio::test]
    async fn test_open_connection_refused() {
        let (mut client, acceptor) = memory_client(config(), 64);
        drop(acceptor);

        let err = client.open_connection().await.unwrap_err();
        assert!(matches!(err, BetwireError::TransportConnect { .. }));
        assert!(!client.is_connected());
    }

    /// Scripted server: answers each winners query with the next response.
    fn scripted_server(
        mut acceptor: MemoryAcceptor,
        responses: Vec<&'static [u8]>,
    ) -> tokio::task::JoinHandle<Vec<Vec<u8>>> {
        tokio::spawn(async move {
            let mut queries = Vec::new();
            for response in responses {
                let mut stream = acceptor.accept().await.unwrap();
                queries.push(read_until_suffix(&mut stream, b"PONG").await);
                stream.write_all(response).await.unwrap();
            }
            queries
        })
    }

    #[tokio::test]
    async fn test_poll_processing_twice_then_winners() {
        let (mut client, acceptor) = memory_client(config(), 64);
        let server = scripted_server(
            acceptor,
            vec![b"PROCESSING|PONG", b"PROCESSING|PONG", b"WINNERS|7|PONG"],
        );

        let poll = client.poll_winners(3).await.unwrap();

        assert_eq!(poll.winners, vec!["7".to_string()]);
        assert_eq!(poll.attempts, 3);
        assert_eq!(poll.backoffs, 2);
        assert!(!client.is_connected());

        let queries = server.await.unwrap();
        assert_eq!(queries.len(), 3);
        assert!(queries.iter().all(|q| q == b"WINNERS|3|PONG"));
    }

    #[tokio::test]
    async fn test_poll_empty_winners() {
        let (mut client, acceptor) = memory_client(config(), 64);
        let _server = scripted_server(acceptor, vec![b"WINNERS|,|PONG"]);

        let winners = client.get_winners_for_agency(1).await.unwrap();
        assert!(winners.is_empty());
    }

    #[tokio::test]
    async fn test_poll_attempt_limit() {
        let mut config = config();
        config.max_poll_attempts = 2;
        let (mut client, acceptor) = memory_client(config, 64);
        let _server = scripted_server(
            acceptor,
            vec![b"PROCESSING|PONG", b"PROCESSING|PONG", b"PROCESSING|PONG"],
        );

        let err = client.poll_winners(1).await.unwrap_err();
        assert!(matches!(err, BetwireError::PollingTimeout { attempts: 3 }));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_poll_winners_after_max_processing_answers() {
        let mut config = config();
        config.max_poll_attempts = 2;
        let (mut client, acceptor) = memory_client(config, 64);
        let _server = scripted_server(
            acceptor,
            vec![b"PROCESSING|PONG", b"PROCESSING|PONG", b"WINNERS|7|PONG"],
        );

        let poll = client.poll_winners(1).await.unwrap();
        assert_eq!(poll.winners, vec!["7".to_string()]);
        assert_eq!(poll.attempts, 3);
        assert_eq!(poll.backoffs, 2);
    }

    #[tokio::test]
    async fn test_poll_single_processing_allowed() {
        let mut config = config();
        config.max_poll_attempts = 1;
        let (mut client, acceptor) = memory_client(config, 64);
        let _server = scripted_server(acceptor, vec![b"PROCESSING|PONG", b"WINNERS|4|PONG"]);

        let winners = client.get_winners_for_agency(1).await.unwrap();
        assert_eq!(winners, vec!["4".to_string()]);
    }

    #[tokio::test]
    async fn test_poll_transport_error_is_not_retried() {
        let (mut client, mut acceptor) = memory_client(config(), 64);

        let server = tokio::spawn(async move {
            // Accept the first query and hang up without answering.
            let stream = acceptor.accept().await.unwrap();
            drop(stream);
            acceptor
        });

        let err = client.poll_winners(1).await.unwrap_err();
        assert!(err.is_transport());
        assert!(!client.is_connected());

        let mut acceptor = server.await.unwrap();
        drop(client);
        assert!(acceptor.accept().await.is_none());
    }

    #[tokio::test]
    async fn test_poll_plain_ack_is_protocol_error() {
        let (mut client, acceptor) = memory_client(config(), 64);
        let _server = scripted_server(acceptor, vec![b"PONG"]);

        let err = client.poll_winners(1).await.unwrap_err();
        assert!(matches!(err, BetwireError::Protocol(_)));
    }
}
