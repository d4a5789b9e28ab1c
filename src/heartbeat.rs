//! Heartbeat probe loop.
//!
//! Independent of the batch protocol: every `loop_period` the client opens a
//! connection, sends `[CLIENT <id>] Message N°<n>\n`, reads one line back and
//! closes. The loop ends when `loop_lapse` elapses or the client's
//! cancellation token fires, whichever comes first.

use tokio_util::sync::CancellationToken;

use crate::client::Client;
use crate::error::{BetwireError, Result};
use crate::transport::Connector;

/// Why the heartbeat loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `loop_lapse` elapsed.
    Deadline,
    /// The cancellation token fired.
    Cancelled,
}

/// Summary of a heartbeat run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatReport {
    /// Probes that received a reply.
    pub messages: u32,
    pub stopped: StopReason,
}

/// Text of the `n`-th probe.
pub fn probe_message(client_id: &str, n: u32) -> String {
    format!("[CLIENT {client_id}] Message N°{n}\n")
}

/// Run the probe loop until the deadline or cancellation.
///
/// A failed probe ends the loop with its error; a cancellation that lands
/// while a probe is in flight is a normal stop.
pub async fn run<C: Connector>(client: &mut Client<C>) -> Result<HeartbeatReport> {
    let cancel: CancellationToken = client.cancellation_token();
    let period = client.config().loop_period();
    let id = client.config().id.clone();

    let deadline = tokio::time::sleep(client.config().loop_lapse());
    tokio::pin!(deadline);

    let mut msg_id = 1;
    let stopped = loop {
        match probe(client, &id, msg_id).await {
            Ok(reply) => {
                tracing::info!(
                    "action: receive_message | result: success | client_id: {} | msg: {}",
                    id,
                    reply.trim_end()
                );
            }
            Err(BetwireError::Cancelled) => break StopReason::Cancelled,
            Err(e) => {
                tracing::error!(
                    "action: receive_message | result: fail | client_id: {} | error: {}",
                    id,
                    e
                );
                return Err(e);
            }
        }
        msg_id += 1;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break StopReason::Cancelled,
            _ = &mut deadline => break StopReason::Deadline,
            _ = tokio::time::sleep(period) => {}
        }
    };

    match stopped {
        StopReason::Deadline => {
            tracing::info!("action: timeout_detected | result: success | client_id: {}", id)
        }
        StopReason::Cancelled => tracing::info!("shutdown requested: stopping client {}", id),
    }
    tracing::info!("action: loop_finished | result: success | client_id: {}", id);

    Ok(HeartbeatReport {
        messages: msg_id - 1,
        stopped,
    })
}

async fn probe<C: Connector>(client: &mut Client<C>, id: &str, n: u32) -> Result<String> {
    client.open_connection().await?;
    let result = async {
        client.send_message(&probe_message(id, n)).await?;
        client.listen_line().await
    }
    .await;
    client.close_connection().await?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientBuilder;
    use crate::config::ClientConfig;
    use crate::transport::{MemoryAcceptor, MemoryConnector};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn heartbeat_client(
        period_ms: u64,
        lapse_ms: u64,
    ) -> (Client<MemoryConnector>, MemoryAcceptor) {
        let mut config = ClientConfig::new("7", "memory");
        config.loop_period_ms = period_ms;
        config.loop_lapse_ms = lapse_ms;
        let (connector, acceptor) = MemoryConnector::pair(256);
        let client = ClientBuilder::new(config)
            .connector(connector)
            .build()
            .unwrap();
        (client, acceptor)
    }

    /// Echo server: replies to each probe with the line it received.
    fn echo_server(mut acceptor: MemoryAcceptor) -> tokio::task::JoinHandle<Vec<String>> {
        tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(stream) = acceptor.accept().await {
                let mut stream = BufReader::new(stream);
                let mut line = String::new();
                if stream.read_line(&mut line).await.unwrap_or(0) == 0 {
                    continue;
                }
                let _ = stream.get_mut().write_all(line.as_bytes()).await;
                seen.push(line);
            }
            seen
        })
    }

    #[test]
    fn test_probe_message() {
        assert_eq!(probe_message("3", 12), "[CLIENT 3] Message N°12\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_deadline() {
        let (mut client, acceptor) = heartbeat_client(100, 350);
        let server = echo_server(acceptor);

        let report = run(&mut client).await.unwrap();
        assert_eq!(report.stopped, StopReason::Deadline);
        assert_eq!(report.messages, 4);

        drop(client);
        let seen = server.await.unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], "[CLIENT 7] Message N°1\n");
        assert_eq!(seen[3], "[CLIENT 7] Message N°4\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_cancel() {
        let (mut client, acceptor) = heartbeat_client(100, 60_000);
        let _server = echo_server(acceptor);
        let token = client.cancellation_token();

        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(250)).await;
            token.cancel();
        });

        let report = run(&mut client).await.unwrap();
        assert_eq!(report.stopped, StopReason::Cancelled);
        assert_eq!(report.messages, 3);
    }

    #[tokio::test]
    async fn test_receive_failure_ends_loop() {
        let (mut client, mut acceptor) = heartbeat_client(100, 60_000);
        tokio::spawn(async move {
            // Accept and hang up without replying.
            while let Some(stream) = acceptor.accept().await {
                drop(stream);
            }
        });

        let err = run(&mut client).await.unwrap_err();
        assert!(err.is_transport());
    }
}
