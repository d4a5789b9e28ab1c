//! Batch run for a single agency.
//!
//! ```text
//! open ─► [batch ─► ACK]* ─► FIN ─► FIN ACK ─► close ─► poll winners
//! ```
//!
//! There is no partial commit: the first failing step aborts the whole run.

use tokio::io::AsyncBufRead;

use super::BetSource;
use crate::client::Client;
use crate::codec::{Bet, BetCodec};
use crate::error::{BetwireError, Result};
use crate::protocol::ServerResponse;
use crate::transport::{Connector, TcpConnector};

/// Submits one agency's bets and collects its winners.
pub struct BetAgency<C: Connector = TcpConnector> {
    id: u32,
    client: Client<C>,
}

impl<C: Connector> BetAgency<C> {
    pub fn new(id: u32, client: Client<C>) -> Self {
        Self { id, client }
    }

    /// Access the underlying client.
    pub fn client_mut(&mut self) -> &mut Client<C> {
        &mut self.client
    }

    /// Run a full batch submission and return the winner IDs.
    ///
    /// Lines are grouped into batches of `batch_size`; every batch is sent
    /// over the same connection and acknowledged before the next one.
    pub async fn process_batch<R>(&mut self, mut source: BetSource<R>) -> Result<Vec<String>>
    where
        R: AsyncBufRead + Unpin,
    {
        self.client.open_connection().await?;
        let submitted = self.submit_all(&mut source).await;
        self.client.close_connection().await?;

        let batches = submitted.map_err(|e| {
            tracing::error!(agency = self.id, error = %e, "error sending bets");
            e
        })?;
        tracing::debug!(
            agency = self.id,
            batches,
            "all bets sent, process batch status: FINISHED"
        );

        let winners = self.client.get_winners_for_agency(self.id).await.map_err(|e| {
            tracing::error!(agency = self.id, error = %e, "error getting winners");
            e
        })?;

        tracing::debug!(agency = self.id, winners = ?winners, "winner IDs");
        tracing::info!(
            "action: consulta_ganadores | agencia: {} | result: success | cant_ganadores: {}",
            self.id,
            winners.len()
        );
        Ok(winners)
    }

    /// Send every batch from `source`, then the FIN handshake.
    /// Returns the number of batches sent.
    async fn submit_all<R>(&mut self, source: &mut BetSource<R>) -> Result<usize>
    where
        R: AsyncBufRead + Unpin,
    {
        let batch_size = self.client.config().batch_size;
        let mut batches = 0;

        loop {
            let lines = source.next_batch(batch_size).await?;
            if lines.is_empty() {
                break;
            }
            batches += 1;
            tracing::debug!(agency = self.id, batch = batches, "sending batch");
            self.register_bets(&lines).await?;
        }

        self.client.send_fin().await?;
        Ok(batches)
    }

    /// Parse `lines`, send them as one batch and wait for the ACK.
    ///
    /// # Errors
    ///
    /// [`BetwireError::MalformedRecord`] for the first bad line; nothing is
    /// sent in that case.
    pub async fn register_bets(&mut self, lines: &[String]) -> Result<()> {
        let bets = lines
            .iter()
            .map(|line| BetCodec::parse(self.id, line))
            .collect::<Result<Vec<Bet>>>()?;

        tracing::debug!(agency = self.id, "sending bets");
        self.client.send_bet_batch(&bets).await?;

        tracing::debug!(agency = self.id, "waiting for server's ack");
        self.expect_ack().await
    }

    /// Send a single bet on its own connection and wait for the ACK.
    pub async fn register_bet(&mut self, bet: &Bet) -> Result<()> {
        self.client.open_connection().await?;
        let result = async {
            self.client.send_bet(bet).await?;
            self.expect_ack().await
        }
        .await;
        self.client.close_connection().await?;
        result?;

        tracing::info!(
            "action: apuesta_enviada | result: success | dni: {} | numero: {}",
            bet.client_id(),
            bet.number()
        );
        Ok(())
    }

    async fn expect_ack(&mut self) -> Result<()> {
        let response = self.client.listen_response().await?;
        match ServerResponse::parse(&response, &self.client.config().server_ack)? {
            ServerResponse::Ack => Ok(()),
            other => Err(BetwireError::Protocol(format!(
                "expected ACK, got {other:?}"
            ))),
        }
    }
}
