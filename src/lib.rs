//! # betwire-client
//!
//! Rust client for the betwire batch-submission protocol.
//!
//! An agency streams its bets to the aggregation server in batches, announces
//! the end of its run with a FIN message, then polls until the server has
//! drawn the winners.
//!
//! ## Architecture
//!
//! - **Codec**: bets to and from their comma-separated text form
//! - **Writer**: payloads cut into `packet_limit` chunks, short writes resent
//! - **Protocol**: message layout, ACK-suffix response framing, response
//!   classification
//! - **Client**: connection lifetime, sends, listens and winners polling
//! - **Agency**: full batch run from a line source
//!
//! ## Example
//!
//! ```ignore
//! use betwire_client::agency::{BetAgency, BetSource};
//! use betwire_client::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::from_env()?;
//!     let source = BetSource::open(config.agency_file(1)).await?;
//!
//!     let mut agency = BetAgency::new(1, Client::builder(config).build()?);
//!     let winners = agency.process_batch(source).await?;
//!     println!("{} winners", winners.len());
//!     Ok(())
//! }
//! ```

pub mod agency;
pub mod codec;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod protocol;
pub mod telemetry;
pub mod transport;
pub mod writer;

mod client;

pub use client::{Client, ClientBuilder, WinnersPoll};
pub use codec::{Bet, BetCodec};
pub use config::ClientConfig;
pub use error::{BetwireError, Result};
