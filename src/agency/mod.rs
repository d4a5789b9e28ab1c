//! Agency module - full batch runs on top of the transport client.
//!
//! Provides:
//! - [`BetAgency`] - reads an agency's bets, submits them in batches,
//!   performs the FIN handshake and polls for winners
//! - [`BetSource`] - ordered source of raw bet lines
//!
//! # Example
//!
//! ```ignore
//! use betwire_client::agency::{BetAgency, BetSource};
//! use betwire_client::{Client, ClientConfig};
//!
//! let config = ClientConfig::from_env()?;
//! let source = BetSource::open(config.agency_file(1)).await?;
//! let mut agency = BetAgency::new(1, Client::builder(config).build()?);
//!
//! let winners = agency.process_batch(source).await?;
//! ```

mod runner;
mod source;

pub use runner::BetAgency;
pub use source::BetSource;
