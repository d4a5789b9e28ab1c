//! `betwire` - agency client binary.
//!
//! Configuration comes from the JSON file named by `--config` (or
//! `BETWIRE_CONFIG`), falling back to `CLI_*` environment variables.
//! SIGTERM and Ctrl-C cancel whatever step is in flight.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use betwire_client::agency::{BetAgency, BetSource};
use betwire_client::telemetry::init_tracing;
use betwire_client::{heartbeat, Bet, BetwireError, Client, ClientConfig};

#[derive(Parser, Debug)]
#[command(name = "betwire")]
#[command(about = "Submit agency bets and fetch the winners", long_about = None)]
struct Cli {
    /// JSON configuration file.
    #[arg(short, long, env = "BETWIRE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send the agency's bets file in batches, then poll for winners (default).
    Run {
        /// Bets file; defaults to `<dataset_dir>/agency-<id>.csv`.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Send periodic probe messages until the configured lapse elapses.
    Heartbeat,
    /// Send the single bet described by DOCUMENTO/NOMBRE/APELLIDO/NACIMIENTO/NUMERO.
    Bet,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("action: run | result: fail | error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), BetwireError> {
    let config = match &cli.config {
        Some(path) => ClientConfig::from_json_str(&tokio::fs::read_to_string(path).await?)?,
        None => ClientConfig::from_env()?,
    };
    tracing::debug!(?config, "configuration loaded");

    let agency_id: u32 = config.id.parse().map_err(|_| {
        BetwireError::Configuration(format!("client id must be numeric, got {:?}", config.id))
    })?;

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    let client = Client::builder(config.clone())
        .cancellation(shutdown)
        .build()?;

    match cli.command.unwrap_or(Command::Run { file: None }) {
        Command::Run { file } => {
            let path = file.unwrap_or_else(|| config.agency_file(agency_id));
            let source = BetSource::open(&path).await?;
            BetAgency::new(agency_id, client).process_batch(source).await?;
        }
        Command::Heartbeat => {
            let mut client = client;
            heartbeat::run(&mut client).await?;
        }
        Command::Bet => {
            let bet = Bet::from_env(agency_id)?;
            BetAgency::new(agency_id, client).register_bet(&bet).await?;
        }
    }

    Ok(())
}

/// Cancel `token` on SIGTERM or Ctrl-C.
async fn watch_signals(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "cannot install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                token.cancel();
                return;
            }
        };

        tokio::select! {
            _ = term.recv() => {
                tracing::info!("signal 'terminated' received: shutting down client")
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("signal 'interrupt' received: shutting down client")
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("signal 'interrupt' received: shutting down client");
    }

    token.cancel();
}
