//! Tracing subscriber setup for the `betwire` binary.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "betwire_client=info,betwire=info";

/// Install a fmt subscriber filtered by `RUST_LOG` (or [`DEFAULT_FILTER`]).
///
/// Logs go to stderr. Calling this twice is harmless; the second call is
/// ignored.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false),
        )
        .with(filter)
        .try_init();
}
