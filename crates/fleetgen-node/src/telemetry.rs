//! # Logging
//!
//! Both binaries log through `tracing`. Events from the `fleetgen` and
//! `fleetgen-stream` libraries are compiled in because the binaries enable
//! their `tracing` features.
//!
//! The filter defaults to `info` and can be overridden with `RUST_LOG`:
//!
//! ```bash
//! RUST_LOG=fleetgen_stream=debug,info cargo run --bin fleetgen-server
//! ```
//!
//! - `info`: lifecycle (listening, connected, stopped)
//! - `debug`: per-connection lifecycle and background loops
//! - `trace`: individual records and frames

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber. Call once, early in `main`.
pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .pretty(),
        )
        .try_init()?;
    Ok(())
}
