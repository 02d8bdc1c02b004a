//! Ledger mirror service binary.
//!
//! Reads newline-delimited change-stream records from stdin and reconciles them into
//! the configured relational store. Configuration is loaded from the `configuration/`
//! directory with `APP_`-prefixed environment variable overrides.

use telemetry::tracing::init_tracing;
use tracing::error;

mod core;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(env!("CARGO_BIN_NAME"));

    if let Err(err) = core::start_mirror().await {
        error!(error = ?err, "the mirror service terminated with an error");
        return Err(err);
    }

    Ok(())
}
