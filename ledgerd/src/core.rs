use anyhow::Context;
use config::load::load_config;
use config::shared::MirrorConfig;
use mirror::pipeline::Mirror;
use mirror::schema::SchemaCatalog;
use mirror::store::PostgresGateway;
use sqlx::postgres::PgPoolOptions;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Upper bound on connections to the relational store.
///
/// Events for the same document serialize on a row lock, so a small pool is enough.
const MAX_POOL_CONNECTIONS: u32 = 4;

/// Number of records accumulated before a batch is handed to the pipeline.
const BATCH_MAX_RECORDS: usize = 100;

/// Loads configuration, bootstraps the store, and mirrors stdin until end of input.
pub async fn start_mirror() -> anyhow::Result<()> {
    let config: MirrorConfig =
        load_config().context("failed to load the mirror configuration")?;
    config
        .validate()
        .context("the mirror configuration is invalid")?;

    let catalog = SchemaCatalog::from_definitions(&config.tables)?;
    info!(
        tables = catalog.len(),
        strict_order = config.pipeline.strict_order,
        history_mode = config.pipeline.history_mode,
        "loaded schema catalog"
    );

    let pool = PgPoolOptions::new()
        .max_connections(MAX_POOL_CONNECTIONS)
        .connect_with(config.pg_connection.with_db())
        .await
        .context("failed to connect to the relational store")?;

    let mirror = Mirror::new(catalog, config.pipeline, PostgresGateway::new(pool));
    mirror
        .bootstrap()
        .await
        .context("failed to bootstrap the mirrored tables")?;

    let processed = mirror_stdin(&mirror).await?;
    info!(processed, "reached end of input, shutting down");

    Ok(())
}

/// Reads newline-delimited JSON records from stdin and processes them in batches.
///
/// Returns the total number of records processed. Lines that are not valid JSON are
/// skipped with a warning; record-level defects are handled inside the pipeline.
async fn mirror_stdin(mirror: &Mirror<PostgresGateway>) -> anyhow::Result<usize> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut batch = Vec::with_capacity(BATCH_MAX_RECORDS);
    let mut processed = 0;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str(&line) {
            Ok(record) => batch.push(record),
            Err(err) => {
                warn!(error = %err, "skipping line that is not valid JSON");
                continue;
            }
        }

        if batch.len() >= BATCH_MAX_RECORDS {
            processed += mirror.process_batch(&batch).await?;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        processed += mirror.process_batch(&batch).await?;
    }

    Ok(processed)
}
