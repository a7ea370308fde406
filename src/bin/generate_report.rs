//! Compute a report straight from feed files, without the database.
//!
//! Usage: `generate_report <zip-or-dir> [output.csv]`

use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;

use store_uptime::{
    config::AppConfig,
    models::store::StoreSnapshot,
    services::{
        ingest::{parse_feeds_blocking, FeedFiles},
        reports::{compute_snapshot, render_csv},
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("store_uptime={},generate_report=info", config.logging.level).into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = std::env::args().skip(1);
    let source = args
        .next()
        .context("usage: generate_report <zip-or-dir> [output.csv]")?;
    let output = args.next().map(PathBuf::from);

    let settings = config.report.settings()?;

    let files = FeedFiles::from_path(&source).await?;
    let parsed = parse_feeds_blocking(files).await?;
    tracing::info!(
        "Read {} status rows, {} business hours, {} timezones from {}",
        parsed.statuses.len(),
        parsed.business_hours.len(),
        parsed.timezones.len(),
        source
    );

    let snapshot = StoreSnapshot {
        statuses: parsed.statuses,
        business_hours: parsed.business_hours,
        timezones: parsed.timezones,
    };
    let run = compute_snapshot(snapshot, Utc::now(), settings, &config.report).await;

    for failure in &run.outcome.failures {
        tracing::warn!("{} left out: {}", failure.store_id, failure.message);
    }

    let path = output.unwrap_or_else(|| {
        PathBuf::from(&config.report.output_dir)
            .join(format!("report_{}_offline.csv", run.now.timestamp()))
    });
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(&path, render_csv(&run.outcome.rows)?)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    tracing::info!(
        "Wrote {} rows ({} stores left out) to {}",
        run.outcome.rows.len(),
        run.outcome.failures.len(),
        path.display()
    );
    Ok(())
}
