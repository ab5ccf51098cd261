//! Batch ingestion of GPX tracks.
//!
//! Usage:
//!   trackrisk-ingest https://example.org/a.gpx https://example.org/b.gpx \
//!                    --database track_db.sqlite --dataset track_dataset.csv

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trackrisk_rs::{
    config::Config,
    pipeline::ingest::{IngestOutcome, Ingestor},
    providers::retry::cancel_pair,
};

#[derive(Parser, Debug)]
#[command(
    name = "trackrisk-ingest",
    about = "Download, enrich and store GPX tracks for the risk dataset"
)]
struct Args {
    /// GPX links, processed in order
    #[arg(required = true)]
    links: Vec<String>,

    /// SQLite database file (overrides DATABASE_PATH)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Dataset CSV file (overrides DATASET_PATH)
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Directory for rendered track maps (overrides MAP_DIR)
    #[arg(long)]
    map_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "trackrisk_rs=debug"
    } else {
        "trackrisk_rs=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if let Some(path) = args.database {
        config.database_path = path;
    }
    if let Some(path) = args.dataset {
        config.dataset_path = path;
    }
    if let Some(dir) = args.map_dir {
        config.map_dir = dir;
    }

    let mut ingestor = Ingestor::from_config(&config)?;

    let (handle, cancel) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, abandoning the current track");
            handle.cancel();
        }
    });

    let total = args.links.len();
    let mut failed = 0usize;

    for (idx, link) in args.links.iter().enumerate() {
        if cancel.is_cancelled() {
            warn!("Skipping {} remaining links", total - idx);
            failed += total - idx;
            break;
        }

        match ingestor.ingest_url(link, &cancel).await {
            Ok(IngestOutcome::Saved {
                track_id, points, ..
            }) => info!(
                "[{}/{}] {} saved as track {} ({} points)",
                idx + 1,
                total,
                link,
                track_id,
                points
            ),
            Ok(IngestOutcome::AlreadySaved { track_id }) => {
                info!("[{}/{}] {} already saved as track {}", idx + 1, total, link, track_id)
            }
            Err(e) => {
                failed += 1;
                error!("[{}/{}] {} failed: {}", idx + 1, total, link, e);
            }
        }
    }

    info!(
        "Done: {} tracks in database, {} dataset rows",
        ingestor.store().track_count()?,
        ingestor.dataset().row_count()?
    );

    if failed > 0 {
        bail!("{} of {} links failed", failed, total);
    }
    Ok(())
}
