//! # News Digest
//!
//! Fetches a paginated news feed with a pool of concurrent workers, ranks
//! the most rated entries published inside a date window, and writes both
//! the full collection and the ranking as HTML or JSON documents.
//!
//! ## Usage
//!
//! ```sh
//! news_digest -o ./output --start-date 2024-08-01 --end-date 2024-10-10 --top 20
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: `N` workers walk disjoint page sequences, at most `C`
//!    requests in flight across all of them
//! 2. **Aggregation**: every non-empty page is sent as one batch to a single
//!    processor task
//! 3. **Ranking**: entries inside the window are sorted by rating, highest
//!    first, and cut to the top `K`
//! 4. **Output**: `all_news` and `most_rated_news` documents are written to
//!    the output directory (never overwriting existing files)

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod models;
mod outputs;
mod pipeline;
mod scoring;
mod utils;

use api::FeedClient;
use cli::Cli;
use outputs::FileRenderer;
use pipeline::{Pipeline, RunContext};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "news_digest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = args.resolve()?;
    info!(
        workers = config.pipeline.workers,
        max_concurrent_requests = config.pipeline.max_concurrent_requests,
        max_page = config.pipeline.max_page,
        start_date = %config.ranking.start_date,
        end_date = %config.ranking.end_date,
        top_k = config.ranking.top_k,
        output_dir = %config.output.dir.display(),
        format = ?config.output.format,
        "Resolved configuration"
    );

    // Early check: fail before any request if results could not be written
    if let Err(e) = ensure_writable_dir(&config.output.dir).await {
        error!(
            path = %config.output.dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let client = Arc::new(FeedClient::new(&config.feed)?);
    let renderer = Arc::new(FileRenderer::from_settings(&config.output));

    let ctx = RunContext::new(CancellationToken::new());
    {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; finishing in-flight requests and writing results");
                ctx.cancel();
            }
        });
    }

    let pipeline = Pipeline::new(
        config.pipeline.clone(),
        config.ranking.clone(),
        client,
        renderer,
    );

    let summary = match pipeline.run(ctx).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Pipeline failed");
            return Err(e.into());
        }
    };

    info!(
        elapsed = ?summary.elapsed,
        secs = summary.elapsed.as_secs(),
        millis = summary.elapsed.subsec_millis(),
        items = summary.aggregate_len,
        items_sent = summary.items_sent(),
        most_rated = summary.ranked_len,
        pages_failed = summary.pages_failed(),
        peak_in_flight = summary.peak_in_flight,
        cancelled = summary.cancelled,
        "Execution complete"
    );

    Ok(())
}
