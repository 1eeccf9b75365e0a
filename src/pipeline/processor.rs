//! The single consumer of the aggregation channel.
//!
//! The processor accumulates every batch it receives into one aggregate
//! while workers are still fetching. Once the channel is closed and empty it
//! ranks the aggregate and hands two collections to the renderer: the full
//! aggregate and the most rated items inside the date window.

use super::BatchReceiver;
use super::context::RunContext;
use crate::config::RankingSettings;
use crate::models::FeedItem;
use crate::outputs::{PersistError, Renderer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Destination name of the unfiltered aggregate.
pub const ALL_NEWS: &str = "all_news";
/// Destination name of the ranked top-K.
pub const MOST_RATED_NEWS: &str = "most_rated_news";

/// The top `ranking.top_k` items published inside the window, highest
/// rating first.
///
/// Items with equal ratings keep their relative order from `items`.
pub fn most_rated(items: &[FeedItem], ranking: &RankingSettings) -> Vec<FeedItem> {
    let mut in_window: Vec<FeedItem> = items
        .iter()
        .filter(|item| {
            item.published_on()
                .is_some_and(|date| ranking.contains(date))
        })
        .cloned()
        .collect();

    // stable, so ties stay in arrival order
    in_window.sort_by(|a, b| b.rating().total_cmp(&a.rating()));
    in_window.truncate(ranking.top_k);
    in_window
}

/// Result of one persist call.
#[derive(Debug)]
pub struct PersistOutcome {
    pub destination: &'static str,
    pub result: Result<PathBuf, PersistError>,
}

/// What the processor produced.
#[derive(Debug)]
pub struct ProcessorReport {
    pub batches_received: usize,
    pub aggregate_len: usize,
    pub ranked_len: usize,
    /// Whether the run was cancelled before the drain finished.
    pub cancelled: bool,
    /// One entry per destination, in dispatch order.
    pub persisted: Vec<PersistOutcome>,
}

pub struct Processor<R> {
    renderer: Arc<R>,
    ranking: RankingSettings,
    ctx: RunContext,
}

impl<R: Renderer> Processor<R> {
    pub fn new(renderer: Arc<R>, ranking: RankingSettings, ctx: RunContext) -> Self {
        Self {
            renderer,
            ranking,
            ctx,
        }
    }

    /// Drain `batches` until every sender is gone, rank, and persist both
    /// collections.
    ///
    /// The channel is never closed from this side. On cancellation workers
    /// stop issuing fetches and drop their senders, so the drain still
    /// includes every batch from a fetch that was already in flight.
    pub async fn run(self, mut batches: BatchReceiver) -> ProcessorReport {
        let mut aggregate: Vec<FeedItem> = Vec::new();
        let mut batches_received = 0usize;

        while let Some(batch) = batches.recv().await {
            batches_received += 1;
            debug!(items = batch.len(), total = aggregate.len() + batch.len(), "Received batch");
            aggregate.extend(batch);
        }

        let cancelled = self.ctx.is_cancelled();
        if cancelled {
            warn!(received = aggregate.len(), "Run was cancelled; finalizing with items received");
        }

        info!(
            batches = batches_received,
            items = aggregate.len(),
            "Aggregation channel drained"
        );

        let ranked = most_rated(&aggregate, &self.ranking);
        info!(
            ranked = ranked.len(),
            top_k = self.ranking.top_k,
            start_date = %self.ranking.start_date,
            end_date = %self.ranking.end_date,
            "Ranked most rated items"
        );

        let mut persisted = Vec::with_capacity(2);
        for (destination, items) in [(ALL_NEWS, &aggregate), (MOST_RATED_NEWS, &ranked)] {
            let result = self.renderer.persist(destination, items).await;
            match &result {
                Ok(path) => info!(destination, path = %path.display(), items = items.len(), "Persisted"),
                Err(e) => error!(destination, error = %e, "Persist failed"),
            }
            persisted.push(PersistOutcome {
                destination,
                result,
            });
        }

        ProcessorReport {
            batches_received,
            aggregate_len: aggregate.len(),
            ranked_len: ranked.len(),
            cancelled,
            persisted,
        }
    }
}
