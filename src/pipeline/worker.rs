//! Page-fetching workers.
//!
//! Worker `w` of `N` owns the page cursor `w+1, w+1+N, w+1+2N, …` up to the
//! page bound, so no two workers ever request the same page. For each page
//! the worker takes a fetch permit, fetches, forwards a non-empty batch to
//! the aggregation channel, and releases the permit. A failed page is
//! logged and skipped; it never stops the worker.

use super::BatchSender;
use super::context::RunContext;
use super::limiter::RateLimiter;
use crate::api::FetchPage;
use std::iter::StepBy;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Page numbers visited by worker `worker_id` of `worker_count`, in order.
///
/// Empty when the worker's first page is already past `max_page`, or when
/// `worker_id + 1` is not a valid page number at all.
pub fn page_cursor(
    worker_id: usize,
    worker_count: usize,
    max_page: u32,
) -> StepBy<RangeInclusive<u32>> {
    let first = worker_id
        .checked_add(1)
        .and_then(|page| u32::try_from(page).ok());
    let (start, end) = match first {
        Some(first) => (first, max_page),
        None => (1, 0),
    };
    (start..=end).step_by(worker_count.max(1))
}

/// What one worker did during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    /// Pages for which a fetch was issued.
    pub pages_attempted: usize,
    /// Pages that returned at least one item and were forwarded.
    pub pages_with_items: usize,
    /// Pages that succeeded but returned nothing.
    pub pages_empty: usize,
    /// Pages whose fetch failed.
    pub pages_failed: usize,
    /// Items forwarded to the aggregation channel.
    pub items_sent: usize,
    /// Whether the worker stopped before finishing its cursor.
    pub stopped_early: bool,
}

/// One worker of the fetch pool.
pub struct Worker<S> {
    id: usize,
    worker_count: usize,
    page_size: u32,
    max_page: u32,
    source: Arc<S>,
    limiter: RateLimiter,
    batches: BatchSender,
    ctx: RunContext,
}

impl<S: FetchPage> Worker<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        worker_count: usize,
        page_size: u32,
        max_page: u32,
        source: Arc<S>,
        limiter: RateLimiter,
        batches: BatchSender,
        ctx: RunContext,
    ) -> Self {
        Self {
            id,
            worker_count,
            page_size,
            max_page,
            source,
            limiter,
            batches,
            ctx,
        }
    }

    /// Walk the page cursor to the end, or until the run is cancelled or
    /// the aggregation channel stops accepting batches.
    pub async fn run(self) -> WorkerReport {
        let mut report = WorkerReport {
            worker_id: self.id,
            ..Default::default()
        };
        let cancel = self.ctx.cancel_token().clone();

        for page in page_cursor(self.id, self.worker_count, self.max_page) {
            if cancel.is_cancelled() {
                info!(page, "Run cancelled; not fetching further pages");
                report.stopped_early = true;
                break;
            }

            let _permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(page, "Run cancelled while waiting for a fetch slot");
                    report.stopped_early = true;
                    break;
                }
                acquired = self.limiter.acquire() => match acquired {
                    Ok(permit) => permit,
                    Err(e) => {
                        warn!(page, error = %e, "Rate limiter closed; stopping worker");
                        report.stopped_early = true;
                        break;
                    }
                },
            };

            debug!(
                page,
                page_size = self.page_size,
                in_flight = self.limiter.in_flight(),
                "Fetching page"
            );
            report.pages_attempted += 1;

            match self.source.fetch_page(page, self.page_size).await {
                Ok(items) if items.is_empty() => {
                    debug!(page, "Page returned no items");
                    report.pages_empty += 1;
                }
                Ok(items) => {
                    let count = items.len();
                    if self.batches.send(items).is_err() {
                        warn!(page, items = count, "Aggregation channel closed; dropping batch and stopping");
                        report.stopped_early = true;
                        break;
                    }
                    debug!(page, items = count, "Forwarded batch");
                    report.pages_with_items += 1;
                    report.items_sent += count;
                }
                Err(e) => {
                    error!(page, error = %e, "Page fetch failed; continuing with next page");
                    report.pages_failed += 1;
                }
            }
        }

        info!(
            attempted = report.pages_attempted,
            with_items = report.pages_with_items,
            empty = report.pages_empty,
            failed = report.pages_failed,
            items = report.items_sent,
            stopped_early = report.stopped_early,
            "Worker finished"
        );
        report
    }
}
