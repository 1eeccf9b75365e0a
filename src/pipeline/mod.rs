//! Concurrent fetch and aggregate pipeline.
//!
//! # Architecture
//!
//! ```text
//!              ┌──────────┐
//!   pages ───▶ │ worker 0 │──┐
//!              ├──────────┤  │   unbounded     ┌───────────┐    ┌──────────┐
//!   pages ───▶ │ worker 1 │──┼──▶  channel ──▶ │ processor │──▶ │ renderer │
//!              ├──────────┤  │  Vec<FeedItem>  └───────────┘    └──────────┘
//!   pages ───▶ │ worker N │──┘
//!              └──────────┘
//!        (shared RateLimiter)
//! ```
//!
//! 1. The [`Pipeline`] spawns the processor and `N` workers on the runtime's
//!    thread pool.
//! 2. Each worker walks its own page cursor, fetching under the shared
//!    [`RateLimiter`] and sending every non-empty page as one batch.
//! 3. The processor takes ownership of batches as they arrive and builds the
//!    aggregate. No other task ever sees it.
//! 4. Once every worker has finished the pipeline drops the last sender,
//!    which closes the channel. The processor drains what is left, ranks,
//!    and persists.
//!
//! A deadline or an external cancel (through [`RunContext`]) stops workers
//! from issuing new fetches. Fetches already in flight still deliver their
//! batches, and the processor finalizes once the last worker is done.

pub mod context;
pub mod limiter;
pub mod processor;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use context::RunContext;
pub use limiter::RateLimiter;
pub use processor::Processor;
pub use worker::{Worker, WorkerReport};

use crate::api::FetchPage;
use crate::config::{PipelineSettings, RankingSettings};
use crate::models::FeedItem;
use crate::outputs::{PersistError, Renderer};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{Instrument, info, warn};

/// Producer side of the aggregation channel.
pub type BatchSender = mpsc::UnboundedSender<Vec<FeedItem>>;
/// Consumer side of the aggregation channel.
pub type BatchReceiver = mpsc::UnboundedReceiver<Vec<FeedItem>>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to persist {destination}: {source}")]
    Persist {
        destination: &'static str,
        source: PersistError,
    },

    #[error("{task} task did not complete: {source}")]
    Task {
        task: String,
        source: JoinError,
    },
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunSummary {
    /// Items in the full aggregate.
    pub aggregate_len: usize,
    /// Items in the ranked top-K.
    pub ranked_len: usize,
    pub workers: Vec<WorkerReport>,
    /// Highest number of fetches observed in flight at once.
    pub peak_in_flight: usize,
    /// Whether the run was cut short by cancellation or the deadline.
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn pages_attempted(&self) -> usize {
        self.workers.iter().map(|w| w.pages_attempted).sum()
    }

    pub fn pages_failed(&self) -> usize {
        self.workers.iter().map(|w| w.pages_failed).sum()
    }

    pub fn items_sent(&self) -> usize {
        self.workers.iter().map(|w| w.items_sent).sum()
    }
}

/// The orchestrator: wires workers, the channel and the processor together
/// for one run.
pub struct Pipeline<S, R> {
    settings: PipelineSettings,
    ranking: RankingSettings,
    source: Arc<S>,
    renderer: Arc<R>,
}

impl<S: FetchPage, R: Renderer> Pipeline<S, R> {
    pub fn new(
        settings: PipelineSettings,
        ranking: RankingSettings,
        source: Arc<S>,
        renderer: Arc<R>,
    ) -> Self {
        Self {
            settings,
            ranking,
            source,
            renderer,
        }
    }

    /// Run the pipeline to completion.
    ///
    /// Returns only after every worker and the processor have finished.
    /// Both collections are always handed to the renderer; if either
    /// persist failed the first failure is returned after both attempts.
    pub async fn run(&self, ctx: RunContext) -> Result<RunSummary, PipelineError> {
        let span = ctx.span().clone();
        self.run_inner(ctx).instrument(span).await
    }

    async fn run_inner(&self, ctx: RunContext) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        let worker_count = self.settings.workers.max(1);
        let limiter = RateLimiter::new(self.settings.max_concurrent_requests);
        let (tx, rx) = mpsc::unbounded_channel::<Vec<FeedItem>>();

        info!(
            workers = worker_count,
            page_size = self.settings.page_size,
            max_page = self.settings.max_page,
            max_concurrent_requests = limiter.capacity(),
            deadline = ?self.settings.deadline(),
            "Starting pipeline"
        );

        let deadline = self.settings.deadline().map(|limit| {
            let token = ctx.cancel_token().clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(limit) => {
                        warn!(?limit, "Deadline reached; cancelling run");
                        token.cancel();
                    }
                    _ = token.cancelled() => {}
                }
            })
        });

        let processor = Processor::new(Arc::clone(&self.renderer), self.ranking.clone(), ctx.clone());
        let processor_handle = tokio::spawn(processor.run(rx).instrument(ctx.processor_span()));

        let worker_handles: Vec<_> = (0..worker_count)
            .map(|id| {
                let worker = Worker::new(
                    id,
                    worker_count,
                    self.settings.page_size,
                    self.settings.max_page,
                    Arc::clone(&self.source),
                    limiter.clone(),
                    tx.clone(),
                    ctx.clone(),
                );
                tokio::spawn(worker.run().instrument(ctx.worker_span(id)))
            })
            .collect();

        let mut workers = Vec::with_capacity(worker_count);
        let mut first_failure = None;
        for (id, joined) in join_all(worker_handles).await.into_iter().enumerate() {
            match joined {
                Ok(report) => workers.push(report),
                Err(source) => {
                    warn!(worker = id, error = %source, "Worker task failed");
                    if first_failure.is_none() {
                        first_failure = Some(PipelineError::Task {
                            task: format!("worker {id}"),
                            source,
                        });
                    }
                }
            }
        }

        // last sender gone: the channel is closed once the processor drains it
        drop(tx);

        let report = processor_handle.await.map_err(|source| PipelineError::Task {
            task: "processor".to_string(),
            source,
        })?;

        if let Some(timer) = deadline {
            timer.abort();
        }

        let summary = RunSummary {
            aggregate_len: report.aggregate_len,
            ranked_len: report.ranked_len,
            workers,
            peak_in_flight: limiter.peak_in_flight(),
            cancelled: report.cancelled,
            elapsed: started.elapsed(),
        };

        info!(
            batches = report.batches_received,
            aggregate = summary.aggregate_len,
            ranked = summary.ranked_len,
            pages_attempted = summary.pages_attempted(),
            pages_failed = summary.pages_failed(),
            peak_in_flight = summary.peak_in_flight,
            cancelled = summary.cancelled,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Pipeline finished"
        );

        if let Some(err) = first_failure {
            return Err(err);
        }
        for outcome in report.persisted {
            if let Err(source) = outcome.result {
                return Err(PipelineError::Persist {
                    destination: outcome.destination,
                    source,
                });
            }
        }
        Ok(summary)
    }
}
