//! Per-run observability and cancellation context.
//!
//! A [`RunContext`] is created by the caller, handed to the orchestrator,
//! and cloned into every worker and the processor. It carries the root
//! tracing span of the run (child spans for each task derive from it) and
//! the cancellation token that stops the run early.

use tokio_util::sync::CancellationToken;
use tracing::{Span, info_span};

#[derive(Debug, Clone)]
pub struct RunContext {
    span: Span,
    cancel: CancellationToken,
}

impl RunContext {
    /// Start a new run context with its own root span.
    pub fn new(cancel: CancellationToken) -> Self {
        let span = info_span!(
            "pipeline_run",
            started_at = %chrono::Local::now().to_rfc3339()
        );
        Self { span, cancel }
    }

    /// Root span of the run.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Span for worker `id`, parented to the run span.
    pub fn worker_span(&self, id: usize) -> Span {
        info_span!(parent: &self.span, "worker", id)
    }

    pub fn processor_span(&self) -> Span {
        info_span!(parent: &self.span, "processor")
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Request that the whole run stops.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
