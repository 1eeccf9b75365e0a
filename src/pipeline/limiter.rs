//! Admission control for page fetches.
//!
//! A [`RateLimiter`] is a counting semaphore shared by every worker. A
//! worker holds a [`FetchPermit`] for the whole fetch attempt; dropping the
//! permit returns it, so release happens on every exit path including a
//! failed fetch or a cancelled task.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Caps the number of fetches in flight across all workers.
///
/// Cloning is cheap and every clone shares the same permits. Waiters are
/// not guaranteed to be served in any particular order across workers.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl RateLimiter {
    /// Create a limiter with `capacity` permits. A capacity of zero is
    /// raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait until a permit is free and take it.
    ///
    /// # Errors
    ///
    /// Fails only if the underlying semaphore is closed, which nothing in
    /// this type does.
    pub async fn acquire(&self) -> Result<FetchPermit, AcquireError> {
        let permit = Arc::clone(&self.semaphore).acquire_owned().await?;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(FetchPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently held.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of permits ever held at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// A held fetch slot. Released on drop.
#[derive(Debug)]
pub struct FetchPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for FetchPermit {
    fn drop(&mut self) {
        // runs before the semaphore permit field is dropped
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
