//! Cooperative cancellation for long optimization runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use adhtc_types::{AdhtcResult, OptimizationError};

/// Shared abort flag, optionally paired with a deadline.
///
/// Clones observe the same flag. Optimizers poll it once per generation,
/// iteration or grid row.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also trips once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fail with [`OptimizationError::Cancelled`] if the run should stop.
    pub fn check(&self, iteration: usize) -> AdhtcResult<()> {
        if self.is_cancelled() {
            return Err(OptimizationError::Cancelled { iteration }.into());
        }
        Ok(())
    }
}
