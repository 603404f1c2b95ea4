//! Cooperative cancellation for superseded analysis runs.
//!
//! Each edit batch the driver processes carries a [`CancellationToken`].
//! When a newer batch arrives, the driver trips the older batch's token;
//! in-flight stages observe it at block boundaries between stages (and
//! inside per-file parallel loops) and bail out with [`Cancelled`].
//! Partial results of a cancelled run are discarded, never published.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Error value signalling that the current unit of work was superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "analysis cancelled by a newer edit")
    }
}

impl std::error::Error for Cancelled {}

/// Shared cancellation flag, cheap to clone across worker threads.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Stage-boundary check: `Err(Cancelled)` once the token is tripped.
    #[inline]
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
