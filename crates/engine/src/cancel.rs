//! Cooperative query cancellation
//!
//! A [`CancellationToken`] is a shared flag. The caller keeps one clone and
//! flips it; the engine polls its clone at a fixed record interval and
//! abandons the scan with [`QueryError::Cancelled`]. No partial result is
//! ever returned.

use invoscope_core::QueryError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once cancellation was requested
    pub fn check(&self) -> Result<(), QueryError> {
        if self.is_cancelled() {
            Err(QueryError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Polls a token every `interval` ticks
#[derive(Debug)]
pub(crate) struct CancelCheck<'a> {
    token: &'a CancellationToken,
    interval: usize,
    ticks: usize,
}

impl<'a> CancelCheck<'a> {
    pub(crate) fn new(token: &'a CancellationToken, interval: usize) -> Self {
        Self {
            token,
            interval: interval.max(1),
            ticks: 0,
        }
    }

    /// Count one unit of work, polling the token on interval boundaries
    pub(crate) fn tick(&mut self) -> Result<(), QueryError> {
        self.ticks += 1;
        if self.ticks % self.interval == 0 {
            self.token.check()
        } else {
            Ok(())
        }
    }
}
