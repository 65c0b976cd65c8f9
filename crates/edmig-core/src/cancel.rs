//! Run cancellation
//!
//! The embedder owns the token: it hands a clone to
//! `MigrationOrchestrator::with_cancellation` and flips it from wherever the
//! interrupt arrives. The `edmig` binary installs no handler, so an interrupt
//! there ends the process and the open transaction is never committed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::{MigrationError, Result};

/// Shared flag an operator interrupt flips to stop a run
///
/// Checked between documents, between preflight checks and between updates.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// # Errors
    /// * `Cancelled` - If the token has been cancelled
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MigrationError::Cancelled)
        } else {
            Ok(())
        }
    }
}
