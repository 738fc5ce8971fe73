//! Request-scoped cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::MemBankError;

/// Cloneable cancellation flag bound to one request.
///
/// Long-running operations check it between iterations; engine queries in
/// flight are allowed to complete.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Return `Err(Cancelled)` if cancellation has been requested.
    pub fn check(&self) -> Result<(), MemBankError> {
        if self.is_cancelled() {
            Err(MemBankError::Cancelled)
        } else {
            Ok(())
        }
    }
}
