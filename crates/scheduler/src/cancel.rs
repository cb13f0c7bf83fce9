//! Cancellation token for cooperative render cancellation
//!
//! A rasterization producer periodically checks its token and stops early
//! once it observes cancellation. All clones share the same underlying flag.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cancellation token for cooperative cancellation
///
/// Producers can periodically check `is_cancelled()` to determine if they
/// should stop working. Multiple tokens can share the same underlying
/// cancellation state via Arc.
///
/// # Example
///
/// ```
/// use folio_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let producer_token = token.clone();
///
/// token.cancel();
/// assert!(producer_token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new token in the non-cancelled state.
    pub fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)) }
    }

    /// Cancel this token.
    ///
    /// All clones observe the cancellation. Idempotent: calling it multiple
    /// times is safe and has no further effect.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether `cancel()` has been called on this token or any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
