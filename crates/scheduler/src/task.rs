//! Settle-once render tasks
//!
//! A `RenderTask` represents one in-flight rasterization. The consumer side
//! can cancel it and wait for settlement; the producer side (held by the
//! raster source) reports completion or failure through a `TaskCompleter`.
//!
//! Settlement is set exactly once. Cancelling an unsettled task settles it
//! as `Cancelled` immediately, so a caller that cancels and then waits never
//! blocks on a producer that has stopped looking at the token; a late
//! `complete()`/`fail()` from the producer is then a no-op.

use crate::CancellationToken;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Terminal state of a render task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// The rasterization produced pixels.
    Completed,
    /// The task was superseded by a newer render request. Expected, not an
    /// error; never triggers fallback or retry.
    Cancelled,
    /// The raster source could not produce pixels.
    Failed(String),
}

impl Settlement {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

#[derive(Default)]
struct Shared {
    settlement: Mutex<Option<Settlement>>,
    settled: Condvar,
}

impl Shared {
    /// Record the settlement if none exists yet. Returns whether this call
    /// settled the task.
    fn settle(&self, settlement: Settlement) -> bool {
        let mut slot = self.settlement.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return false;
        }
        *slot = Some(settlement);
        self.settled.notify_all();
        true
    }
}

/// Create a connected task/completer pair.
///
/// The `RenderTask` goes to the page-view that requested the render; the
/// `TaskCompleter` goes to the raster source producing the pixels.
pub fn render_task() -> (RenderTask, TaskCompleter) {
    let token = CancellationToken::new();
    let shared = Arc::new(Shared::default());

    let task = RenderTask { token: token.clone(), shared: Arc::clone(&shared) };
    let completer = TaskCompleter { token, shared, finished: false };

    (task, completer)
}

/// Consumer handle for an in-flight rasterization.
pub struct RenderTask {
    token: CancellationToken,
    shared: Arc<Shared>,
}

impl RenderTask {
    /// Request cancellation.
    ///
    /// Safe to call multiple times and after natural completion (no-op once
    /// settled). If the task has not settled yet, it settles as `Cancelled`
    /// here; the producer's eventual report is then ignored.
    pub fn cancel(&self) {
        self.token.cancel();
        self.shared.settle(Settlement::Cancelled);
    }

    /// The cancellation token shared with the producer.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Non-blocking settlement probe.
    pub fn settlement(&self) -> Option<Settlement> {
        self.shared.settlement.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Block until the task settles.
    pub fn wait(&self) -> Settlement {
        let mut slot = self.shared.settlement.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(settlement) = slot.clone() {
                return settlement;
            }
            slot = self.shared.settled.wait(slot).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Block until the task settles or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Settlement> {
        let mut slot = self.shared.settlement.lock().unwrap_or_else(|e| e.into_inner());
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if let Some(settlement) = slot.clone() {
                return Some(settlement);
            }
            let remaining = deadline.checked_duration_since(std::time::Instant::now())?;
            let (guard, result) = self
                .shared
                .settled
                .wait_timeout(slot, remaining)
                .unwrap_or_else(|e| e.into_inner());
            slot = guard;
            if result.timed_out() && slot.is_none() {
                return None;
            }
        }
    }
}

/// Producer handle for reporting the outcome of a rasterization.
pub struct TaskCompleter {
    token: CancellationToken,
    shared: Arc<Shared>,
    finished: bool,
}

impl TaskCompleter {
    /// The cancellation token the producer should poll.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Report success. Ignored if the task already settled.
    pub fn complete(mut self) {
        self.finished = true;
        self.shared.settle(Settlement::Completed);
    }

    /// Report failure. Ignored if the task already settled.
    pub fn fail(mut self, reason: impl Into<String>) {
        self.finished = true;
        self.shared.settle(Settlement::Failed(reason.into()));
    }

    /// Acknowledge cancellation. Equivalent to dropping the completer after
    /// observing a cancelled token; provided so producers can be explicit.
    pub fn cancelled(mut self) {
        self.finished = true;
        self.shared.settle(Settlement::Cancelled);
    }
}

impl Drop for TaskCompleter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // A producer that vanished without reporting settles the task so
        // waiters are not stranded.
        if self.token.is_cancelled() {
            self.shared.settle(Settlement::Cancelled);
        } else {
            self.shared.settle(Settlement::Failed("raster producer dropped without settling".into()));
        }
    }
}
