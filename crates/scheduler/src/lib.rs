//! Folio render scheduling primitives
//!
//! Cancellation tokens and settle-once render tasks. A page-view holds at
//! most one in-flight `RenderTask` at a time; before starting a new render it
//! cancels the previous task and waits for its settlement. Cancellation is
//! cooperative: the rasterization producer observes the token and stops
//! early, and the task settles as `Cancelled` rather than `Failed` so the
//! caller can tell supersession apart from a real error.
//!
//! # Example
//!
//! ```
//! use folio_scheduler::{render_task, Settlement};
//!
//! let (task, completer) = render_task();
//!
//! // Producer side (normally the raster source's worker):
//! completer.complete();
//!
//! // Consumer side:
//! assert_eq!(task.wait(), Settlement::Completed);
//! ```

mod cancel;
mod task;

pub use cancel::CancellationToken;
pub use task::{render_task, RenderTask, Settlement, TaskCompleter};
