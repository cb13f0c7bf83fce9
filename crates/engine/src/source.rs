//! External collaborator seams
//!
//! `RasterSource` is the page-decode library's per-page interface: it
//! reports viewport sizes and rasterizes asynchronously into a pixel
//! buffer. `StateSink` is the application state collaborator that owns the
//! live zoom factor and scroll position.

use folio_scheduler::RenderTask;
use std::sync::{Arc, Mutex};
use viewer_core::{Dimensions, PixelSurface, Rotation, ScrollOffset};

/// One rasterization request.
///
/// The producer fills `target` at the requested pixel size and settles the
/// returned task; it should poll the task's cancellation token and stop
/// early once cancelled.
pub struct RasterRequest {
    /// Buffer to rasterize into, pre-sized to `width` x `height`.
    pub target: Arc<Mutex<PixelSurface>>,
    /// Target width in physical pixels.
    pub width: u32,
    /// Target height in physical pixels.
    pub height: u32,
    pub scale: f32,
    pub rotation: Rotation,
}

/// Per-page handle into the external document decoder.
///
/// Implementations wrap whatever page object the decoding library exposes.
/// Two handles refer to the same page when their `page_index` matches;
/// object identity is irrelevant.
pub trait RasterSource: Send + Sync {
    /// Underlying page index within the document.
    fn page_index(&self) -> u32;

    /// Logical page size at the given scale and rotation.
    fn viewport(&self, scale: f32, rotation: Rotation) -> Dimensions;

    /// Start rasterizing. Returns the in-flight task; rendering is
    /// asynchronous and cancellable.
    fn begin_raster(&self, request: RasterRequest) -> RenderTask;

    /// Selectable text of the page. Consumed by the text-layer
    /// collaborator, not by the render engine itself.
    fn text_content(&self) -> String {
        String::new()
    }
}

/// Application state owned by the host: live zoom and scroll position.
///
/// The zoom animation drives `set_zoom` on each progress tick and persists
/// the final value plus the compensated scroll offset at completion.
pub trait StateSink {
    fn zoom(&self) -> f32;
    fn set_zoom(&mut self, scale: f32);
    fn scroll(&self) -> ScrollOffset;
    fn set_scroll(&mut self, offset: ScrollOffset);
}
