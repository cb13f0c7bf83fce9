//! Folio render engine
//!
//! Converts a paginated document page into displayed pixels through a
//! GPU-accelerated path or a software-raster fallback, backed by a
//! capacity-bounded cache of page textures keyed by (page, zoom level).
//! Rendering work is asynchronous and cancellable; in-use cache entries are
//! protected from eviction; the GPU path degrades transparently to
//! software; and a cursor-anchored zoom animation reuses cached textures
//! while preserving the scroll focus point.
//!
//! The document decoder and the application state store are external
//! collaborators behind the `RasterSource` and `StateSink` traits.

mod config;
mod controller;
mod engine;
mod source;

pub use config::EngineConfig;
pub use controller::{
    BackendKind, RenderController, RenderError, RenderInputs, RenderNotice, RenderOutcome,
    RenderPhase, ViewPrefs, ZoomOutcome, ZoomProgress, ZOOM_SETTLE_DELAY,
};
pub use engine::Engine;
pub use source::{RasterRequest, RasterSource, StateSink};
