//! GPU device abstraction

use folio_cache::GpuTexture;
use thiserror::Error;
use viewer_core::{Filter, PixelSurface, Rotation};

/// GPU backend error
#[derive(Debug, Error)]
pub enum GpuError {
    /// No GPU context could be acquired at startup; the session falls back
    /// to software rendering permanently.
    #[error("GPU context unavailable: {0}")]
    ContextUnavailable(String),

    /// Texture allocation or upload failed (context lost, allocation
    /// limit). The caller falls back to the software path for this render.
    #[error("texture creation failed: {0}")]
    TextureCreationFailed(String),

    /// A draw call failed.
    #[error("draw failed: {0}")]
    DrawFailed(String),
}

/// Parameters for drawing a page texture.
///
/// Filters are applied as a post-process over the sampled texture; cached
/// pixel data is never modified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawParams {
    pub filter: Filter,
    /// Blend factor for the filter, in [0, 1].
    pub filter_strength: f32,
    /// Overall opacity of the quad, in [0, 1].
    pub opacity: f32,
    pub rotation: Rotation,
}

impl Default for DrawParams {
    fn default() -> Self {
        Self {
            filter: Filter::None,
            filter_strength: 1.0,
            opacity: 1.0,
            rotation: Rotation::Deg0,
        }
    }
}

/// Platform GPU device.
///
/// One shared handle per session. Draw calls are sequenced by the
/// `GpuRenderer` wrapper; implementations do not need their own locking.
pub trait GpuDevice: Send {
    /// Upload a pixel buffer into a new GPU texture.
    ///
    /// Failure is reported, never swallowed: the renderer logs it and the
    /// controller falls back to the software path.
    fn create_texture(&mut self, pixels: &PixelSurface) -> Result<GpuTexture, GpuError>;

    /// Draw a textured quad covering the output surface.
    ///
    /// Assumes the texture is valid; has no cache awareness.
    fn draw(&mut self, texture: &GpuTexture, params: &DrawParams) -> Result<(), GpuError>;
}
