//! Folio GPU layer
//!
//! Platform-agnostic GPU interface: pixel-buffer upload into textures, a
//! textured-quad draw call with post-process filter parameters, and the
//! time-based zoom animation. The concrete device (Metal, Vulkan, a test
//! mock) lives behind the `GpuDevice` trait.

mod device;
mod filter;
mod renderer;
mod zoom;

pub use device::{DrawParams, GpuDevice, GpuError};
pub use filter::apply_filter;
pub use renderer::GpuRenderer;
pub use zoom::{ZoomAnimation, ZoomAnimator, ZoomParams, ZoomTick};
