//! GPU renderer
//!
//! Owns the session's single GPU device handle. Draw and upload calls from
//! different page-views are sequenced through one lock because the hardware
//! context has no parallel draw queue in this design.

use crate::{DrawParams, GpuDevice, GpuError, ZoomAnimation, ZoomAnimator, ZoomParams};
use folio_cache::GpuTexture;
use log::warn;
use std::sync::Mutex;
use std::time::Instant;
use viewer_core::PixelSurface;

pub struct GpuRenderer {
    device: Mutex<Box<dyn GpuDevice>>,
    animator: ZoomAnimator,
}

impl GpuRenderer {
    pub fn new(device: Box<dyn GpuDevice>) -> Self {
        Self { device: Mutex::new(device), animator: ZoomAnimator::new() }
    }

    /// Upload a pixel buffer into a new GPU texture.
    ///
    /// Failures are logged and returned so the controller can fall back to
    /// the software path for the current render.
    pub fn create_texture(&self, pixels: &PixelSurface) -> Result<GpuTexture, GpuError> {
        let mut device = self.device.lock().unwrap_or_else(|e| e.into_inner());
        device.create_texture(pixels).inspect_err(|err| {
            warn!("texture upload failed: {err}");
        })
    }

    /// Draw a page texture with the given filter, opacity and rotation.
    pub fn render_page(&self, texture: &GpuTexture, params: &DrawParams) -> Result<(), GpuError> {
        let mut device = self.device.lock().unwrap_or_else(|e| e.into_inner());
        device.draw(texture, params).inspect_err(|err| {
            warn!("page draw failed: {err}");
        })
    }

    /// Start a zoom interpolation, superseding any animation in flight.
    pub fn start_zoom_animation(&self, params: ZoomParams, now: Instant) -> ZoomAnimation {
        self.animator.start(params, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewer_core::Anchor;

    struct CountingDevice {
        uploads: u32,
        draws: u32,
        fail_uploads: bool,
    }

    impl GpuDevice for CountingDevice {
        fn create_texture(&mut self, pixels: &PixelSurface) -> Result<GpuTexture, GpuError> {
            if self.fail_uploads {
                return Err(GpuError::TextureCreationFailed("out of memory".into()));
            }
            self.uploads += 1;
            Ok(GpuTexture::new((), pixels.width(), pixels.height()))
        }

        fn draw(&mut self, _texture: &GpuTexture, _params: &DrawParams) -> Result<(), GpuError> {
            self.draws += 1;
            Ok(())
        }
    }

    #[test]
    fn test_upload_and_draw_round_trip() {
        let renderer = GpuRenderer::new(Box::new(CountingDevice {
            uploads: 0,
            draws: 0,
            fail_uploads: false,
        }));

        let surface = PixelSurface::new(4, 4);
        let texture = renderer.create_texture(&surface).expect("upload should succeed");
        assert_eq!(texture.width(), 4);

        renderer
            .render_page(&texture, &DrawParams::default())
            .expect("draw should succeed");
    }

    #[test]
    fn test_upload_failure_is_reported() {
        let renderer = GpuRenderer::new(Box::new(CountingDevice {
            uploads: 0,
            draws: 0,
            fail_uploads: true,
        }));

        let surface = PixelSurface::new(4, 4);
        let err = renderer.create_texture(&surface).unwrap_err();
        assert!(matches!(err, GpuError::TextureCreationFailed(_)));
    }

    #[test]
    fn test_zoom_animation_goes_through_renderer() {
        let renderer = GpuRenderer::new(Box::new(CountingDevice {
            uploads: 0,
            draws: 0,
            fail_uploads: false,
        }));

        let now = Instant::now();
        let mut animation = renderer.start_zoom_animation(
            ZoomParams {
                from: 1.0,
                to: 1.5,
                anchor: Anchor::new(0.25, 0.25),
                duration: std::time::Duration::ZERO,
            },
            now,
        );

        assert_eq!(animation.tick(now), crate::ZoomTick::Complete(1.5));
    }
}
