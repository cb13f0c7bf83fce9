//! Document-session engine handle
//!
//! Owns the resources shared by every page-view of one open document: the
//! texture cache and the GPU renderer. Explicit lifecycle (`open`/`close`)
//! instead of module-global singletons; dropping the engine closes it.

use crate::{EngineConfig, RasterSource, RenderController, ViewPrefs};
use folio_cache::TextureCache;
use folio_gpu::{GpuDevice, GpuRenderer};
use log::{debug, warn};
use std::sync::Arc;

pub struct Engine {
    config: EngineConfig,
    cache: Arc<TextureCache>,
    gpu: Option<Arc<GpuRenderer>>,
}

impl Engine {
    /// Open a document session.
    ///
    /// `device` is the GPU context acquired at startup, or `None` when none
    /// was available; in that case every render in the session takes the
    /// software path.
    pub fn open(config: EngineConfig, device: Option<Box<dyn GpuDevice>>) -> Self {
        let cache = Arc::new(TextureCache::new(config.cache_capacity));

        let gpu = if !config.gpu_enabled {
            debug!("GPU rendering disabled by configuration");
            None
        } else {
            match device {
                Some(device) => Some(Arc::new(GpuRenderer::new(device))),
                None => {
                    warn!("no GPU context acquired; session falls back to software rendering");
                    None
                }
            }
        };

        Self { config, cache, gpu }
    }

    /// Create the render controller for one page-view.
    ///
    /// All page-views of the session share the same texture cache and GPU
    /// renderer.
    pub fn page_view(&self, source: Arc<dyn RasterSource>, prefs: ViewPrefs) -> RenderController {
        RenderController::new(
            source,
            Arc::clone(&self.cache),
            self.gpu.clone(),
            &self.config,
            prefs,
        )
    }

    pub fn cache(&self) -> &Arc<TextureCache> {
        &self.cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn has_gpu(&self) -> bool {
        self.gpu.is_some()
    }

    /// Close the session, releasing every cached GPU texture.
    pub fn close(&mut self) {
        self.cache.clear();
        self.gpu = None;
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.close();
    }
}
