//! Per page-view render controller
//!
//! Orchestrates the raster -> upload -> draw pipeline for a single page.
//! The controller is an explicit state machine driven by imperative calls:
//! `on_inputs_changed` when page/scale/rotation change, `poll` to advance an
//! in-flight rasterization, and `double_click_zoom`/`tick_zoom` for the
//! cursor-anchored zoom interaction.
//!
//! Renders for one page-view are strictly sequential: a new render first
//! cancels the previous task and observes its settlement. A `Cancelled`
//! settlement is the expected supersession outcome and is swallowed
//! silently; only `Failed` surfaces as an error, and a failed render leaves
//! the last good frame on the output surface.

use crate::{EngineConfig, RasterRequest, RasterSource, StateSink};
use folio_cache::{CacheKey, TextureCache};
use folio_gpu::{apply_filter, DrawParams, GpuRenderer, ZoomAnimation, ZoomParams, ZoomTick};
use folio_scheduler::{RenderTask, Settlement};
use log::{debug, warn};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use viewer_core::{
    compensate_scroll, scaled_pixel_size, Anchor, Dimensions, Filter, PixelSurface, Rotation,
    ScrollOffset, SurfaceError, ZoomLadder,
};

/// Delay the host should wait before restoring scroll on the non-animated
/// zoom path, long enough for layout to settle. Tunable.
pub const ZOOM_SETTLE_DELAY: Duration = Duration::from_millis(120);

/// Consecutive texture-creation failures before the GPU path is disabled
/// for the rest of the session.
const MAX_GPU_FAILURES: u32 = 3;

#[derive(Debug, Error)]
pub enum RenderError {
    /// The raster source could not produce pixels. The previous frame
    /// stays visible.
    #[error("rasterization failed: {0}")]
    Rasterization(String),

    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// Where the controller currently is in the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Idle,
    Rasterizing,
    Uploading,
    Drawn,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Gpu,
    Software,
}

/// Result of driving the controller one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// A frame was drawn by the given backend.
    Drawn(BackendKind),
    /// Rasterization started; call `poll` to advance it.
    Scheduled,
    /// The in-flight rasterization has not settled yet.
    Pending,
    /// The in-flight rasterization was superseded. Expected, not an error.
    Cancelled,
    /// Inputs match the last drawn frame; nothing to do.
    Unchanged,
    /// `poll` with nothing in flight.
    Idle,
}

/// The page inputs that drive a render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderInputs {
    pub scale: f32,
    pub rotation: Rotation,
}

/// Presentation preferences from the application state collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewPrefs {
    pub filter: Filter,
    pub filter_strength: f32,
    pub opacity: f32,
    pub device_pixel_ratio: f32,
    /// Host override forcing the software path.
    pub gpu_disabled: bool,
}

impl Default for ViewPrefs {
    fn default() -> Self {
        Self {
            filter: Filter::None,
            filter_strength: 1.0,
            opacity: 1.0,
            device_pixel_ratio: 1.0,
            gpu_disabled: false,
        }
    }
}

/// Emitted after every successful draw so downstream overlays (watermark
/// compositing) can position themselves against the same dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderNotice {
    pub page_index: u32,
    pub dimensions: Dimensions,
    pub backend: BackendKind,
}

/// Result of a double-click zoom trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomOutcome {
    /// An animation is running; drive it with `tick_zoom` each refresh.
    Animating { target: f32 },
    /// Single-step change applied. The host should apply `scroll` after
    /// `settle_delay` so the anchor point stays fixed once layout settles.
    Stepped { target: f32, scroll: ScrollOffset, settle_delay: Duration },
}

/// Result of one zoom animation tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomProgress {
    Progress(f32),
    Completed { scale: f32, scroll: ScrollOffset },
    /// No live animation (never started, finished, or superseded).
    Idle,
}

/// Memoization key for re-render avoidance. Page identity is the index,
/// never the handle's object identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MemoKey {
    page_index: u32,
    scale_bits: u32,
    rotation: Rotation,
    dpr_bits: u32,
}

struct PendingRender {
    task: RenderTask,
    memo: MemoKey,
    key: CacheKey,
    rotation: Rotation,
    backend: BackendKind,
    buffer: Arc<Mutex<PixelSurface>>,
    dims: Dimensions,
}

struct ZoomPlan {
    animation: ZoomAnimation,
    target: f32,
    anchor: Anchor,
    start_dims: Dimensions,
    end_dims: Dimensions,
    start_scroll: ScrollOffset,
}

pub struct RenderController {
    source: Arc<dyn RasterSource>,
    cache: Arc<TextureCache>,
    gpu: Option<Arc<GpuRenderer>>,
    prefs: ViewPrefs,
    ladder: ZoomLadder,
    dpr_cap: f32,
    zoom_animation_enabled: bool,
    zoom_duration: Duration,

    surface: Arc<Mutex<PixelSurface>>,
    dimensions: Dimensions,
    rotation: Rotation,
    phase: RenderPhase,
    pending: Option<PendingRender>,
    last_drawn: Option<MemoKey>,
    gpu_failures: u32,
    gpu_forced_off: bool,
    zoom_plan: Option<ZoomPlan>,
    listener: Option<Box<dyn Fn(&RenderNotice) + Send>>,
}

impl RenderController {
    pub(crate) fn new(
        source: Arc<dyn RasterSource>,
        cache: Arc<TextureCache>,
        gpu: Option<Arc<GpuRenderer>>,
        config: &EngineConfig,
        prefs: ViewPrefs,
    ) -> Self {
        Self {
            source,
            cache,
            gpu,
            prefs,
            ladder: ZoomLadder::new(config.zoom_ladder.clone()),
            dpr_cap: config.max_device_pixel_ratio,
            zoom_animation_enabled: config.zoom_animation_enabled,
            zoom_duration: Duration::from_millis(config.zoom_animation_ms),
            surface: Arc::new(Mutex::new(PixelSurface::new(1, 1))),
            dimensions: Dimensions::default(),
            rotation: Rotation::Deg0,
            phase: RenderPhase::Idle,
            pending: None,
            last_drawn: None,
            gpu_failures: 0,
            gpu_forced_off: false,
            zoom_plan: None,
            listener: None,
        }
    }

    /// The visible output surface, sized to the current render target.
    pub fn surface(&self) -> Arc<Mutex<PixelSurface>> {
        Arc::clone(&self.surface)
    }

    /// Logical page dimensions of the current render.
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    /// Whether the next render would take the GPU path.
    pub fn gpu_path_active(&self) -> bool {
        self.gpu.is_some() && !self.gpu_forced_off && !self.prefs.gpu_disabled
    }

    /// Register the render-succeeded listener.
    pub fn set_render_listener(&mut self, listener: Box<dyn Fn(&RenderNotice) + Send>) {
        self.listener = Some(listener);
    }

    /// Replace presentation preferences, forcing a redraw on the next
    /// input change.
    pub fn set_prefs(&mut self, prefs: ViewPrefs) {
        if prefs != self.prefs {
            self.prefs = prefs;
            self.last_drawn = None;
        }
    }

    /// Swap the page handle. Memoization compares underlying page indices,
    /// so a new handle for the same page does not invalidate anything.
    pub fn set_source(&mut self, source: Arc<dyn RasterSource>) {
        self.source = source;
    }

    /// React to a change of page identity, scale or rotation.
    ///
    /// Cancels and awaits any in-flight render first, then either draws
    /// straight from the texture cache (GPU hit) or schedules a new
    /// rasterization.
    pub fn on_inputs_changed(&mut self, inputs: RenderInputs) -> Result<RenderOutcome, RenderError> {
        let memo = self.memo_key(&inputs);

        if self.pending.as_ref().is_some_and(|p| p.memo == memo) {
            return Ok(RenderOutcome::Pending);
        }
        if self.pending.is_none() && self.last_drawn == Some(memo) {
            return Ok(RenderOutcome::Unchanged);
        }

        self.cancel_active();
        self.start_render(inputs, memo)
    }

    /// Cancel any in-flight render and observe its settlement.
    pub fn cancel_active(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        pending.task.cancel();
        match pending.task.wait() {
            Settlement::Cancelled => {
                debug!("render for page {} superseded", pending.key.page_index());
            }
            Settlement::Completed => {
                // Finished just before the cancel landed; the result is
                // stale and gets discarded.
                debug!("render for page {} completed late; discarding", pending.key.page_index());
            }
            Settlement::Failed(reason) => {
                debug!("superseded render for page {} had failed: {reason}", pending.key.page_index());
            }
        }
        self.phase = RenderPhase::Cancelled;
    }

    /// Advance the in-flight rasterization, finishing the pipeline when it
    /// has settled.
    pub fn poll(&mut self) -> Result<RenderOutcome, RenderError> {
        let Some(pending) = self.pending.take() else {
            return Ok(RenderOutcome::Idle);
        };

        match pending.task.settlement() {
            None => {
                self.pending = Some(pending);
                Ok(RenderOutcome::Pending)
            }
            Some(Settlement::Cancelled) => {
                self.phase = RenderPhase::Cancelled;
                Ok(RenderOutcome::Cancelled)
            }
            Some(Settlement::Failed(reason)) => {
                // Previous frame stays on the surface; no blank frame.
                self.phase = RenderPhase::Idle;
                warn!("rasterization failed for page {}: {reason}", pending.key.page_index());
                Err(RenderError::Rasterization(reason))
            }
            Some(Settlement::Completed) => match pending.backend {
                BackendKind::Gpu => self.upload_and_draw(pending),
                BackendKind::Software => self.commit_software(pending),
            },
        }
    }

    fn memo_key(&self, inputs: &RenderInputs) -> MemoKey {
        MemoKey {
            page_index: self.source.page_index(),
            scale_bits: inputs.scale.to_bits(),
            rotation: inputs.rotation,
            dpr_bits: self.prefs.device_pixel_ratio.to_bits(),
        }
    }

    fn draw_params(&self, rotation: Rotation) -> DrawParams {
        DrawParams {
            filter: self.prefs.filter,
            filter_strength: self.prefs.filter_strength,
            opacity: self.prefs.opacity,
            rotation,
        }
    }

    fn start_render(&mut self, inputs: RenderInputs, memo: MemoKey) -> Result<RenderOutcome, RenderError> {
        let viewport = self.source.viewport(inputs.scale, inputs.rotation);
        let (width, height) =
            scaled_pixel_size(viewport, self.prefs.device_pixel_ratio, self.dpr_cap);
        let key = CacheKey::new(self.source.page_index(), inputs.scale);
        self.rotation = inputs.rotation;

        if self.gpu_path_active() {
            if let Some(lease) = self.cache.acquire(key) {
                // Cache hit: size the output to the cached texture's pixel
                // dimensions and draw without rasterizing.
                self.resize_surface(lease.width(), lease.height());
                let params = self.draw_params(inputs.rotation);
                let drawn = match &self.gpu {
                    Some(gpu) => gpu.render_page(lease.texture(), &params).is_ok(),
                    None => false,
                };
                drop(lease);

                if drawn {
                    self.finish_drawn(memo, viewport, BackendKind::Gpu);
                    return Ok(RenderOutcome::Drawn(BackendKind::Gpu));
                }
                // Draw failure: re-raster below and present via software.
            }
        }

        let backend = if self.gpu_path_active() {
            BackendKind::Gpu
        } else {
            BackendKind::Software
        };

        let buffer = Arc::new(Mutex::new(PixelSurface::new(width, height)));
        let task = self.source.begin_raster(RasterRequest {
            target: Arc::clone(&buffer),
            width,
            height,
            scale: inputs.scale,
            rotation: inputs.rotation,
        });

        self.phase = RenderPhase::Rasterizing;
        self.pending = Some(PendingRender {
            task,
            memo,
            key,
            rotation: inputs.rotation,
            backend,
            buffer,
            dims: viewport,
        });
        Ok(RenderOutcome::Scheduled)
    }

    fn upload_and_draw(&mut self, pending: PendingRender) -> Result<RenderOutcome, RenderError> {
        self.phase = RenderPhase::Uploading;

        let Some(gpu) = self.gpu.clone() else {
            return self.commit_software(pending);
        };

        let upload = {
            let buffer = pending.buffer.lock().unwrap_or_else(|e| e.into_inner());
            gpu.create_texture(&buffer)
        };

        match upload {
            Ok(texture) => {
                self.gpu_failures = 0;
                let lease = self.cache.insert_and_acquire(pending.key, texture);
                self.resize_surface(lease.width(), lease.height());
                let params = self.draw_params(pending.rotation);
                let drawn = gpu.render_page(lease.texture(), &params).is_ok();
                drop(lease);

                if !drawn {
                    return self.commit_software(pending);
                }
                let dims = pending.dims;
                self.finish_drawn(pending.memo, dims, BackendKind::Gpu);
                Ok(RenderOutcome::Drawn(BackendKind::Gpu))
            }
            Err(err) => {
                self.gpu_failures += 1;
                if self.gpu_failures >= MAX_GPU_FAILURES && !self.gpu_forced_off {
                    self.gpu_forced_off = true;
                    warn!(
                        "disabling GPU path after {} consecutive texture failures",
                        self.gpu_failures
                    );
                }
                debug!("texture creation failed, software fallback for this render: {err}");
                self.commit_software(pending)
            }
        }
    }

    fn commit_software(&mut self, pending: PendingRender) -> Result<RenderOutcome, RenderError> {
        {
            let buffer = pending.buffer.lock().unwrap_or_else(|e| e.into_inner());
            let mut surface = self.surface.lock().unwrap_or_else(|e| e.into_inner());
            surface.resize(buffer.width(), buffer.height());
            surface.write_pixels(buffer.pixels())?;
            apply_filter(&mut surface, self.prefs.filter, self.prefs.filter_strength);
        }

        let dims = pending.dims;
        self.finish_drawn(pending.memo, dims, BackendKind::Software);
        Ok(RenderOutcome::Drawn(BackendKind::Software))
    }

    fn finish_drawn(&mut self, memo: MemoKey, dims: Dimensions, backend: BackendKind) {
        self.phase = RenderPhase::Drawn;
        self.last_drawn = Some(memo);
        self.dimensions = dims;

        if let Some(listener) = &self.listener {
            listener(&RenderNotice { page_index: memo.page_index, dimensions: dims, backend });
        }
    }

    fn resize_surface(&self, width: u32, height: u32) {
        let mut surface = self.surface.lock().unwrap_or_else(|e| e.into_inner());
        if surface.width() != width || surface.height() != height {
            surface.resize(width, height);
        }
    }

    /// Double-click (or zoom-shortcut) trigger.
    ///
    /// Cycles the target scale through the zoom ladder anchored at the
    /// pointer position. Animates via the GPU renderer when enabled and
    /// available; otherwise applies a single-step change and reports the
    /// compensated scroll offset for the host to apply after
    /// `settle_delay`.
    pub fn double_click_zoom(
        &mut self,
        anchor: Anchor,
        base_scale: f32,
        state: &mut dyn StateSink,
        now: Instant,
    ) -> ZoomOutcome {
        let visual = state.zoom();

        // A trigger during a running animation supersedes it and steps the
        // ladder from the superseded target. Scroll has not been restored
        // yet in that case, so anchor compensation still works from the
        // superseded animation's starting layout.
        let (current, start_dims, start_scroll) = match self.zoom_plan.take() {
            Some(plan) => (plan.target, plan.start_dims, plan.start_scroll),
            None => (visual, self.source.viewport(visual, self.rotation), state.scroll()),
        };
        let target = self.ladder.next_scale(base_scale, current);
        let end_dims = self.source.viewport(target, self.rotation);

        if self.zoom_animation_enabled {
            if let Some(gpu) = &self.gpu {
                let animation = gpu.start_zoom_animation(
                    ZoomParams { from: visual, to: target, anchor, duration: self.zoom_duration },
                    now,
                );
                self.zoom_plan =
                    Some(ZoomPlan { animation, target, anchor, start_dims, end_dims, start_scroll });
                return ZoomOutcome::Animating { target };
            }
        }

        state.set_zoom(target);
        let scroll = compensate_scroll(anchor, start_dims, end_dims, start_scroll);
        ZoomOutcome::Stepped { target, scroll, settle_delay: ZOOM_SETTLE_DELAY }
    }

    /// Advance the zoom animation one display refresh.
    ///
    /// Updates the global zoom on each progress tick and restores the
    /// scroll offset at completion so the anchor point stays visually
    /// fixed.
    pub fn tick_zoom(&mut self, state: &mut dyn StateSink, now: Instant) -> ZoomProgress {
        let Some(plan) = &mut self.zoom_plan else {
            return ZoomProgress::Idle;
        };

        match plan.animation.tick(now) {
            ZoomTick::Progress(scale) => {
                state.set_zoom(scale);
                ZoomProgress::Progress(scale)
            }
            ZoomTick::Complete(scale) => {
                state.set_zoom(scale);
                let scroll =
                    compensate_scroll(plan.anchor, plan.start_dims, plan.end_dims, plan.start_scroll);
                state.set_scroll(scroll);
                self.zoom_plan = None;
                ZoomProgress::Completed { scale, scroll }
            }
            ZoomTick::Stale => {
                self.zoom_plan = None;
                ZoomProgress::Idle
            }
        }
    }
}
