//! Cursor-anchored zoom animation
//!
//! Interpolates a scale value over a fixed duration with a cubic ease-out
//! curve. Animations are driven externally: the host calls `tick` once per
//! display refresh with the current time, which keeps the interpolation
//! testable with synthetic clocks.
//!
//! Only one animation is live per animator. Starting a new one supersedes
//! the previous animation; its subsequent ticks yield `ZoomTick::Stale`, so
//! stale progress or completion callbacks can never fire after supersession.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::{Duration, Instant};
use viewer_core::Anchor;

/// Parameters for one zoom animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomParams {
    pub from: f32,
    pub to: f32,
    /// Fractional pointer position within the page surface that must stay
    /// visually fixed.
    pub anchor: Anchor,
    pub duration: Duration,
}

/// One animation step result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomTick {
    /// The interpolated scale for this step.
    Progress(f32),
    /// The animation reached its target. Emitted exactly once, with the
    /// exact target scale.
    Complete(f32),
    /// This animation was superseded or has already completed; ignore.
    Stale,
}

/// Issues zoom animations and tracks which one is live.
#[derive(Debug, Default)]
pub struct ZoomAnimator {
    live_generation: Arc<AtomicU64>,
}

impl ZoomAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new animation, superseding any animation in flight.
    pub fn start(&self, params: ZoomParams, now: Instant) -> ZoomAnimation {
        let generation = self.live_generation.fetch_add(1, Ordering::AcqRel) + 1;
        log::trace!(
            "zoom animation {}: {:.3} -> {:.3} over {:?}",
            generation,
            params.from,
            params.to,
            params.duration
        );

        ZoomAnimation {
            generation,
            live_generation: Arc::clone(&self.live_generation),
            params,
            started: now,
            done: false,
        }
    }
}

/// An in-flight zoom interpolation.
pub struct ZoomAnimation {
    generation: u64,
    live_generation: Arc<AtomicU64>,
    params: ZoomParams,
    started: Instant,
    done: bool,
}

impl ZoomAnimation {
    /// Advance the animation to `now`.
    ///
    /// The interpolation is monotonic and its last emission is
    /// `Complete(target)` with the exact target value.
    pub fn tick(&mut self, now: Instant) -> ZoomTick {
        if self.done || self.live_generation.load(Ordering::Acquire) != self.generation {
            return ZoomTick::Stale;
        }

        let progress = if self.params.duration.is_zero() {
            1.0
        } else {
            let elapsed = now.saturating_duration_since(self.started);
            (elapsed.as_secs_f32() / self.params.duration.as_secs_f32()).min(1.0)
        };

        if progress >= 1.0 {
            self.done = true;
            return ZoomTick::Complete(self.params.to);
        }

        let eased = ease_out_cubic(progress);
        ZoomTick::Progress(self.params.from + (self.params.to - self.params.from) * eased)
    }

    pub fn anchor(&self) -> Anchor {
        self.params.anchor
    }

    pub fn start_scale(&self) -> f32 {
        self.params.from
    }

    pub fn target_scale(&self) -> f32 {
        self.params.to
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Whether this animation has been superseded by a newer one.
    pub fn is_superseded(&self) -> bool {
        self.live_generation.load(Ordering::Acquire) != self.generation
    }
}

fn ease_out_cubic(t: f32) -> f32 {
    let inverse = 1.0 - t;
    1.0 - inverse * inverse * inverse
}
