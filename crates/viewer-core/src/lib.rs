use thiserror::Error;

/// Page rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    pub fn from_degrees(degrees: u16) -> Self {
        match degrees % 360 {
            90 => Self::Deg90,
            180 => Self::Deg180,
            270 => Self::Deg270,
            _ => Self::Deg0,
        }
    }

    /// Whether this rotation swaps the page's width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Post-process filter applied when a page is drawn.
///
/// Filters never touch cached pixel data; they are applied over the sampled
/// texture (GPU path) or the output surface (software path).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    None,
    Dark,
    Sepia,
}

/// Logical page size at a given scale and rotation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
}

impl Dimensions {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// A point expressed as fractional coordinates within a page surface.
///
/// (0, 0) is the top-left corner, (1, 1) the bottom-right. Values are
/// clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
}

impl Anchor {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x: x.clamp(0.0, 1.0), y: y.clamp(0.0, 1.0) }
    }

    pub const CENTER: Anchor = Anchor { x: 0.5, y: 0.5 };
}

/// Scroll position of the viewport over the page surface, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollOffset {
    pub x: f32,
    pub y: f32,
}

impl ScrollOffset {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Compute the physical pixel size of a render target.
///
/// The device pixel ratio is capped to bound memory and GPU cost on
/// high-density displays. Both render backends size their output with this
/// function so layout is identical regardless of backend.
pub fn scaled_pixel_size(viewport: Dimensions, dpr: f32, dpr_cap: f32) -> (u32, u32) {
    let ratio = dpr.max(1.0).min(dpr_cap.max(1.0));
    let width = (viewport.width * ratio).round().max(1.0) as u32;
    let height = (viewport.height * ratio).round().max(1.0) as u32;
    (width, height)
}

/// Scroll offset that keeps the content point at `anchor` under the pointer
/// after the page surface resizes from `old_dims` to `new_dims`.
///
/// The pointer's screen position is `anchor * old_dims - scroll`; solving for
/// the new offset that preserves it gives `scroll + anchor * (new - old)`.
pub fn compensate_scroll(
    anchor: Anchor,
    old_dims: Dimensions,
    new_dims: Dimensions,
    scroll: ScrollOffset,
) -> ScrollOffset {
    ScrollOffset {
        x: scroll.x + anchor.x * (new_dims.width - old_dims.width),
        y: scroll.y + anchor.y * (new_dims.height - old_dims.height),
    }
}

/// Zoom ladder for double-click zoom cycling.
///
/// Multipliers are relative to the base scale; cycling walks base -> each
/// rung in order -> back to base.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomLadder {
    multipliers: Vec<f32>,
}

impl ZoomLadder {
    pub fn new(multipliers: Vec<f32>) -> Self {
        Self { multipliers }
    }

    pub fn multipliers(&self) -> &[f32] {
        &self.multipliers
    }

    /// Next scale on the ladder after `current`, relative to `base`.
    ///
    /// Returns the first rung strictly above the current scale, or `base`
    /// once the top rung is reached.
    pub fn next_scale(&self, base: f32, current: f32) -> f32 {
        const EPSILON: f32 = 1e-3;

        for multiplier in &self.multipliers {
            let rung = base * multiplier;
            if rung > current * (1.0 + EPSILON) {
                return rung;
            }
        }

        base
    }
}

impl Default for ZoomLadder {
    fn default() -> Self {
        Self { multipliers: vec![1.5, 2.0] }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("pixel data size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// An owned RGBA8 pixel buffer.
///
/// Used both as the offscreen rasterization target on the GPU path and as
/// the visible output surface on the software path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32) -> Self {
        let size = width as usize * height as usize * 4;
        Self { width, height, pixels: vec![0; size] }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Resize the surface, discarding existing content.
    pub fn resize(&mut self, width: u32, height: u32) {
        let size = width as usize * height as usize * 4;
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(size, 0);
    }

    /// Replace the surface content with `data`, which must match the
    /// surface's pixel size exactly.
    pub fn write_pixels(&mut self, data: &[u8]) -> Result<(), SurfaceError> {
        if data.len() != self.pixels.len() {
            return Err(SurfaceError::SizeMismatch {
                expected: self.pixels.len(),
                actual: data.len(),
            });
        }

        self.pixels.copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_axis_swap_follows_quarter_turns() {
        assert!(!Rotation::Deg0.swaps_axes());
        assert!(Rotation::Deg90.swaps_axes());
        assert!(!Rotation::Deg180.swaps_axes());
        assert!(Rotation::Deg270.swaps_axes());
        assert_eq!(Rotation::from_degrees(450), Rotation::Deg90);
    }

    #[test]
    fn anchor_clamps_to_unit_square() {
        let anchor = Anchor::new(-0.5, 1.5);
        assert_eq!(anchor.x, 0.0);
        assert_eq!(anchor.y, 1.0);
    }

    #[test]
    fn scaled_pixel_size_caps_device_pixel_ratio() {
        let viewport = Dimensions::new(800.0, 600.0);

        assert_eq!(scaled_pixel_size(viewport, 1.0, 2.0), (800, 600));
        assert_eq!(scaled_pixel_size(viewport, 2.0, 2.0), (1600, 1200));
        // A 3x display capped at 2x renders at 2x.
        assert_eq!(scaled_pixel_size(viewport, 3.0, 2.0), (1600, 1200));
    }

    #[test]
    fn scaled_pixel_size_never_collapses_to_zero() {
        let tiny = Dimensions::new(0.2, 0.2);
        assert_eq!(scaled_pixel_size(tiny, 1.0, 2.0), (1, 1));
    }

    #[test]
    fn scroll_compensation_keeps_anchor_point_fixed() {
        let anchor = Anchor::new(0.25, 0.25);
        let old_dims = Dimensions::new(800.0, 1000.0);
        let new_dims = Dimensions::new(1200.0, 1500.0);
        let scroll = ScrollOffset::new(100.0, 50.0);

        let adjusted = compensate_scroll(anchor, old_dims, new_dims, scroll);

        // Screen position of the anchored content point before and after.
        let before_x = anchor.x * old_dims.width - scroll.x;
        let after_x = anchor.x * new_dims.width - adjusted.x;
        let before_y = anchor.y * old_dims.height - scroll.y;
        let after_y = anchor.y * new_dims.height - adjusted.y;

        assert!((before_x - after_x).abs() < 1.0);
        assert!((before_y - after_y).abs() < 1.0);
    }

    #[test]
    fn zoom_ladder_cycles_through_rungs_and_back_to_base() {
        let ladder = ZoomLadder::default();

        let first = ladder.next_scale(1.0, 1.0);
        assert!((first - 1.5).abs() < 1e-6);

        let second = ladder.next_scale(1.0, first);
        assert!((second - 2.0).abs() < 1e-6);

        let third = ladder.next_scale(1.0, second);
        assert!((third - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zoom_ladder_respects_non_unit_base() {
        let ladder = ZoomLadder::default();

        let first = ladder.next_scale(0.8, 0.8);
        assert!((first - 1.2).abs() < 1e-6);
    }

    #[test]
    fn zoom_ladder_from_intermediate_scale_picks_next_rung() {
        let ladder = ZoomLadder::default();

        // User pinch-zoomed to 1.7x; the next rung above is 2.0x.
        let next = ladder.next_scale(1.0, 1.7);
        assert!((next - 2.0).abs() < 1e-6);
    }

    #[test]
    fn pixel_surface_write_rejects_mismatched_data() {
        let mut surface = PixelSurface::new(2, 2);
        let err = surface.write_pixels(&[0u8; 3]).unwrap_err();
        assert_eq!(err, SurfaceError::SizeMismatch { expected: 16, actual: 3 });

        assert!(surface.write_pixels(&[255u8; 16]).is_ok());
        assert_eq!(surface.pixels()[0], 255);
    }

    #[test]
    fn pixel_surface_resize_discards_content() {
        let mut surface = PixelSurface::new(2, 2);
        surface.write_pixels(&[255u8; 16]).unwrap();

        surface.resize(3, 1);
        assert_eq!(surface.width(), 3);
        assert_eq!(surface.height(), 1);
        assert!(surface.pixels().iter().all(|&b| b == 0));
    }
}
