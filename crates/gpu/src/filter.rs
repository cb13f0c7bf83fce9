//! Software post-process filters
//!
//! Applied to the output surface on the software path so both backends
//! produce the same filtered result. The GPU path applies the equivalent
//! math in its fragment stage via `DrawParams`.

use viewer_core::{Filter, PixelSurface};

/// Apply `filter` to `surface` in place, blended by `strength` in [0, 1].
///
/// Alpha is preserved. `Filter::None` and zero strength leave the surface
/// untouched.
pub fn apply_filter(surface: &mut PixelSurface, filter: Filter, strength: f32) {
    let strength = strength.clamp(0.0, 1.0);
    if filter == Filter::None || strength == 0.0 {
        return;
    }

    for pixel in surface.pixels_mut().chunks_exact_mut(4) {
        let (r, g, b) = (pixel[0] as f32, pixel[1] as f32, pixel[2] as f32);

        let (fr, fg, fb) = match filter {
            Filter::None => (r, g, b),
            Filter::Dark => (255.0 - r, 255.0 - g, 255.0 - b),
            Filter::Sepia => (
                0.393 * r + 0.769 * g + 0.189 * b,
                0.349 * r + 0.686 * g + 0.168 * b,
                0.272 * r + 0.534 * g + 0.131 * b,
            ),
        };

        pixel[0] = (r + (fr - r) * strength).clamp(0.0, 255.0) as u8;
        pixel[1] = (g + (fg - g) * strength).clamp(0.0, 255.0) as u8;
        pixel[2] = (b + (fb - b) * strength).clamp(0.0, 255.0) as u8;
    }
}
