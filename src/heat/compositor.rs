use crate::heat::basemap::BasemapMode;
use crate::heat::error::HeatError;
use crate::heat::surface::{Rgba, Surface};

/// Device pixel scale is capped to bound the per-frame colorize cost
pub const MAX_PIXEL_SCALE: f64 = 2.0;

/// Logical render size plus device pixel scale
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderTarget {
    pub width: usize,
    pub height: usize,
    pub pixel_scale: f64,
}

impl RenderTarget {
    /// Degenerate sizes clamp to 1×1; the scale clamps to (0, MAX_PIXEL_SCALE]
    /// with 1.0 standing in for unusable values.
    pub fn new(width: usize, height: usize, pixel_scale: f64) -> Self {
        let pixel_scale = if pixel_scale.is_finite() && pixel_scale > 0.0 {
            pixel_scale.min(MAX_PIXEL_SCALE)
        } else {
            1.0
        };
        Self {
            width: width.max(1),
            height: height.max(1),
            pixel_scale,
        }
    }

    /// True when `new` had to clamp anything
    pub fn was_clamped(width: usize, height: usize, pixel_scale: f64) -> bool {
        let t = Self::new(width, height, pixel_scale);
        t.width != width || t.height != height || t.pixel_scale != pixel_scale
    }

    pub fn device_width(&self) -> usize {
        ((self.width as f64 * self.pixel_scale).round() as usize).max(1)
    }

    pub fn device_height(&self) -> usize {
        ((self.height as f64 * self.pixel_scale).round() as usize).max(1)
    }

    /// Device pixels per logical pixel on each axis
    pub fn device_ratio(&self) -> (f64, f64) {
        (
            self.device_width() as f64 / self.width as f64,
            self.device_height() as f64 / self.height as f64,
        )
    }
}

/// Stack the layers onto an opaque or transparent background:
/// background, basemap (below), heat, basemap (above).
pub fn compose(
    background: Rgba,
    heat: &Surface,
    basemap: Option<&Surface>,
    mode: BasemapMode,
) -> Result<Surface, HeatError> {
    let mut out = Surface::try_new(heat.width(), heat.height(), background)?;
    let basemap = basemap.filter(|b| b.width() == heat.width() && b.height() == heat.height());

    if let (Some(map), BasemapMode::Below) = (basemap, mode) {
        out.draw_over(map);
    }
    out.draw_over(heat);
    if let (Some(map), BasemapMode::Above) = (basemap, mode) {
        out.draw_over(map);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heat::surface::TRANSPARENT;

    const BG: Rgba = [0, 0, 0, 255];
    const RED: Rgba = [255, 0, 0, 255];
    const GREY: Rgba = [100, 100, 100, 255];

    fn layers() -> (Surface, Surface) {
        let mut heat = Surface::try_new(2, 1, TRANSPARENT).unwrap();
        heat.set_pixel(0, 0, RED);
        let map = Surface::try_new(2, 1, GREY).unwrap();
        (heat, map)
    }

    #[test]
    fn test_basemap_below() {
        let (heat, map) = layers();
        let out = compose(BG, &heat, Some(&map), BasemapMode::Below).unwrap();
        assert_eq!(out.pixel(0, 0), Some(RED));
        assert_eq!(out.pixel(1, 0), Some(GREY));
    }

    #[test]
    fn test_basemap_above() {
        let (heat, map) = layers();
        let out = compose(BG, &heat, Some(&map), BasemapMode::Above).unwrap();
        assert_eq!(out.pixel(0, 0), Some(GREY));
    }

    #[test]
    fn test_basemap_off() {
        let (heat, map) = layers();
        let out = compose(BG, &heat, Some(&map), BasemapMode::Off).unwrap();
        assert_eq!(out.pixel(0, 0), Some(RED));
        assert_eq!(out.pixel(1, 0), Some(BG));
    }

    #[test]
    fn test_target_clamps() {
        let t = RenderTarget::new(0, 0, 3.0);
        assert_eq!((t.width, t.height, t.pixel_scale), (1, 1, MAX_PIXEL_SCALE));
        assert_eq!(RenderTarget::new(10, 10, f64::NAN).pixel_scale, 1.0);
        assert!(RenderTarget::was_clamped(0, 10, 1.0));
        assert!(!RenderTarget::was_clamped(600, 300, 2.0));
    }

    #[test]
    fn test_device_size() {
        let t = RenderTarget::new(600, 300, 2.0);
        assert_eq!((t.device_width(), t.device_height()), (1200, 600));
        assert_eq!(t.device_ratio(), (2.0, 2.0));
    }
}
