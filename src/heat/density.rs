use glam::DVec2;

use crate::heat::clip::ClipMask;
use crate::heat::error::HeatError;
use crate::heat::projection::Projector;
use crate::heat::sprite::KernelSprite;
use crate::heat::surface::MAX_SURFACE_PIXELS;
use crate::heat::HeatPoint;

/// Normalization denominator: the override when it is a usable positive
/// number, otherwise the largest finite intensity, otherwise 1.
pub fn max_intensity(points: &[HeatPoint], override_max: Option<f64>) -> f64 {
    if let Some(m) = override_max.filter(|m| m.is_finite() && *m > 0.0) {
        return m;
    }
    let max = points
        .iter()
        .map(|p| p.intensity)
        .filter(|i| i.is_finite())
        .fold(0.0_f64, f64::max);
    if max > 0.0 {
        max
    } else {
        1.0
    }
}

/// Stamp opacity for one point, always in [0, 1]
#[inline(always)]
pub fn normalized_alpha(intensity: f64, max_intensity: f64) -> f64 {
    (intensity / max_intensity).clamp(0.0, 1.0)
}

/// Radius multiplier for the optional intensity-to-radius knob
#[inline(always)]
pub fn radius_spread(alpha: f64, radius_boost: f64) -> f64 {
    1.0 + radius_boost.max(0.0) * alpha
}

/// Per-render counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccumulateStats {
    pub stamped: usize,
    /// Points with non-finite coordinates or intensity
    pub skipped_invalid: usize,
    /// Points whose normalized alpha was zero
    pub skipped_zero: usize,
}

/// Additive single-channel heat grid at device resolution.
/// Cells saturate at [`DensityBuffer::SATURATION`].
pub struct DensityBuffer {
    width: usize,
    height: usize,
    cells: Vec<f32>,
}

impl DensityBuffer {
    pub const SATURATION: f32 = 1.0;

    pub fn try_new(width: usize, height: usize) -> Result<Self, HeatError> {
        let len = width
            .checked_mul(height)
            .filter(|&n| n <= MAX_SURFACE_PIXELS)
            .ok_or_else(|| HeatError::Resource(format!("density buffer {width}x{height} too large")))?;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|e| HeatError::Resource(format!("density buffer: {e}")))?;
        cells.resize(len, 0.0);
        Ok(Self { width, height, cells })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    #[inline(always)]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.cells[y * self.width + x]
    }

    #[inline(always)]
    fn add(&mut self, idx: usize, value: f32) {
        let cell = &mut self.cells[idx];
        *cell = (*cell + value).min(Self::SATURATION);
    }

    /// Add the sprite centered on `center`, scaled by `alpha`.
    /// `spread > 1` enlarges the footprint by resampling the sprite.
    pub fn stamp(
        &mut self,
        sprite: &KernelSprite,
        center: DVec2,
        alpha: f32,
        spread: f64,
        clip: Option<&ClipMask>,
    ) {
        let half = if spread > 1.0 {
            (sprite.half() as f64 * spread).ceil()
        } else {
            sprite.half() as f64
        };
        // Footprint entirely off the grid; also keeps the integer math in range
        let (w, h) = (self.width as f64, self.height as f64);
        if !(center.x > -half - 1.0 && center.x < w + half && center.y > -half - 1.0 && center.y < h + half) {
            return;
        }
        let cx = center.x.floor() as i64;
        let cy = center.y.floor() as i64;
        let half = half as i64;

        // Clip the footprint to the grid
        let x0 = (cx - half).max(0);
        let y0 = (cy - half).max(0);
        let x1 = (cx + half).min(self.width as i64 - 1);
        let y1 = (cy + half).min(self.height as i64 - 1);
        if x0 > x1 || y0 > y1 {
            return;
        }

        for y in y0..=y1 {
            let row = y as usize * self.width;
            for x in x0..=x1 {
                if let Some(mask) = clip {
                    if !mask.contains(x as usize, y as usize) {
                        continue;
                    }
                }
                let w = if spread > 1.0 {
                    sprite.sample((x - cx) as f64 / spread, (y - cy) as f64 / spread)
                } else {
                    sprite.weight((x - cx + half) as usize, (y - cy + half) as usize)
                };
                if w > 0.0 {
                    self.add(row + x as usize, w * alpha);
                }
            }
        }
    }

    /// Stamp every point. Invalid and zero-intensity points are skipped
    /// individually and counted.
    pub fn accumulate(
        &mut self,
        points: &[HeatPoint],
        projector: &Projector,
        sprite: &KernelSprite,
        max_intensity: f64,
        radius_boost: f64,
        clip: Option<&ClipMask>,
    ) -> AccumulateStats {
        let mut stats = AccumulateStats::default();
        for p in points {
            if !p.is_valid() {
                stats.skipped_invalid += 1;
                continue;
            }
            let alpha = normalized_alpha(p.intensity, max_intensity);
            if alpha <= 0.0 {
                stats.skipped_zero += 1;
                continue;
            }
            let center = projector.project(p.lat, p.lng);
            self.stamp(sprite, center, alpha as f32, radius_spread(alpha, radius_boost), clip);
            stats.stamped += 1;
        }
        stats
    }

    /// Peak cell value
    pub fn peak(&self) -> f32 {
        self.cells.iter().copied().fold(0.0, f32::max)
    }
}
