//! Pre-rendered kernel footprint ("splat") stamped once per point.
//!
//! The same [`kernel_weight`] profile drives both the rasterized sprite and
//! the analytic intensity query, so the tooltip and the painted heat agree.

/// Gaussian sigma as a fraction of the kernel radius: `σ = radius / 1.6`
pub const SIGMA_PER_RADIUS: f64 = 1.6;

/// Smallest usable kernel radius in pixels
pub const MIN_RADIUS: f64 = 1.0;

/// Kernel weight at squared pixel distance `d2` from the center.
///
/// Gaussian with `σ = radius / SIGMA_PER_RADIUS` out to `radius`, then
/// faded with a smoothstep across the blur band so the footprint reaches
/// exactly zero at `radius + blur`.
#[inline]
pub fn kernel_weight(d2: f64, radius: f64, blur: f64) -> f64 {
    let extent = radius + blur;
    if d2 >= extent * extent {
        return 0.0;
    }
    let sigma = radius / SIGMA_PER_RADIUS;
    let g = (-d2 / (2.0 * sigma * sigma)).exp();
    if d2 <= radius * radius {
        return g;
    }
    let t = ((d2.sqrt() - radius) / blur).clamp(0.0, 1.0);
    g * (1.0 - t * t * (3.0 - 2.0 * t))
}

/// Cache key for a sprite. Floats are keyed by bit pattern so any change,
/// however small, forces a rebuild.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpriteKey {
    radius: u64,
    blur: u64,
    scale: u64,
    ratio: u64,
}

impl SpriteKey {
    /// `radius`/`blur` are in reference pixels, `ratio` is viewport width over
    /// the reference width.
    pub fn new(radius: f64, blur: f64, scale: f64, ratio: f64) -> Self {
        Self {
            radius: radius.to_bits(),
            blur: blur.to_bits(),
            scale: scale.to_bits(),
            ratio: ratio.to_bits(),
        }
    }

    pub fn ratio(&self) -> f64 {
        f64::from_bits(self.ratio)
    }
}

/// Grayscale radial footprint: 1.0 at the center, 0.0 at `radius + blur`
pub struct KernelSprite {
    /// Radius in device pixels
    pub radius_px: f64,
    /// Blur band in device pixels
    pub blur_px: f64,
    pub pixel_scale: f64,
    /// Side length of the square bitmap (always odd)
    pub size: usize,
    /// Row-major weights, `size * size`
    pub bitmap: Vec<f32>,
}

impl KernelSprite {
    /// Render the footprint. `radius`/`blur` are logical pixels; the bitmap
    /// is sized `≈ 2·(radius+blur)·scale` so a single center pixel exists.
    pub fn build(radius: f64, blur: f64, scale: f64) -> Self {
        let radius_px = radius.max(MIN_RADIUS) * scale;
        let blur_px = blur.max(0.0) * scale;
        let half = (radius_px + blur_px).ceil() as usize;
        let size = half * 2 + 1;

        let mut bitmap = Vec::with_capacity(size * size);
        for y in 0..size {
            let dy = y as f64 - half as f64;
            for x in 0..size {
                let dx = x as f64 - half as f64;
                bitmap.push(kernel_weight(dx * dx + dy * dy, radius_px, blur_px) as f32);
            }
        }

        Self {
            radius_px,
            blur_px,
            pixel_scale: scale,
            size,
            bitmap,
        }
    }

    /// Offset from the bitmap corner to its center pixel
    #[inline(always)]
    pub fn half(&self) -> usize {
        self.size / 2
    }

    #[inline(always)]
    pub fn weight(&self, x: usize, y: usize) -> f32 {
        self.bitmap[y * self.size + x]
    }

    /// Nearest-neighbor sample at an offset from the center, in units of the
    /// unscaled sprite. Zero outside the footprint.
    #[inline]
    pub fn sample(&self, dx: f64, dy: f64) -> f32 {
        let h = self.half() as f64;
        let x = (dx + h).round();
        let y = (dy + h).round();
        if x < 0.0 || y < 0.0 || x >= self.size as f64 || y >= self.size as f64 {
            return 0.0;
        }
        self.weight(x as usize, y as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_peak_and_edge() {
        assert_eq!(kernel_weight(0.0, 20.0, 10.0), 1.0);
        assert_eq!(kernel_weight(30.0 * 30.0, 20.0, 10.0), 0.0);
        assert_eq!(kernel_weight(40.0 * 40.0, 20.0, 10.0), 0.0);
    }

    #[test]
    fn test_kernel_matches_gaussian_inside_radius() {
        let sigma = 20.0 / SIGMA_PER_RADIUS;
        for d in [1.0_f64, 5.0, 12.0, 19.5] {
            let expected = (-(d * d) / (2.0 * sigma * sigma)).exp();
            assert!((kernel_weight(d * d, 20.0, 10.0) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_kernel_monotonic() {
        let mut prev = f64::INFINITY;
        for i in 0..=40 {
            let d = i as f64;
            let w = kernel_weight(d * d, 20.0, 15.0);
            assert!(w <= prev, "not monotonic at d={d}");
            prev = w;
        }
    }

    #[test]
    fn test_zero_blur_cuts_at_radius() {
        assert!(kernel_weight(9.9 * 9.9, 10.0, 0.0) > 0.0);
        assert_eq!(kernel_weight(10.0 * 10.0, 10.0, 0.0), 0.0);
    }

    #[test]
    fn test_sprite_shape() {
        let s = KernelSprite::build(10.0, 5.0, 2.0);
        assert_eq!(s.radius_px, 20.0);
        assert_eq!(s.blur_px, 10.0);
        assert_eq!(s.size, 61);
        assert_eq!(s.weight(30, 30), 1.0);
        assert_eq!(s.weight(0, 30), 0.0);
        // radially symmetric
        assert_eq!(s.weight(25, 30), s.weight(35, 30));
        assert_eq!(s.weight(30, 25), s.weight(25, 30));
    }

    #[test]
    fn test_invalid_radius_clamped() {
        let s = KernelSprite::build(-4.0, -1.0, 1.0);
        assert_eq!(s.radius_px, MIN_RADIUS);
        assert_eq!(s.blur_px, 0.0);
        assert_eq!(s.size, 3);
        assert_eq!(s.weight(1, 1), 1.0);
    }

    #[test]
    fn test_sample_outside_is_zero() {
        let s = KernelSprite::build(4.0, 2.0, 1.0);
        assert_eq!(s.sample(0.0, 0.0), 1.0);
        assert_eq!(s.sample(100.0, 0.0), 0.0);
        assert_eq!(s.sample(0.0, -100.0), 0.0);
    }

    #[test]
    fn test_key_changes_with_ratio() {
        let a = SpriteKey::new(28.0, 15.0, 1.0, 1.0);
        let b = SpriteKey::new(28.0, 15.0, 1.0, 2.0);
        assert_ne!(a, b);
        assert_eq!(a, SpriteKey::new(28.0, 15.0, 1.0, 1.0));
        assert_eq!(b.ratio(), 2.0);
    }
}
