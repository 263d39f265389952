use crate::heat::error::HeatError;

/// Upper bound on any grid the engine allocates (≈ 8K × 8K)
pub const MAX_SURFACE_PIXELS: usize = 8192 * 8192;

/// Straight-alpha RGBA color
pub type Rgba = [u8; 4];

pub const TRANSPARENT: Rgba = [0, 0, 0, 0];

/// Source-over one straight-alpha color onto another
#[inline]
pub fn blend_over(dst: Rgba, src: Rgba) -> Rgba {
    let sa = src[3] as u32;
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }
    let da = dst[3] as u32;
    // out_a = sa + da(1 - sa), in 0..=255*255
    let out_a = sa * 255 + da * (255 - sa);
    if out_a == 0 {
        return TRANSPARENT;
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = src[c] as u32 * sa * 255 + dst[c] as u32 * da * (255 - sa);
        out[c] = ((v + out_a / 2) / out_a) as u8;
    }
    out[3] = ((out_a + 127) / 255) as u8;
    out
}

/// RGBA8 raster, row-major, 4 bytes per pixel
#[derive(Clone, Debug, PartialEq)]
pub struct Surface {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Surface {
    /// Allocate a surface filled with `fill`, failing instead of aborting
    /// when the size is unreasonable.
    pub fn try_new(width: usize, height: usize, fill: Rgba) -> Result<Self, HeatError> {
        let len = width
            .checked_mul(height)
            .filter(|&n| n <= MAX_SURFACE_PIXELS)
            .ok_or_else(|| HeatError::Resource(format!("surface {width}x{height} too large")))?;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len * 4)
            .map_err(|e| HeatError::Resource(format!("surface: {e}")))?;
        pixels.extend(fill.iter().copied().cycle().take(len * 4));
        Ok(Self { width, height, pixels })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    #[inline(always)]
    fn index(&self, x: usize, y: usize) -> usize {
        (y * self.width + x) * 4
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.index(x, y);
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]])
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Rgba) {
        if x < self.width && y < self.height {
            let i = self.index(x, y);
            self.pixels[i..i + 4].copy_from_slice(&color);
        }
    }

    /// Source-over blend with signed coordinates (out of range is ignored)
    pub fn blend_pixel_signed(&mut self, x: i32, y: i32, color: Rgba) {
        if x >= 0 && y >= 0 {
            let (x, y) = (x as usize, y as usize);
            if let Some(dst) = self.pixel(x, y) {
                self.set_pixel(x, y, blend_over(dst, color));
            }
        }
    }

    /// Composite `src` over this surface. Both must be the same size.
    pub fn draw_over(&mut self, src: &Surface) {
        debug_assert_eq!((self.width, self.height), (src.width, src.height));
        for (dst, s) in self.pixels.chunks_exact_mut(4).zip(src.pixels.chunks_exact(4)) {
            let out = blend_over([dst[0], dst[1], dst[2], dst[3]], [s[0], s[1], s[2], s[3]]);
            dst.copy_from_slice(&out);
        }
    }

    /// True when every pixel has zero alpha
    pub fn is_transparent(&self) -> bool {
        self.pixels.chunks_exact(4).all(|p| p[3] == 0)
    }
}
