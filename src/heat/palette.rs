use rayon::prelude::*;
use serde::Deserialize;

use crate::heat::density::DensityBuffer;
use crate::heat::error::HeatError;
use crate::heat::surface::{Surface, TRANSPARENT};

/// One anchor of the color ramp
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct ColorStop {
    pub t: f64,
    pub rgb: [u8; 3],
}

/// Cold to hot: blue -> green -> yellow -> red
pub const DEFAULT_STOPS: [ColorStop; 4] = [
    ColorStop { t: 0.00, rgb: [0, 64, 255] },
    ColorStop { t: 0.35, rgb: [0, 220, 80] },
    ColorStop { t: 0.65, rgb: [255, 230, 0] },
    ColorStop { t: 1.00, rgb: [230, 20, 20] },
];

/// Piecewise-linear ramp pre-sampled into a 256-entry table
#[derive(Clone, Debug)]
pub struct Palette {
    stops: Vec<ColorStop>,
    lut: [[u8; 3]; 256],
}

impl Palette {
    /// Stops must be non-empty, within [0, 1] and in ascending order
    pub fn new(stops: &[ColorStop]) -> Result<Self, HeatError> {
        if stops.is_empty() {
            return Err(HeatError::Config("palette has no stops".into()));
        }
        if let Some(s) = stops.iter().find(|s| !(0.0..=1.0).contains(&s.t)) {
            return Err(HeatError::Config(format!("palette stop t={} outside [0, 1]", s.t)));
        }
        if stops.windows(2).any(|w| w[1].t < w[0].t) {
            return Err(HeatError::Config("palette stops out of order".into()));
        }

        Ok(Self::sampled(stops.to_vec()))
    }

    fn sampled(stops: Vec<ColorStop>) -> Self {
        let mut palette = Self {
            stops,
            lut: [[0; 3]; 256],
        };
        for level in 0..256 {
            palette.lut[level] = palette.ramp(level as f64 / 255.0);
        }
        palette
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Interpolate the ramp at `t` (clamped to [0, 1])
    pub fn ramp(&self, t: f64) -> [u8; 3] {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let first = self.stops[0];
        let last = self.stops[self.stops.len() - 1];
        if t <= first.t {
            return first.rgb;
        }
        if t >= last.t {
            return last.rgb;
        }
        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.t {
                let span = b.t - a.t;
                if span <= 0.0 {
                    return b.rgb;
                }
                let f = (t - a.t) / span;
                let mut rgb = [0u8; 3];
                for c in 0..3 {
                    rgb[c] = (a.rgb[c] as f64 + (b.rgb[c] as f64 - a.rgb[c] as f64) * f).round() as u8;
                }
                return rgb;
            }
        }
        last.rgb
    }

    #[inline(always)]
    pub fn lookup(&self, level: u8) -> [u8; 3] {
        self.lut[level as usize]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::sampled(DEFAULT_STOPS.to_vec())
    }
}

/// Quantize heat in [0, 1] to a table index
#[inline(always)]
pub fn heat_level(h: f32) -> u8 {
    (h.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Output alpha for a heat level: fully transparent at zero, otherwise the
/// level plus a legibility boost, clamped.
#[inline(always)]
pub fn heat_alpha(level: u8, boost: u8) -> u8 {
    if level == 0 {
        0
    } else {
        level.saturating_add(boost)
    }
}

/// Map every density cell through the palette. One pass over the buffer,
/// rows processed in parallel.
pub fn colorize(buffer: &DensityBuffer, palette: &Palette, alpha_boost: u8) -> Result<Surface, HeatError> {
    let width = buffer.width();
    let mut out = Surface::try_new(width, buffer.height(), TRANSPARENT)?;
    if width == 0 {
        return Ok(out);
    }

    out.as_bytes_mut()
        .par_chunks_mut(width * 4)
        .zip(buffer.cells().par_chunks(width))
        .for_each(|(dst, src)| {
            for (px, &h) in dst.chunks_exact_mut(4).zip(src) {
                let level = heat_level(h / DensityBuffer::SATURATION);
                if level == 0 {
                    continue;
                }
                let [r, g, b] = palette.lookup(level);
                px[0] = r;
                px[1] = g;
                px[2] = b;
                px[3] = heat_alpha(level, alpha_boost);
            }
        });
    Ok(out)
}
