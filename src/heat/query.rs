//! Analytic hit-testing of the heat field.
//!
//! Re-sums the kernel contribution of every point at a query pixel instead
//! of reading back rendered pixels. O(N) per query, fine for a few hundred
//! points.

use glam::DVec2;
use serde::Deserialize;

use crate::heat::clip::ClipMask;
use crate::heat::density::{normalized_alpha, radius_spread};
use crate::heat::projection::Projector;
use crate::heat::sprite::kernel_weight;
use crate::heat::HeatPoint;

/// Blended heat below this is not worth a tooltip
pub const MIN_VISIBLE_HEAT: f64 = 0.005;

/// Parameters captured from a render. Every value here must be the one the
/// accumulator used, or the tooltip disagrees with the painted heat.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueryParams {
    /// Device-resolution projector
    pub projector: Projector,
    /// Kernel radius in device pixels
    pub radius: f64,
    /// Blur band in device pixels
    pub blur: f64,
    pub max_intensity: f64,
    pub radius_boost: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NearestPoint {
    pub index: usize,
    pub label: Option<String>,
    /// Pixel distance in device pixels
    pub distance: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryHit {
    /// Sum of normalized intensity × kernel weight, clamped to [0, 1]
    pub blended: f64,
    /// Closest point, only when within the kernel radius
    pub nearest: Option<NearestPoint>,
}

/// Sum every point's kernel contribution at `q` (device pixels)
pub fn blended_intensity(points: &[HeatPoint], params: &QueryParams, q: DVec2) -> f64 {
    let mut sum = 0.0;
    for p in points.iter().filter(|p| p.is_valid()) {
        let alpha = normalized_alpha(p.intensity, params.max_intensity);
        if alpha <= 0.0 {
            continue;
        }
        let spread = radius_spread(alpha, params.radius_boost);
        let d2 = (params.projector.project(p.lat, p.lng) - q).length_squared();
        sum += alpha * kernel_weight(d2 / (spread * spread), params.radius, params.blur);
    }
    sum.clamp(0.0, 1.0)
}

/// Blended intensity plus nearest-point identity at `q`.
/// With an active land clip, off-land positions report zero heat, matching
/// what was painted.
pub fn query(points: &[HeatPoint], params: &QueryParams, q: DVec2, clip: Option<&ClipMask>) -> QueryHit {
    let on_land = match clip {
        Some(mask) => q.x >= 0.0 && q.y >= 0.0 && mask.contains(q.x as usize, q.y as usize),
        None => true,
    };
    let blended = if on_land {
        blended_intensity(points, params, q)
    } else {
        0.0
    };

    let mut best: Option<(usize, f64)> = None;
    for (index, p) in points.iter().enumerate().filter(|(_, p)| p.is_valid()) {
        let d2 = (params.projector.project(p.lat, p.lng) - q).length_squared();
        if best.map_or(true, |(_, b)| d2 < b) {
            best = Some((index, d2));
        }
    }

    let nearest = best
        .filter(|&(_, d2)| d2 <= params.radius * params.radius)
        .map(|(index, d2)| NearestPoint {
            index,
            label: points[index].label.clone(),
            distance: d2.sqrt(),
        });

    QueryHit { blended, nearest }
}

/// How blended intensity is written in the tooltip
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntensityFormat {
    /// Percentage of the peak intensity
    #[default]
    Percent,
    /// Raw blended value in [0, 1]
    Fraction,
    /// Blended value scaled back to input intensity units
    Absolute,
}

impl IntensityFormat {
    pub fn format(self, blended: f64, max_intensity: f64) -> String {
        match self {
            IntensityFormat::Percent => format!("{:.0}%", blended * 100.0),
            IntensityFormat::Fraction => format!("{blended:.2}"),
            IntensityFormat::Absolute => format!("{:.1}", blended * max_intensity),
        }
    }
}

/// Label payload for the host UI to position next to the cursor
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tooltip {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub visible: bool,
}

impl Tooltip {
    pub fn from_hit(hit: &QueryHit, x: f64, y: f64, format: IntensityFormat, max_intensity: f64) -> Self {
        let label = hit.nearest.as_ref().and_then(|n| n.label.as_deref());
        let visible = hit.blended >= MIN_VISIBLE_HEAT || label.is_some();
        if !visible {
            return Self {
                x,
                y,
                ..Self::default()
            };
        }
        let value = format.format(hit.blended, max_intensity);
        let text = match label {
            Some(label) => format!("{label}: {value}"),
            None => value,
        };
        Self { x, y, text, visible }
    }
}
