use glam::DVec2;
use serde::Deserialize;

use crate::heat::boundary::{BoundarySet, Ring};
use crate::heat::clip::ClipMask;
use crate::heat::error::HeatError;
use crate::heat::geometry::{draw_line, segment_might_be_visible};
use crate::heat::projection::Projector;
use crate::heat::surface::{Rgba, Surface, TRANSPARENT};

/// Where the vector basemap sits relative to the heat layer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BasemapMode {
    Off,
    #[default]
    Below,
    Above,
}

impl BasemapMode {
    pub fn next(self) -> Self {
        match self {
            BasemapMode::Off => BasemapMode::Below,
            BasemapMode::Below => BasemapMode::Above,
            BasemapMode::Above => BasemapMode::Off,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BasemapStyle {
    pub land: Rgba,
    pub outline: Rgba,
}

impl Default for BasemapStyle {
    fn default() -> Self {
        Self {
            land: [38, 44, 56, 255],
            outline: [110, 130, 150, 200],
        }
    }
}

/// Draw land fill and ring outlines with the render's projector.
///
/// Land fill comes from the compiled clip mask when one is available, so
/// the basemap and the clipped heat share exactly the same coastline.
pub fn render_basemap(
    boundaries: &BoundarySet,
    projector: &Projector,
    land: Option<&ClipMask>,
    style: &BasemapStyle,
    width: usize,
    height: usize,
) -> Result<Surface, HeatError> {
    let mut surface = Surface::try_new(width, height, TRANSPARENT)?;

    if let Some(mask) = land.filter(|m| m.width() == width && m.height() == height) {
        for y in 0..height {
            for x in 0..width {
                if mask.contains(x, y) {
                    surface.set_pixel(x, y, style.land);
                }
            }
        }
    }

    for ring in boundaries.rings() {
        draw_ring(&mut surface, ring, projector, style.outline);
    }
    Ok(surface)
}

/// Draw a ring as a polyline, skipping segments that wrap the antimeridian
fn draw_ring(surface: &mut Surface, ring: &Ring, projector: &Projector, color: Rgba) {
    if ring.len() < 2 {
        return;
    }
    let (width, height) = (surface.width(), surface.height());
    // Vertices further out than this break the run; no visible segment needs them
    let limit = (width.max(height) * 4) as f64;
    let mut prev: Option<DVec2> = None;

    for &(lng, lat) in ring {
        let p = projector.project(lat, lng).floor();
        if !p.is_finite() || p.x.abs() > limit || p.y.abs() > limit {
            prev = None;
            continue;
        }

        if let Some(q) = prev {
            let dist = (p.x - q.x).abs() + (p.y - q.y).abs();
            let (a, b) = ((q.x as i32, q.y as i32), (p.x as i32, p.y as i32));
            if dist < (width / 2) as f64 && segment_might_be_visible(a, b, width, height) {
                draw_line(surface, a.0, a.1, b.0, b.1, color);
            }
        }

        prev = Some(p);
    }
}
