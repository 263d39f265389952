use glam::DVec2;

use crate::heat::boundary::{BoundarySet, Ring};
use crate::heat::error::HeatError;
use crate::heat::projection::{Projection, Projector};
use crate::heat::surface::MAX_SURFACE_PIXELS;

/// Identity of a compiled clip: only valid for this exact projection,
/// grid size and source geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClipKey {
    pub projection: Projection,
    pub width: usize,
    pub height: usize,
    pub source: u64,
}

/// Land coverage rasterized at device resolution.
/// Rings are filled even-odd and unioned together.
pub struct ClipMask {
    key: ClipKey,
    cells: Vec<bool>,
    /// Rings that contributed coverage
    pub rings_used: usize,
    /// Empty, short or non-finite rings that were dropped
    pub rings_skipped: usize,
}

impl ClipMask {
    /// Project and fill every outer ring. Fails with a geometry error only
    /// when no ring at all is usable.
    pub fn build(
        boundaries: &BoundarySet,
        projector: &Projector,
        width: usize,
        height: usize,
    ) -> Result<Self, HeatError> {
        let key = ClipKey {
            projection: projector.kind,
            width,
            height,
            source: boundaries.fingerprint(),
        };
        let len = width
            .checked_mul(height)
            .filter(|&n| n <= MAX_SURFACE_PIXELS)
            .ok_or_else(|| HeatError::Resource(format!("clip mask {width}x{height} too large")))?;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|e| HeatError::Resource(format!("clip mask: {e}")))?;
        cells.resize(len, false);

        let mut mask = Self {
            key,
            cells,
            rings_used: 0,
            rings_skipped: 0,
        };

        let mut projected = Vec::new();
        let mut crossings = Vec::new();
        for ring in boundaries.rings() {
            if !ring_is_valid(ring) {
                mask.rings_skipped += 1;
                continue;
            }
            projected.clear();
            projected.extend(ring.iter().map(|&p| projector.project_lng_lat(p)));
            mask.fill_ring(&projected, &mut crossings);
            mask.rings_used += 1;
        }

        if mask.rings_used == 0 {
            return Err(HeatError::Geometry(format!(
                "no usable rings ({} skipped)",
                mask.rings_skipped
            )));
        }
        if mask.rings_skipped > 0 {
            log::warn!("land clip skipped {} malformed rings", mask.rings_skipped);
        }
        Ok(mask)
    }

    /// Scanline fill sampling each pixel at its center
    fn fill_ring(&mut self, pts: &[DVec2], crossings: &mut Vec<f64>) {
        let (min_y, max_y) = pts
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
        let y_start = (min_y - 0.5).ceil().max(0.0) as usize;
        let y_end = ((max_y - 0.5).floor() + 1.0).clamp(0.0, self.key.height as f64) as usize;

        for y in y_start..y_end {
            let sy = y as f64 + 0.5;
            crossings.clear();
            let mut prev = pts[pts.len() - 1];
            for &cur in pts {
                if (prev.y <= sy) != (cur.y <= sy) {
                    crossings.push(prev.x + (sy - prev.y) * (cur.x - prev.x) / (cur.y - prev.y));
                }
                prev = cur;
            }
            crossings.sort_by(f64::total_cmp);

            let row = y * self.key.width;
            for pair in crossings.chunks_exact(2) {
                let x0 = (pair[0] - 0.5).ceil().clamp(0.0, self.key.width as f64) as usize;
                let x1 = (pair[1] - 0.5).ceil().clamp(0.0, self.key.width as f64) as usize;
                for cell in &mut self.cells[row + x0..row + x1] {
                    *cell = true;
                }
            }
        }
    }

    pub fn key(&self) -> ClipKey {
        self.key
    }

    pub fn width(&self) -> usize {
        self.key.width
    }

    pub fn height(&self) -> usize {
        self.key.height
    }

    #[inline(always)]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.key.width && y < self.key.height && self.cells[y * self.key.width + x]
    }

    /// Fraction of the grid covered by land
    pub fn coverage(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.cells.iter().filter(|&&c| c).count() as f64 / self.cells.len() as f64
    }
}

/// At least three distinct finite vertices
fn ring_is_valid(ring: &Ring) -> bool {
    if ring.iter().any(|&(lng, lat)| !lng.is_finite() || !lat.is_finite()) {
        return false;
    }
    let mut vertices = ring.clone();
    vertices.dedup();
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    vertices.len() >= 3
}
