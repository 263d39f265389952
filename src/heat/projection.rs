use glam::DVec2;
use serde::Deserialize;
use std::f64::consts::PI;

/// Latitude limit of Web Mercator; beyond this the projection diverges.
pub const MAX_MERCATOR_LAT: f64 = 85.05113;

/// Map projection used for every layer of a render
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Projection {
    #[default]
    Mercator,
    Equirectangular,
}

impl Projection {
    pub fn toggled(self) -> Self {
        match self {
            Projection::Mercator => Projection::Equirectangular,
            Projection::Equirectangular => Projection::Mercator,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Projection::Mercator => "mercator",
            Projection::Equirectangular => "equirect",
        }
    }
}

/// Maps geographic coordinates onto a pixel grid of a fixed size.
///
/// The whole world is fitted to `width × height`: longitude spans
/// [-180°, 180°] horizontally in both projections. The accumulator, land
/// clipper, basemap and intensity query must all share one instance or the
/// layers drift apart.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projector {
    pub kind: Projection,
    /// Pixel width of the target grid
    pub width: f64,
    /// Pixel height of the target grid
    pub height: f64,
}

impl Projector {
    pub fn new(kind: Projection, width: f64, height: f64) -> Self {
        Self { kind, width, height }
    }

    /// Project a geographic coordinate to pixel coordinates
    #[inline]
    pub fn project(&self, lat: f64, lng: f64) -> DVec2 {
        let x = (lng + 180.0) / 360.0 * self.width;
        let y = match self.kind {
            Projection::Mercator => {
                let phi = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
                (0.5 - (PI / 4.0 + phi / 2.0).tan().ln() / (2.0 * PI)) * self.height
            }
            Projection::Equirectangular => (90.0 - lat.clamp(-90.0, 90.0)) / 180.0 * self.height,
        };
        DVec2::new(x, y)
    }

    /// Project a GeoJSON-ordered (lng, lat) position
    #[inline]
    pub fn project_lng_lat(&self, (lng, lat): (f64, f64)) -> DVec2 {
        self.project(lat, lng)
    }

    /// Best-effort inverse, returns (lat, lng).
    /// Latitudes clamped on the way in do not come back out.
    pub fn unproject(&self, p: DVec2) -> (f64, f64) {
        let lng = p.x / self.width * 360.0 - 180.0;
        let lat = match self.kind {
            Projection::Mercator => {
                let t = (0.5 - p.y / self.height) * 2.0 * PI;
                (2.0 * t.exp().atan() - PI / 2.0).to_degrees()
            }
            Projection::Equirectangular => 90.0 - p.y / self.height * 180.0,
        };
        (lat, lng)
    }

    /// Same projection fitted to a grid `scale` times larger
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self::new(self.kind, self.width * sx, self.height * sy)
    }
}
