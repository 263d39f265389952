//! Kernel-density heatmap over projected geographic points.
//!
//! Pipeline per render: project points, stamp the kernel sprite into an
//! additive density buffer (optionally masked to land), map density through
//! the palette, then composite with an optional vector basemap. The
//! [`engine::HeatmapEngine`] owns the caches and answers hover queries
//! against the last render.

pub mod basemap;
pub mod boundary;
pub mod clip;
pub mod compositor;
pub mod config;
pub mod density;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod palette;
pub mod projection;
pub mod query;
pub mod sprite;
pub mod surface;

use serde::Deserialize;

pub use boundary::{BoundaryFeature, BoundarySet};
pub use config::HeatConfig;
pub use engine::{HeatmapEngine, RenderReport};
pub use error::HeatError;
pub use projection::{Projection, Projector};
pub use query::{QueryHit, Tooltip};
pub use surface::Surface;

/// One weighted observation
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct HeatPoint {
    pub lat: f64,
    #[serde(alias = "lon")]
    pub lng: f64,
    #[serde(alias = "weight", default = "unit_intensity")]
    pub intensity: f64,
    #[serde(default)]
    pub label: Option<String>,
}

fn unit_intensity() -> f64 {
    1.0
}

impl HeatPoint {
    pub fn new(lat: f64, lng: f64, intensity: f64) -> Self {
        Self {
            lat,
            lng,
            intensity,
            label: None,
        }
    }

    /// All numeric fields are finite
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite() && self.intensity.is_finite()
    }
}
