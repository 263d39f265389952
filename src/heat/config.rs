use serde::Deserialize;

use crate::heat::basemap::BasemapMode;
use crate::heat::palette::{ColorStop, DEFAULT_STOPS};
use crate::heat::projection::Projection;
use crate::heat::query::IntensityFormat;
use crate::heat::surface::Rgba;

/// Rendering parameters. Every field has a default so partial YAML works.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct HeatConfig {
    pub projection: Projection,
    /// Kernel radius in pixels at `reference_width`
    pub radius: f64,
    /// Soft edge beyond the radius, in pixels at `reference_width`
    pub blur: f64,
    /// Viewport width the radius and blur are expressed against
    pub reference_width: f64,
    /// Normalization override; the data maximum is used when unset
    pub max_intensity: Option<f64>,
    /// Grow kernels of hotter points: `radius · (1 + radius_boost · alpha)`
    pub radius_boost: f64,
    pub palette: Vec<ColorStop>,
    /// Added to the output alpha of any non-zero heat
    pub alpha_boost: u8,
    pub format: IntensityFormat,
    pub basemap: BasemapMode,
    /// Restrict heat to boundary polygons when they are available
    pub clip: bool,
    pub background: Rgba,
}

impl Default for HeatConfig {
    fn default() -> Self {
        Self {
            projection: Projection::Mercator,
            radius: 28.0,
            blur: 15.0,
            reference_width: 600.0,
            max_intensity: None,
            radius_boost: 0.0,
            palette: DEFAULT_STOPS.to_vec(),
            alpha_boost: 30,
            format: IntensityFormat::Percent,
            basemap: BasemapMode::Below,
            clip: true,
            background: [12, 16, 24, 255],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let cfg = HeatConfig::default();
        assert_eq!(cfg.projection, Projection::Mercator);
        assert_eq!(cfg.radius, 28.0);
        assert_eq!(cfg.blur, 15.0);
        assert_eq!(cfg.reference_width, 600.0);
        assert_eq!(cfg.max_intensity, None);
        assert_eq!(cfg.palette.len(), 4);
        assert!(cfg.clip);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "projection: equirectangular\nradius: 40\nmax_intensity: 250\n";
        let cfg: HeatConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.projection, Projection::Equirectangular);
        assert_eq!(cfg.radius, 40.0);
        assert_eq!(cfg.max_intensity, Some(250.0));
        assert_eq!(cfg.blur, 15.0); // default
        assert_eq!(cfg.basemap, BasemapMode::Below); // default
    }

    #[test]
    fn test_palette_yaml() {
        let yaml = r#"
palette:
  - { t: 0.0, rgb: [0, 0, 0] }
  - { t: 1.0, rgb: [255, 255, 255] }
format: absolute
basemap: above
"#;
        let cfg: HeatConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.palette.len(), 2);
        assert_eq!(cfg.palette[1].rgb, [255, 255, 255]);
        assert_eq!(cfg.format, IntensityFormat::Absolute);
        assert_eq!(cfg.basemap, BasemapMode::Above);
    }
}
