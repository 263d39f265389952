use glam::DVec2;

use crate::heat::basemap::{render_basemap, BasemapMode, BasemapStyle};
use crate::heat::boundary::BoundarySet;
use crate::heat::clip::{ClipKey, ClipMask};
use crate::heat::compositor::{compose, RenderTarget};
use crate::heat::config::HeatConfig;
use crate::heat::density::{max_intensity, AccumulateStats, DensityBuffer};
use crate::heat::error::HeatError;
use crate::heat::palette::{colorize, Palette};
use crate::heat::projection::Projector;
use crate::heat::query::{query, QueryHit, QueryParams, Tooltip};
use crate::heat::sprite::{KernelSprite, SpriteKey, MIN_RADIUS};
use crate::heat::surface::Surface;
use crate::heat::HeatPoint;

/// Outcome of one render pass. The pass itself never fails; anything that
/// reduced fidelity is listed in `issues`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderReport {
    /// False when no surface could be produced
    pub rendered: bool,
    pub stats: AccumulateStats,
    /// Heat was restricted to land
    pub clipped: bool,
    pub sprite_rebuilt: bool,
    pub clip_rebuilt: bool,
    pub issues: Vec<HeatError>,
}

enum ClipCache {
    Ready(ClipMask),
    /// Building failed for this key; stay unclipped until the key changes
    Failed(ClipKey),
}

impl ClipCache {
    fn key(&self) -> ClipKey {
        match self {
            ClipCache::Ready(mask) => mask.key(),
            ClipCache::Failed(key) => *key,
        }
    }

    fn mask(&self) -> Option<&ClipMask> {
        match self {
            ClipCache::Ready(mask) => Some(mask),
            ClipCache::Failed(_) => None,
        }
    }
}

/// What the intensity query needs from the last render
struct Snapshot {
    points: Vec<HeatPoint>,
    params: QueryParams,
    /// Logical to device pixel ratio
    ratio: (f64, f64),
    clip_key: Option<ClipKey>,
}

/// Heatmap renderer owning its memoized state: the kernel sprite, the
/// compiled land clip and the palette table. Each cache is keyed and
/// rebuilt when its key changes.
pub struct HeatmapEngine {
    config: HeatConfig,
    palette: Palette,
    target: RenderTarget,
    sprite: Option<(SpriteKey, KernelSprite)>,
    clip: Option<ClipCache>,
    surface: Option<Surface>,
    snapshot: Option<Snapshot>,
    /// Reported with the next render, then cleared
    pending: Vec<HeatError>,
}

impl HeatmapEngine {
    pub fn new(config: HeatConfig, width: usize, height: usize, pixel_scale: f64) -> Self {
        let mut engine = Self {
            palette: Palette::default(),
            config: HeatConfig::default(),
            target: RenderTarget::new(width, height, pixel_scale),
            sprite: None,
            clip: None,
            surface: None,
            snapshot: None,
            pending: Vec::new(),
        };
        if RenderTarget::was_clamped(width, height, pixel_scale) {
            engine.pending.push(degenerate_target(width, height, pixel_scale));
        }
        engine.set_config(config);
        engine
    }

    pub fn config(&self) -> &HeatConfig {
        &self.config
    }

    pub fn target(&self) -> RenderTarget {
        self.target
    }

    /// Replace the configuration. Keyed caches notice changes on the next
    /// render; the palette table is rebuilt here.
    pub fn set_config(&mut self, config: HeatConfig) {
        if config.palette != self.config.palette {
            self.palette = match Palette::new(&config.palette) {
                Ok(p) => p,
                Err(e) => {
                    log::warn!("{e}; using the default palette");
                    self.pending.push(e);
                    Palette::default()
                }
            };
        }
        if config.radius != self.config.radius && !(config.radius.is_finite() && config.radius >= MIN_RADIUS) {
            self.pending.push(HeatError::Config(format!(
                "kernel radius {} clamped to {MIN_RADIUS}",
                config.radius
            )));
        }
        if config.reference_width != self.config.reference_width
            && !(config.reference_width.is_finite() && config.reference_width > 0.0)
        {
            self.pending.push(HeatError::Config(format!(
                "reference width {} ignored",
                config.reference_width
            )));
        }
        self.config = config;
    }

    /// Apply a new render-target size: resize the target, drop the clip
    /// compiled for the old size, then drop the sprite if its width ratio
    /// no longer holds.
    pub fn resize(&mut self, width: usize, height: usize, pixel_scale: f64) {
        if RenderTarget::was_clamped(width, height, pixel_scale) {
            self.pending.push(degenerate_target(width, height, pixel_scale));
        }
        let target = RenderTarget::new(width, height, pixel_scale);
        if target == self.target {
            return;
        }
        self.target = target;
        self.clip = None;
        let ratio = self.reference_ratio();
        if self.sprite.as_ref().is_some_and(|(key, _)| key.ratio() != ratio) {
            self.sprite = None;
        }
    }

    /// Viewport width over the reference width
    fn reference_ratio(&self) -> f64 {
        let reference = self.config.reference_width;
        if reference.is_finite() && reference > 0.0 {
            self.target.width as f64 / reference
        } else {
            1.0
        }
    }

    /// Sanitized (radius, blur) in logical pixels at the current width
    fn kernel_size(&self) -> (f64, f64) {
        let ratio = self.reference_ratio();
        let radius = if self.config.radius.is_finite() {
            self.config.radius.max(MIN_RADIUS)
        } else {
            MIN_RADIUS
        };
        let blur = if self.config.blur.is_finite() {
            self.config.blur.max(0.0)
        } else {
            0.0
        };
        (radius * ratio, blur * ratio)
    }

    fn ensure_sprite(&mut self) -> bool {
        let key = SpriteKey::new(
            self.config.radius,
            self.config.blur,
            self.target.pixel_scale,
            self.reference_ratio(),
        );
        if self.sprite.as_ref().is_some_and(|(k, _)| *k == key) {
            return false;
        }
        let (radius, blur) = self.kernel_size();
        let sprite = KernelSprite::build(radius, blur, self.target.pixel_scale);
        log::debug!("kernel sprite rebuilt: {}px", sprite.size);
        self.sprite = Some((key, sprite));
        true
    }

    /// Returns whether the clip was rebuilt
    fn ensure_clip(&mut self, boundaries: &BoundarySet, projector: &Projector) -> bool {
        let key = ClipKey {
            projection: projector.kind,
            width: self.target.device_width(),
            height: self.target.device_height(),
            source: boundaries.fingerprint(),
        };
        if self.clip.as_ref().is_some_and(|c| c.key() == key) {
            return false;
        }
        self.clip = Some(match ClipMask::build(boundaries, projector, key.width, key.height) {
            Ok(mask) => {
                log::debug!(
                    "land clip rebuilt: {} rings, {:.1}% land",
                    mask.rings_used,
                    mask.coverage() * 100.0
                );
                ClipCache::Ready(mask)
            }
            Err(e) => {
                log::warn!("{e}; rendering without land clip");
                self.pending.push(e);
                ClipCache::Failed(key)
            }
        });
        true
    }

    /// Recompute the whole heat surface from `points`.
    pub fn render(&mut self, points: &[HeatPoint], boundaries: Option<&BoundarySet>) -> RenderReport {
        let mut report = RenderReport::default();
        let (dev_w, dev_h) = (self.target.device_width(), self.target.device_height());
        let projector = Projector::new(self.config.projection, dev_w as f64, dev_h as f64);

        report.sprite_rebuilt = self.ensure_sprite();
        if let Some(boundaries) = boundaries.filter(|_| self.config.clip) {
            report.clip_rebuilt = self.ensure_clip(boundaries, &projector);
        }
        let clip_key = if self.config.clip && boundaries.is_some() {
            self.clip.as_ref().and_then(|c| c.mask()).map(|m| m.key())
        } else {
            None
        };
        report.clipped = clip_key.is_some();
        report.issues.append(&mut self.pending);

        let Some((_, sprite)) = self.sprite.as_ref() else {
            return report;
        };
        let mask = clip_key.and(self.clip.as_ref()).and_then(|c| c.mask());

        let mut density = match DensityBuffer::try_new(dev_w, dev_h) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("{e}");
                report.issues.push(e);
                self.surface = None;
                self.snapshot = None;
                return report;
            }
        };

        let max = max_intensity(points, self.config.max_intensity);
        report.stats = density.accumulate(
            points,
            &projector,
            sprite,
            max,
            self.config.radius_boost,
            mask,
        );
        if report.stats.skipped_invalid > 0 {
            report.issues.push(HeatError::Data {
                count: report.stats.skipped_invalid,
            });
        }

        let params = QueryParams {
            projector,
            radius: sprite.radius_px,
            blur: sprite.blur_px,
            max_intensity: max,
            radius_boost: self.config.radius_boost,
        };

        let basemap = basemap_layer(
            boundaries,
            self.config.basemap,
            &projector,
            mask,
            (dev_w, dev_h),
            &mut report.issues,
        );
        let composed = colorize(&density, &self.palette, self.config.alpha_boost)
            .and_then(|heat| compose(self.config.background, &heat, basemap.as_ref(), self.config.basemap));

        match composed {
            Ok(surface) => {
                self.surface = Some(surface);
                self.snapshot = Some(Snapshot {
                    points: points.to_vec(),
                    params,
                    ratio: self.target.device_ratio(),
                    clip_key,
                });
                report.rendered = true;
            }
            Err(e) => {
                log::warn!("{e}");
                report.issues.push(e);
                self.surface = None;
                self.snapshot = None;
            }
        }
        report
    }

    /// The last composed surface, at device resolution
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    /// Blended intensity and nearest point at a logical pixel position,
    /// against the most recent render.
    pub fn query_hit(&self, x: f64, y: f64) -> QueryHit {
        let Some(snap) = self.snapshot.as_ref() else {
            return QueryHit::default();
        };
        let q = DVec2::new(x * snap.ratio.0, y * snap.ratio.1);
        let mask = snap
            .clip_key
            .and(self.clip.as_ref())
            .and_then(|c| c.mask())
            .filter(|m| Some(m.key()) == snap.clip_key);
        query(&snap.points, &snap.params, q, mask)
    }

    /// Tooltip payload for a logical pixel position
    pub fn query(&self, x: f64, y: f64) -> Tooltip {
        let hit = self.query_hit(x, y);
        let max = self.snapshot.as_ref().map_or(1.0, |s| s.params.max_intensity);
        Tooltip::from_hit(&hit, x, y, self.config.format, max)
    }

    /// Geographic position under a logical pixel, best effort
    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        Projector::new(
            self.config.projection,
            self.target.width as f64,
            self.target.height as f64,
        )
        .unproject(DVec2::new(x, y))
    }
}

/// Vector basemap for the current mode. A failure drops the layer and is
/// reported; the heat still renders.
fn basemap_layer(
    boundaries: Option<&BoundarySet>,
    mode: BasemapMode,
    projector: &Projector,
    land: Option<&ClipMask>,
    (width, height): (usize, usize),
    issues: &mut Vec<HeatError>,
) -> Option<Surface> {
    let boundaries = boundaries.filter(|_| mode != BasemapMode::Off)?;
    match render_basemap(boundaries, projector, land, &BasemapStyle::default(), width, height) {
        Ok(surface) => Some(surface),
        Err(e) => {
            log::warn!("{e}; drawing without basemap");
            issues.push(e);
            None
        }
    }
}

fn degenerate_target(width: usize, height: usize, pixel_scale: f64) -> HeatError {
    HeatError::Config(format!("render target {width}x{height} @{pixel_scale} clamped"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heat::boundary::BoundaryFeature;
    use crate::heat::projection::Projection;

    fn engine(width: usize, height: usize) -> HeatmapEngine {
        let config = HeatConfig {
            basemap: BasemapMode::Off,
            background: [0, 0, 0, 0],
            ..HeatConfig::default()
        };
        HeatmapEngine::new(config, width, height, 1.0)
    }

    fn nyc() -> HeatPoint {
        HeatPoint {
            label: Some("New York".into()),
            ..HeatPoint::new(40.7128, -74.0060, 100.0)
        }
    }

    fn world_box() -> BoundarySet {
        // the western hemisphere only
        BoundarySet::new(vec![BoundaryFeature {
            rings: vec![vec![(-170.0, -60.0), (-20.0, -60.0), (-20.0, 80.0), (-170.0, 80.0)]],
        }])
    }

    #[test]
    fn test_single_point_peak_and_label() {
        let mut e = engine(600, 300);
        let report = e.render(&[nyc()], None);
        assert!(report.rendered);
        assert_eq!(report.stats.stamped, 1);

        let center = Projector::new(Projection::Mercator, 600.0, 300.0).project(40.7128, -74.0060);
        let surface = e.surface().unwrap();
        let px = surface.pixel(center.x as usize, center.y as usize).unwrap();
        assert_eq!(px[3], 255);
        // warm: red channel dominates blue at the peak
        assert!(px[0] > px[2]);
        // far away stays clear
        assert_eq!(surface.pixel(500, 250).unwrap()[3], 0);

        let tip = e.query(center.x, center.y);
        assert!(tip.visible);
        assert_eq!(tip.text, "New York: 100%");
        let hit = e.query_hit(center.x, center.y);
        assert!((hit.blended - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_hotter_point_renders_hotter() {
        let mut e = engine(600, 300);
        let weak = HeatPoint::new(-20.0, 20.0, 10.0);
        let strong = HeatPoint::new(35.0, 100.0, 100.0);
        e.render(&[weak.clone(), strong.clone()], None);

        let p = Projector::new(Projection::Mercator, 600.0, 300.0);
        let (w, s) = (p.project(weak.lat, weak.lng), p.project(strong.lat, strong.lng));
        assert!((e.query_hit(w.x, w.y).blended - 0.1).abs() < 1e-9);
        assert!((e.query_hit(s.x, s.y).blended - 1.0).abs() < 1e-9);

        let surface = e.surface().unwrap();
        let weak_px = surface.pixel(w.x as usize, w.y as usize).unwrap();
        let strong_px = surface.pixel(s.x as usize, s.y as usize).unwrap();
        assert!(strong_px[3] > weak_px[3]);
        assert!(strong_px[0] > weak_px[0]);
    }

    #[test]
    fn test_radius_boost_query_matches_painted_ring() {
        let config = HeatConfig {
            basemap: BasemapMode::Off,
            background: [0, 0, 0, 0],
            radius_boost: 1.0,
            ..HeatConfig::default()
        };
        let mut e = HeatmapEngine::new(config, 600, 300, 1.0);
        let p = HeatPoint::new(0.0, 0.0, 100.0);
        e.render(&[p.clone()], None);

        let c = Projector::new(Projection::Mercator, 600.0, 300.0).project(p.lat, p.lng);
        let surface = e.surface().unwrap();
        // past the unboosted footprint (radius 28 + blur 15) but inside the doubled one
        let (x, y) = (c.x.floor() + 50.0, c.y.floor());
        let alpha = surface.pixel(x as usize, y as usize).unwrap()[3];
        assert!(alpha > 0);
        let hit = e.query_hit(x + 0.5, y + 0.5);
        assert!(hit.blended > 0.0);

        // both agree the field ends past the boosted extent
        let (fx, fy) = (c.x.floor() + 90.0, c.y.floor());
        assert_eq!(surface.pixel(fx as usize, fy as usize).unwrap()[3], 0);
        assert_eq!(e.query_hit(fx + 0.5, fy + 0.5).blended, 0.0);
    }

    #[test]
    fn test_out_of_range_inputs_do_not_panic() {
        let config = HeatConfig {
            clip: false,
            basemap: BasemapMode::Below,
            ..HeatConfig::default()
        };
        let mut e = HeatmapEngine::new(config, 600, 300, 1.0);
        let boundaries = BoundarySet::new(vec![BoundaryFeature {
            rings: vec![vec![(0.0, 0.0), (-1e10, 0.0), (10.0, 10.0), (0.0, 0.0)]],
        }]);
        let points = vec![HeatPoint::new(10.0, 1e300, 5.0), HeatPoint::new(0.0, 0.0, 5.0)];
        let report = e.render(&points, Some(&boundaries));
        assert!(report.rendered);
        assert!(report.issues.is_empty());

        let c = Projector::new(Projection::Mercator, 600.0, 300.0).project(0.0, 0.0);
        assert!((e.query_hit(c.x, c.y).blended - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_basemap_failure_is_reported() {
        let projector = Projector::new(Projection::Mercator, 600.0, 300.0);
        let world = world_box();
        let mut issues = Vec::new();
        let layer = basemap_layer(
            Some(&world),
            BasemapMode::Below,
            &projector,
            None,
            (usize::MAX, 2),
            &mut issues,
        );
        assert!(layer.is_none());
        assert!(matches!(issues.as_slice(), [HeatError::Resource(_)]));

        let mut issues = Vec::new();
        assert!(basemap_layer(Some(&world), BasemapMode::Off, &projector, None, (600, 300), &mut issues).is_none());
        assert!(basemap_layer(Some(&world), BasemapMode::Above, &projector, None, (600, 300), &mut issues).is_some());
        assert!(issues.is_empty());
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut e = engine(300, 150);
        let points = vec![nyc(), HeatPoint::new(51.5, -0.1, 40.0), HeatPoint::new(35.7, 139.7, 70.0)];
        e.render(&points, Some(&world_box()));
        let first = e.surface().unwrap().clone();
        e.render(&points, Some(&world_box()));
        assert_eq!(&first, e.surface().unwrap());
    }

    #[test]
    fn test_empty_points_transparent() {
        let mut e = engine(200, 100);
        let report = e.render(&[], None);
        assert!(report.rendered);
        assert!(e.surface().unwrap().is_transparent());
        assert!(!e.query(100.0, 50.0).visible);
    }

    #[test]
    fn test_saturation_is_opaque_max_heat() {
        let mut e = engine(200, 100);
        let points = vec![HeatPoint::new(0.0, 0.0, 5.0); 500];
        e.render(&points, None);
        let c = Projector::new(Projection::Mercator, 200.0, 100.0).project(0.0, 0.0);
        let px = e.surface().unwrap().pixel(c.x as usize, c.y as usize).unwrap();
        assert_eq!(px, [230, 20, 20, 255]);
    }

    #[test]
    fn test_invalid_points_reported() {
        let mut e = engine(200, 100);
        let report = e.render(&[HeatPoint::new(f64::NAN, 0.0, 1.0), nyc()], None);
        assert!(report.rendered);
        assert_eq!(report.stats.stamped, 1);
        assert!(report.issues.contains(&HeatError::Data { count: 1 }));
    }

    #[test]
    fn test_clip_restricts_heat_to_land() {
        let mut e = engine(600, 300);
        let tokyo = HeatPoint::new(35.7, 139.7, 100.0);
        let report = e.render(&[nyc(), tokyo.clone()], Some(&world_box()));
        assert!(report.clipped);
        assert!(report.clip_rebuilt);

        let p = Projector::new(Projection::Mercator, 600.0, 300.0);
        let (n, t) = (p.project(40.7128, -74.0060), p.project(tokyo.lat, tokyo.lng));
        let surface = e.surface().unwrap();
        assert_eq!(surface.pixel(n.x as usize, n.y as usize).unwrap()[3], 255);
        assert_eq!(surface.pixel(t.x as usize, t.y as usize).unwrap()[3], 0);
        // the query agrees with what was painted
        assert_eq!(e.query_hit(t.x, t.y).blended, 0.0);
        assert!(e.query_hit(n.x, n.y).blended > 0.99);

        // cache is reused while nothing changes
        let again = e.render(&[nyc()], Some(&world_box()));
        assert!(!again.clip_rebuilt);
        assert!(!again.sprite_rebuilt);
    }

    #[test]
    fn test_clip_skips_empty_ring_only() {
        let mut e = engine(600, 300);
        let boundaries = BoundarySet::new(vec![BoundaryFeature {
            rings: vec![vec![], vec![(-170.0, -60.0), (-20.0, -60.0), (-20.0, 80.0), (-170.0, 80.0)]],
        }]);
        let report = e.render(&[nyc()], Some(&boundaries));
        assert!(report.clipped);
        assert!(report.issues.is_empty());
        let first = e.surface().unwrap().clone();
        e.render(&[nyc()], Some(&boundaries));
        assert_eq!(&first, e.surface().unwrap());
    }

    #[test]
    fn test_unusable_geometry_degrades_to_unclipped() {
        let mut e = engine(600, 300);
        let broken = BoundarySet::new(vec![BoundaryFeature { rings: vec![vec![]] }]);
        let report = e.render(&[nyc()], Some(&broken));
        assert!(report.rendered);
        assert!(!report.clipped);
        assert!(matches!(report.issues.as_slice(), [HeatError::Geometry(_)]));

        let unclipped = {
            let mut plain = engine(600, 300);
            plain.render(&[nyc()], None);
            plain.surface().unwrap().clone()
        };
        assert_eq!(&unclipped, e.surface().unwrap());

        // reported once, not on every frame
        let again = e.render(&[nyc()], Some(&broken));
        assert!(again.issues.is_empty());
    }

    #[test]
    fn test_resize_rescales_layout() {
        let mut e = engine(600, 300);
        let points = vec![nyc(), HeatPoint::new(-33.9, 151.2, 60.0)];
        e.render(&points, None);
        e.resize(1200, 600, 1.0);
        let report = e.render(&points, None);
        assert!(report.sprite_rebuilt);

        let small = Projector::new(Projection::Mercator, 600.0, 300.0);
        let big = Projector::new(Projection::Mercator, 1200.0, 600.0);
        for p in &points {
            let (a, b) = (small.project(p.lat, p.lng), big.project(p.lat, p.lng));
            assert!((b - a * 2.0).length() < 1e-9);
            // each point is still the hottest spot under itself
            assert!(e.query_hit(b.x, b.y).blended > 0.59);
        }
        assert_eq!(e.surface().unwrap().width(), 1200);
    }

    #[test]
    fn test_resize_invalidates_clip() {
        let mut e = engine(600, 300);
        e.render(&[nyc()], Some(&world_box()));
        e.resize(800, 400, 1.0);
        assert!(e.render(&[nyc()], Some(&world_box())).clip_rebuilt);
        // the same size again keeps everything
        e.resize(800, 400, 1.0);
        let report = e.render(&[nyc()], Some(&world_box()));
        assert!(!report.clip_rebuilt && !report.sprite_rebuilt);
    }

    #[test]
    fn test_pixel_scale_doubles_surface_and_keeps_query() {
        let config = HeatConfig {
            basemap: BasemapMode::Off,
            ..HeatConfig::default()
        };
        let mut e = HeatmapEngine::new(config, 300, 150, 2.0);
        e.render(&[nyc()], None);
        assert_eq!(e.surface().unwrap().width(), 600);
        let c = Projector::new(Projection::Mercator, 300.0, 150.0).project(40.7128, -74.0060);
        assert!((e.query_hit(c.x, c.y).blended - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bad_config_is_clamped_and_reported() {
        let config = HeatConfig {
            radius: -5.0,
            palette: vec![],
            ..HeatConfig::default()
        };
        let mut e = HeatmapEngine::new(config, 0, 0, f64::INFINITY);
        let report = e.render(&[nyc()], None);
        assert!(report.rendered);
        let configs = report
            .issues
            .iter()
            .filter(|i| matches!(i, HeatError::Config(_)))
            .count();
        assert_eq!(configs, 3);
        assert_eq!(e.target(), RenderTarget::new(1, 1, 1.0));
    }

    #[test]
    fn test_query_before_render_is_hidden() {
        let e = engine(100, 50);
        assert!(!e.query(10.0, 10.0).visible);
    }
}
