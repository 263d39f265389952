use tui_heatmap::config::Config;
use tui_heatmap::heat::{BoundarySet, HeatConfig, HeatPoint, HeatmapEngine, RenderReport, Tooltip};

/// Step for the `+`/`-` and `[`/`]` keys, in reference pixels
const KERNEL_STEP: f64 = 2.0;

/// Application state
pub struct App {
    pub engine: HeatmapEngine,
    pub points: Vec<HeatPoint>,
    pub boundaries: Option<BoundarySet>,
    pub should_quit: bool,
    /// Current mouse position, terminal cells
    pub mouse_pos: Option<(u16, u16)>,
    pub tooltip: Tooltip,
    /// Geographic position under the cursor
    pub cursor_geo: Option<(f64, f64)>,
    pub last_report: RenderReport,
    /// Most recent render issue, shown in the status bar
    pub last_issue: Option<String>,
    /// Config as loaded, restored by `reset`
    initial: HeatConfig,
    initial_scale: f64,
    pixel_scale: f64,
    dirty: bool,
}

/// Heat pixels for a terminal of `width`×`height` cells: one column per
/// cell, two rows per cell (upper half block), minus border and status bar.
pub fn pixel_size(width: usize, height: usize) -> (usize, usize) {
    let inner_width = width.saturating_sub(2);
    let inner_height = height.saturating_sub(3);
    (inner_width, inner_height * 2)
}

impl App {
    pub fn new(
        config: &Config,
        points: Vec<HeatPoint>,
        boundaries: Option<BoundarySet>,
        width: usize,
        height: usize,
    ) -> Self {
        let (pw, ph) = pixel_size(width, height);
        let pixel_scale = config.display.pixel_scale;
        Self {
            engine: HeatmapEngine::new(config.heat.clone(), pw, ph, pixel_scale),
            points,
            boundaries,
            should_quit: false,
            mouse_pos: None,
            tooltip: Tooltip::default(),
            cursor_geo: None,
            last_report: RenderReport::default(),
            last_issue: None,
            initial: config.heat.clone(),
            initial_scale: pixel_scale,
            pixel_scale,
            dirty: true,
        }
    }

    /// Re-render if anything changed since the last frame
    pub fn refresh(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        let report = self.engine.render(&self.points, self.boundaries.as_ref());
        for issue in &report.issues {
            log::warn!("render: {issue}");
        }
        if let Some(issue) = report.issues.last() {
            self.last_issue = Some(issue.to_string());
        }
        self.last_report = report;
        self.update_hover();
    }

    /// Update render target when terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        let (pw, ph) = pixel_size(width, height);
        self.engine.resize(pw, ph, self.pixel_scale);
        self.dirty = true;
    }

    fn update_config(&mut self, f: impl FnOnce(&mut HeatConfig)) {
        let mut config = self.engine.config().clone();
        f(&mut config);
        self.engine.set_config(config);
        self.dirty = true;
    }

    pub fn toggle_projection(&mut self) {
        self.update_config(|c| c.projection = c.projection.toggled());
    }

    pub fn toggle_clip(&mut self) {
        self.update_config(|c| c.clip = !c.clip);
    }

    pub fn cycle_basemap(&mut self) {
        self.update_config(|c| c.basemap = c.basemap.next());
    }

    pub fn adjust_radius(&mut self, steps: f64) {
        self.update_config(|c| c.radius = (c.radius + steps * KERNEL_STEP).max(KERNEL_STEP));
    }

    pub fn adjust_blur(&mut self, steps: f64) {
        self.update_config(|c| c.blur = (c.blur + steps * KERNEL_STEP).max(0.0));
    }

    /// Switch the device pixel scale between 1 and 2
    pub fn toggle_pixel_scale(&mut self) {
        self.pixel_scale = if self.pixel_scale > 1.0 { 1.0 } else { 2.0 };
        let target = self.engine.target();
        self.engine.resize(target.width, target.height, self.pixel_scale);
        self.dirty = true;
    }

    /// Back to the loaded configuration
    pub fn reset(&mut self) {
        self.engine.set_config(self.initial.clone());
        self.pixel_scale = self.initial_scale;
        let target = self.engine.target();
        self.engine.resize(target.width, target.height, self.pixel_scale);
        self.last_issue = None;
        self.dirty = true;
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Update mouse cursor position and the hover tooltip
    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
        self.update_hover();
    }

    /// Cursor position in logical heat pixels, at the center of the cell.
    /// `None` outside the map area.
    pub fn mouse_pixel_pos(&self) -> Option<(f64, f64)> {
        let (col, row) = self.mouse_pos?;
        // Account for border (1 cell offset)
        let (col, row) = (col.checked_sub(1)?, row.checked_sub(1)?);
        let target = self.engine.target();
        let x = col as f64 + 0.5;
        let y = row as f64 * 2.0 + 1.0;
        (x < target.width as f64 && y < target.height as f64).then_some((x, y))
    }

    fn update_hover(&mut self) {
        match self.mouse_pixel_pos() {
            Some((x, y)) => {
                self.tooltip = self.engine.query(x, y);
                self.cursor_geo = Some(self.engine.unproject(x, y));
            }
            None => {
                self.tooltip = Tooltip::default();
                self.cursor_geo = None;
            }
        }
    }

    pub fn pixel_scale(&self) -> f64 {
        self.pixel_scale
    }

    pub fn cursor_coords(&self) -> String {
        match self.cursor_geo {
            Some((lat, lng)) => {
                let lat_dir = if lat >= 0.0 { 'N' } else { 'S' };
                let lng_dir = if lng >= 0.0 { 'E' } else { 'W' };
                format!("{:.2}°{} {:.2}°{}", lat.abs(), lat_dir, lng.abs(), lng_dir)
            }
            None => "--".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tui_heatmap::heat::basemap::BasemapMode;
    use tui_heatmap::heat::Projection;

    fn app() -> App {
        let config = Config::default();
        let points = vec![HeatPoint {
            label: Some("Null Island".into()),
            ..HeatPoint::new(0.0, 0.0, 1.0)
        }];
        App::new(&config, points, None, 102, 53)
    }

    #[test]
    fn test_pixel_size() {
        assert_eq!(pixel_size(102, 53), (100, 100));
        assert_eq!(pixel_size(1, 1), (0, 0));
    }

    #[test]
    fn test_hover_over_point() {
        let mut app = app();
        app.refresh();
        assert!(app.last_report.rendered);
        // 100x100 mercator: (0, 0) projects to (50, 50) -> column 50, row 25, plus the border
        app.set_mouse_pos(51, 26);
        assert!(app.tooltip.visible);
        assert!(app.tooltip.text.starts_with("Null Island"));
        let (lat, lng) = app.cursor_geo.unwrap();
        assert!(lat.abs() < 5.0 && lng.abs() < 5.0);

        app.set_mouse_pos(0, 0);
        assert!(!app.tooltip.visible);
        assert!(app.cursor_geo.is_none());
    }

    #[test]
    fn test_toggles_mark_dirty_and_apply() {
        let mut app = app();
        app.refresh();
        app.toggle_projection();
        app.toggle_clip();
        app.cycle_basemap();
        app.adjust_radius(-100.0);
        app.refresh();
        let config = app.engine.config();
        assert_eq!(config.projection, Projection::Equirectangular);
        assert!(!config.clip);
        assert_eq!(config.basemap, BasemapMode::Above);
        assert_eq!(config.radius, KERNEL_STEP);

        app.reset();
        assert_eq!(app.engine.config().projection, Projection::Mercator);
        assert_eq!(app.engine.config().radius, 28.0);
    }

    #[test]
    fn test_pixel_scale_toggle() {
        let mut app = app();
        app.toggle_pixel_scale();
        app.refresh();
        assert_eq!(app.pixel_scale(), 2.0);
        assert_eq!(app.engine.surface().unwrap().width(), 200);
        app.toggle_pixel_scale();
        assert_eq!(app.pixel_scale(), 1.0);
    }
}
