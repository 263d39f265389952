use crate::app::App;
use tui_heatmap::heat::surface::{blend_over, Surface};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
    Frame,
};

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Split into map area and status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_map(frame, app, chunks[0]);
    render_status_bar(frame, app, chunks[1]);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Heatmap ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Some(surface) = app.engine.surface() {
        let (sx, sy) = app.engine.target().device_ratio();
        frame.render_widget(HeatWidget { surface, sx, sy }, inner);
    }

    if app.tooltip.visible {
        render_tooltip(frame, app, inner);
    }
}

/// Draws a surface with upper half blocks: foreground is the top pixel,
/// background the bottom one.
struct HeatWidget<'a> {
    surface: &'a Surface,
    /// Device pixels per logical pixel
    sx: f64,
    sy: f64,
}

impl HeatWidget<'_> {
    /// Average the device pixels covering one logical pixel, flattened onto
    /// black
    fn logical_pixel(&self, x: usize, y: usize) -> Color {
        let x0 = (x as f64 * self.sx) as usize;
        let y0 = (y as f64 * self.sy) as usize;
        let x1 = (((x + 1) as f64 * self.sx) as usize).max(x0 + 1);
        let y1 = (((y + 1) as f64 * self.sy) as usize).max(y0 + 1);

        let (mut sum, mut n) = ([0u32; 3], 0u32);
        for py in y0..y1 {
            for px in x0..x1 {
                if let Some(p) = self.surface.pixel(px, py) {
                    let [r, g, b, _] = blend_over([0, 0, 0, 255], p);
                    sum[0] += r as u32;
                    sum[1] += g as u32;
                    sum[2] += b as u32;
                    n += 1;
                }
            }
        }
        if n == 0 {
            return Color::Reset;
        }
        Color::Rgb((sum[0] / n) as u8, (sum[1] / n) as u8, (sum[2] / n) as u8)
    }
}

impl Widget for HeatWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for row in 0..area.height {
            for col in 0..area.width {
                let top = self.logical_pixel(col as usize, row as usize * 2);
                let bottom = self.logical_pixel(col as usize, row as usize * 2 + 1);
                buf[(area.x + col, area.y + row)]
                    .set_char('▀')
                    .set_fg(top)
                    .set_bg(bottom);
            }
        }
    }
}

/// Tooltip box next to the cursor, flipped to stay inside the map
fn render_tooltip(frame: &mut Frame, app: &App, inner: Rect) {
    let Some((col, row)) = app.mouse_pos else {
        return;
    };
    let width = (app.tooltip.text.chars().count() as u16 + 2).min(inner.width);
    if width == 0 || inner.height == 0 {
        return;
    }

    let right = col.saturating_add(2);
    let x = if right + width <= inner.x + inner.width {
        right
    } else {
        col.saturating_sub(width + 1).max(inner.x)
    };
    let y = (if row > inner.y { row - 1 } else { row + 1 }).min(inner.y + inner.height - 1);

    let rect = Rect::new(x, y, width, 1);
    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(format!(" {} ", app.tooltip.text))
            .style(Style::default().fg(Color::Black).bg(Color::White)),
        rect,
    );
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let config = app.engine.config();
    let on_off = |on: bool| if on { Color::Green } else { Color::DarkGray };
    let clip_active = app.last_report.clipped;

    let mut spans = vec![
        Span::styled(" ", Style::default()),
        Span::styled(config.projection.name(), Style::default().fg(Color::Yellow)),
        Span::styled(" r:", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{:.0}", config.radius), Style::default().fg(Color::Magenta)),
        Span::styled(" b:", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{:.0}", config.blur), Style::default().fg(Color::Magenta)),
        Span::styled(format!(" x{:.0} ", app.pixel_scale()), Style::default().fg(Color::DarkGray)),
        Span::styled(
            if clip_active { "[C]lip " } else { "[c]lip " },
            Style::default().fg(on_off(clip_active)),
        ),
        Span::styled(
            format!("[m]ap:{:?} ", config.basemap).to_lowercase(),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.cursor_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(
            format!(" | {} pts", app.last_report.stats.stamped),
            Style::default().fg(Color::White),
        ),
    ];
    if let Some(issue) = &app.last_issue {
        spans.push(Span::styled(format!(" | {issue}"), Style::default().fg(Color::Red)));
    }
    spans.push(Span::styled(
        " | p:proj +/-:radius [/]:blur d:scale r:reset q:quit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
