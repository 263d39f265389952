mod app;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;
use tui_heatmap::heat::Projection;
use tui_heatmap::{config, data};

#[derive(Parser, Debug)]
#[command(name = "tui-heatmap")]
#[command(about = "Kernel-density heatmap of geographic points in the terminal")]
struct Args {
    /// JSON array of points ({lat, lng, intensity, label})
    #[arg(short, long)]
    points: Option<PathBuf>,

    /// GeoJSON landmass polygons used for clipping and the basemap
    #[arg(short, long)]
    boundaries: Option<PathBuf>,

    /// YAML config file (defaults to ./tui-heatmap.yaml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write logs here; logging is off otherwise so the UI stays clean
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Override the configured projection
    #[arg(long, value_parser = parse_projection)]
    projection: Option<Projection>,
}

fn parse_projection(s: &str) -> Result<Projection, String> {
    match s.to_ascii_lowercase().as_str() {
        "mercator" => Ok(Projection::Mercator),
        "equirectangular" | "equirect" => Ok(Projection::Equirectangular),
        other => Err(format!("unknown projection '{other}' (mercator, equirectangular)")),
    }
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    match log_file {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("info"))
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
        }
        None => env_logger::init_from_env(env_logger::Env::new().default_filter_or("off")),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    let mut cfg = config::load(args.config.as_deref());
    if let Some(projection) = args.projection {
        cfg.heat.projection = projection;
    }

    // Load data before touching the terminal so errors print normally
    let points = match args.points.as_ref().or(cfg.points.as_ref()) {
        Some(path) => data::load_points(path)?,
        None => data::sample_points(),
    };
    let boundaries = match args.boundaries.as_ref().or(cfg.boundaries.as_ref()) {
        Some(path) => match data::load_boundaries(path) {
            Ok(set) => Some(set),
            Err(e) => {
                log::warn!("{e:#}; rendering without land clip");
                None
            }
        },
        None => Some(data::simple_world()),
    };

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let size = terminal.size()?;
    let app = App::new(&cfg, points, boundaries, size.width as usize, size.height as usize);
    let result = run(&mut terminal, app);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
    let mut redraw = true;
    loop {
        app.refresh();
        if redraw {
            terminal.draw(|frame| ui::render(frame, &app))?;
            redraw = false;
        }

        // Draw on demand: only redraw after an event was handled
        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        redraw = true;
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                KeyCode::Char('p') | KeyCode::Char('P') => app.toggle_projection(),
                KeyCode::Char('c') | KeyCode::Char('C') => app.toggle_clip(),
                KeyCode::Char('m') | KeyCode::Char('M') => app.cycle_basemap(),
                KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_radius(1.0),
                KeyCode::Char('-') | KeyCode::Char('_') => app.adjust_radius(-1.0),
                KeyCode::Char(']') => app.adjust_blur(1.0),
                KeyCode::Char('[') => app.adjust_blur(-1.0),
                KeyCode::Char('d') | KeyCode::Char('D') => app.toggle_pixel_scale(),
                KeyCode::Char('r') | KeyCode::Char('0') => app.reset(),
                _ => redraw = false,
            },
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                    app.set_mouse_pos(mouse.column, mouse.row);
                }
                _ => redraw = false,
            },
            Event::Resize(width, height) => app.resize(width as usize, height as usize),
            _ => redraw = false,
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
