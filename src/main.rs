mod analysis;
mod app;
mod braille;
mod choropleth;
mod cli;
mod config;
mod data;
mod error;
mod map;
mod report;
mod ui;

use anyhow::{bail, Context, Result};
use app::{App, AppOptions};
use cli::Args;
use config::{Config, Settings, DEFAULT_CONFIG_FILE};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use data::{Datasets, SourceCache};
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse_args();

    if args.init_config {
        return init_config(&args);
    }

    let mut config = Config::discover(&args)?;
    config.merge_with_args(&args);
    let settings = config.settings()?;

    init_logging(&args, &settings)?;

    eprintln!("Cargando datos...");
    let mut cache = SourceCache::new();
    let data = Datasets::load(&mut cache, &settings.sources).context("Failed to load datasets")?;

    if args.print {
        let year = match settings.year {
            Some(year) => year,
            None => match data.events.years().first() {
                Some(&year) => year,
                None => bail!("the event table has no rows"),
            },
        };
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        report::write_report(&mut out, &data, settings.kind, year).context("Failed to write report")?;
        return Ok(());
    }

    let options = AppOptions {
        kind: settings.kind,
        year: settings.year,
        map: settings.map,
    };
    let mut app = App::new(data, options)?;

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    // Run the app
    let result = run(&mut terminal, &mut app);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Write a default configuration file, refusing to overwrite one
fn init_config(args: &Args) -> Result<()> {
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    std::fs::write(&path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}

/// Logs go to stderr in print mode and to a file while the dashboard runs
fn init_logging(args: &Args, settings: &Settings) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_directive()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false);

    if args.print {
        builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(anyhow::Error::msg)
    } else {
        let file = std::fs::File::create(&settings.log_file).with_context(|| {
            format!("Failed to create log file: {}", settings.log_file.display())
        })?;
        builder
            .with_writer(Mutex::new(file))
            .try_init()
            .map_err(anyhow::Error::msg)
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),

        // Selectors
        KeyCode::Tab | KeyCode::Char('e') => app.next_kind(),
        KeyCode::BackTab | KeyCode::Char('E') => app.prev_kind(),
        KeyCode::Left | KeyCode::Char('[') => app.prev_year(),
        KeyCode::Right | KeyCode::Char(']') => app.next_year(),

        // Table scrolling
        KeyCode::Up => app.scroll_table(-1),
        KeyCode::Down => app.scroll_table(1),
        KeyCode::PageUp => app.scroll_table(-5),
        KeyCode::PageDown => app.scroll_table(5),

        // Pan with hjkl
        KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Char('j') => app.pan(0, 6),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        // Layer toggles
        KeyCode::Char('L') => app.map_renderer.toggle_labels(),
        KeyCode::Char('o') | KeyCode::Char('O') => app.map_renderer.toggle_outlines(),

        // Reset view
        KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),

        _ => {}
    }
}

/// Handle mouse events for panning and zooming
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    // Always track mouse position for cursor marker and tooltip
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        // Scroll wheel for zooming towards mouse position
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Click and drag to pan
        MouseEventKind::Down(MouseButton::Left) => app.start_drag(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => {
            if app.last_mouse.is_some() {
                app.handle_drag(mouse.column, mouse.row);
            }
        }
        MouseEventKind::Up(MouseButton::Left) => app.end_drag(),
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;
        app.sync_map_area();

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
                Event::Mouse(mouse) => handle_mouse(app, mouse),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
