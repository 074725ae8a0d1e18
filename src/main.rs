// geowatch - live world map of the host's network connections

mod app;
mod cli;
mod geo;
mod net;
mod theme;
mod track;
mod ui;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use app::{event::handle_key_event, AppState};
use clap::Parser;
use cli::Cli;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use geo::{MaxMindDb, Resolver};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.validate()?;
    init_logging(cli.log_file.as_deref())?;

    tracing::info!(
        dataset = %cli.dataset.display(),
        "starting; IP geolocation is approximate, interpret locations with caution"
    );

    // Fatal startup gate: without the dataset there is no useful degraded
    // mode, so fail before the terminal is touched.
    let db = MaxMindDb::open(&cli.dataset)
        .with_context(|| format!("cannot use geolocation dataset {}", cli.dataset.display()))?;
    let resolver = Resolver::new(Box::new(db));

    let mut app = AppState::new(
        resolver,
        cli.poll_interval,
        cli.render_interval,
        cli.effective_ttl(),
        cli.ttl.is_none(),
        cli.ipv6,
    );

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

/// Send tracing output to the log file, if one was requested. The TUI owns
/// stdout, so there is no console logging.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut AppState,
) -> Result<()> {
    loop {
        if app.on_tick(Instant::now()) {
            terminal.draw(|f| ui::draw(f, app))?;
        }

        if !app.running {
            return Ok(());
        }

        // Sleep until the next poll or render tick is due, waking early on
        // input.
        if event::poll(app.next_deadline(Instant::now()))? {
            if let Event::Key(key) = event::read()? {
                handle_key_event(app, key.code);
            }
        }
    }
}
