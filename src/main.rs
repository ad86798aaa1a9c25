//! gitgutter - git change markers for a file in the terminal.

use std::io::{self, Write};
use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

use gitgutter::core::Settings;
use gitgutter::log::{self, LogConfig};
use gitgutter::ui::{annotate, handle_input, render, App};

/// How long `--print` waits for the repository lookup.
const PRINT_SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Show git change markers for a file.
#[derive(Parser, Debug)]
#[command(name = "gitgutter", version, about)]
struct Cli {
    /// File to open
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Stop at the first/last diff instead of wrapping around
    #[arg(long = "no-wrap")]
    no_wrap: bool,

    /// Show change icons in the gutter
    #[arg(long = "icons")]
    icons: bool,

    /// Hide line numbers
    #[arg(long = "no-line-numbers")]
    no_line_numbers: bool,

    /// Print the annotated file to stdout and exit
    #[arg(long = "print")]
    print: bool,

    /// Write logs to this file (or directory)
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Apply flags on top of the saved settings.
    fn settings(&self, mut settings: Settings) -> Settings {
        if self.no_wrap {
            settings.wrap_around_on_move_to_diff = false;
        }
        if self.icons {
            settings.show_icons_in_editor_gutter = true;
        }
        if self.no_line_numbers {
            settings.show_line_numbers = false;
        }
        settings
    }
}

/// RAII guard for terminal state. Restores terminal on drop (including panic).
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = disable_raw_mode();
        let _ = io::stdout().flush();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let _log_guard = match log::init(LogConfig {
        log_file_path: cli.log_file.clone(),
        stderr: false,
    }) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {}", e);
            None
        }
    };
    gitgutter::metrics::init();

    let saved = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "using default settings");
            eprintln!("Warning: {}", e);
            Settings::default()
        }
    };
    let settings = cli.settings(saved);

    let app = App::new(&cli.file, settings)?;

    if cli.print {
        return print_annotated(app, settings.show_line_numbers);
    }

    run_tui(app)
}

/// Write the annotated file to stdout.
fn print_annotated(mut app: App, show_line_numbers: bool) -> Result<()> {
    if !app.settle(PRINT_SETTLE_TIMEOUT) {
        tracing::warn!("repository lookup timed out");
    }
    let text = annotate(app.editor(), show_line_numbers);
    app.shutdown();

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    stdout.flush().context("Failed to write to stdout")?;
    Ok(())
}

/// Run the TUI application.
fn run_tui(mut app: App) -> Result<()> {
    // Set panic hook to ensure terminal cleanup
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = disable_raw_mode();
        let _ = io::stdout().flush();
        default_hook(info);
    }));

    let guard = TerminalGuard::new().context("Failed to set up terminal")?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app);

    drop(guard);
    app.shutdown();
    result
}

fn run_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.poll();

        // Only redraw if dirty or on resize
        if app.dirty {
            terminal.draw(|frame| render(frame, app))?;
            app.clear_dirty();
        }

        // Poll for events with timeout
        if event::poll(Duration::from_millis(50))? {
            let event = event::read()?;
            handle_input(app, event);
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
