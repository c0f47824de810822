// main.rs

mod app;
mod tui;

use crate::app::App;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::fs::{OpenOptions, create_dir_all};
use std::io;
use std::sync::Mutex;
use tasklane::TaskClient;
use tasklane::backend::{build_auth, build_repository};
use tasklane::config::{Config, Paths};
use tracing_subscriber::EnvFilter;

// The terminal belongs to the UI, so logs go to a file.
fn init_tracing(paths: &Paths, log_level: &str) -> io::Result<()> {
    create_dir_all(paths.data_dir())?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths.log_file())?;

    let filter = EnvFilter::try_from_env("TASKLANE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("tasklane={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let paths = Paths::resolve().ok_or("could not determine a home directory")?;

    // First run: leave a config file behind for the user to fill in.
    if !paths.config_file().exists() {
        if let Err(e) = Config::default().save() {
            eprintln!("Failed to write default config: {}", e);
        }
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Config file: {}", paths.config_file().display());
            std::process::exit(2);
        }
    };

    if let Err(e) = init_tracing(&paths, &config.log_level) {
        eprintln!("Logging disabled: {}", e);
    }
    tracing::info!(backend = ?config.backend, "starting");

    let auth = build_auth(&config, Some(paths.session_file()))?;
    let repo = build_repository(&config)?;
    let mut client = TaskClient::new(auth, repo);

    // Restore the previous session before the first frame.
    let startup_error = client.check_auth().await.err();
    let mut app = App::new(client);
    app.error_message = startup_error.map(|e| e.to_string());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = tui::run_app(&mut terminal, &mut app).await;

    // Restore terminal state
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = %err, "event loop failed");
        eprintln!("Application error: {}", err);
    }
    tracing::info!("exiting");

    Ok(())
}
