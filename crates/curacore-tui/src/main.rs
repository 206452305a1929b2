use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use curacore_core::{ApiClient, Config, FileStorage, SessionStore};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod app;
mod field;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "curacore")]
#[command(about = "Terminal client for CuraCore: AI triage, doctor booking and dashboards")]
#[command(version)]
struct Cli {
    /// Backend base URL, e.g. http://127.0.0.1:8001/api
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory holding the stored session
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Forget the stored session
    Logout,
    /// Show who is signed in
    Whoami,
    /// Save the backend base URL to the config file
    SetApiUrl {
        /// New base URL
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Ignoring unreadable config file: {:#}", e);
        Config::new()
    });
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }

    let _log_guard = init_logging(&config)?;
    let storage = FileStorage::new(config.data_dir()?);

    match cli.command {
        None => {
            let base_url = cli.api_url.unwrap_or_else(|| config.api_base_url());
            run_tui(&config, &base_url, storage).await
        }
        Some(Commands::Logout) => {
            let mut session = SessionStore::load(storage);
            session.clear()?;
            println!("Signed out.");
            Ok(())
        }
        Some(Commands::Whoami) => {
            let session_dir = storage.dir().display().to_string();
            let session = SessionStore::load(storage);
            match session.current() {
                Some(user) => println!("{} <{}> ({}, id {})", user.display_name, user.email, user.role, user.subject_id),
                None => println!("Not signed in."),
            }
            println!("Session stored in {}", session_dir);
            Ok(())
        }
        Some(Commands::SetApiUrl { url }) => {
            // Reload so command-line overrides are not written back
            let mut file_config = Config::load()?;
            file_config.api_base_url = Some(url.trim_end_matches('/').to_string());
            file_config.save()?;
            println!("Backend URL set to {}", url.trim_end_matches('/'));
            Ok(())
        }
    }
}

/// Log to a daily file; the terminal belongs to the UI
fn init_logging(config: &Config) -> Result<WorkerGuard> {
    let log_dir = config.log_dir()?;
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Could not create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "curacore.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("curacore_core=info,curacore=info"));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(filter)
        .init();

    Ok(guard)
}

async fn run_tui(config: &Config, base_url: &str, storage: FileStorage) -> Result<()> {
    let api = ApiClient::with_timeout(base_url, config.request_timeout())?;
    info!(base_url = api.base_url(), "Starting CuraCore");

    let session = SessionStore::load(storage);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(session, api, events.sender());

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        app.enforce_guard();
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}
