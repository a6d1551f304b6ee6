//! gitmarks: terminal grading workspace for GitMarks classrooms.
//!
//! # Startup order
//!
//! 1. Parse flags, load config, start file logging. Nothing touches the
//!    terminal yet, so errors here print normally.
//! 2. Build the API client and open the draft store. A draft store that
//!    fails to open is logged and grading continues without persistence.
//! 3. `install_panic_hook()` before `init_tui()` so a panic restores the
//!    terminal first.
//! 4. Spawn the input task and the workers, queue the initial selection.
//!
//! A subcommand (`gitmarks classroom ...`, `org`, `rubric`) runs after step 2
//! and exits without touching the terminal.
//!
//! The event loop exits only via `break`, so `restore_tui()` always runs.

mod app;
mod cmd;
mod config;
mod event;
mod theme;
mod tui;
mod ui;
mod worker;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use clap::Parser;
use gitmarks_core::api::ApiClient;
use gitmarks_core::db;
use tokio_rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use crate::app::AppState;
use crate::event::{AppEvent, EventHandler};
use crate::theme::Theme;
use crate::ui::keybindings::{handle_key, handle_mouse, KeyAction};
use crate::worker::{ApiWorker, DraftWorker, Workers};

/// Grade GitMarks student work from the terminal.
#[derive(Parser, Debug)]
#[command(name = "gitmarks", version, about)]
struct Args {
    /// Classroom id; defaults to the last one used.
    #[arg(long)]
    classroom: Option<i64>,
    /// Assignment id to grade.
    #[arg(long)]
    assignment: Option<i64>,
    /// Student work id; defaults to the first work of the assignment.
    #[arg(long)]
    work: Option<i64>,
    /// Config file path.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides `api_url` from the config file.
    #[arg(long)]
    api_url: Option<String>,
    /// Run one administrative command instead of the grading workspace.
    #[command(subcommand)]
    command: Option<cmd::Command>,
}

/// Sends tracing output to `path`; the terminal belongs to the UI. The
/// filter comes from `GITMARKS_LOG`, default `info`.
fn init_logging(path: &Path) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_env("GITMARKS_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn open_drafts(path: &Path) -> Option<Connection> {
    if let Some(dir) = path.parent() {
        if let Err(err) = std::fs::create_dir_all(dir) {
            tracing::error!(error = %err, dir = %dir.display(), "cannot create draft directory");
            return None;
        }
    }
    match db::open_db(&path.to_string_lossy()).await {
        Ok(conn) => Some(conn),
        Err(err) => {
            tracing::error!(error = %err, path = %path.display(), "draft store unavailable; drafts stay in memory");
            None
        }
    }
}

async fn saved_classroom(conn: Option<&Connection>) -> Option<i64> {
    let value = match db::get_preference(conn?, db::SELECTED_CLASSROOM).await {
        Ok(value) => value?,
        Err(err) => {
            tracing::warn!(error = %err, "could not read saved classroom");
            return None;
        }
    };
    value.parse().ok()
}

fn drain_requests(state: &mut AppState, workers: &mut Workers) {
    for request in state.take_requests() {
        workers.dispatch(request);
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(config::config_path);
    let (mut cfg, warning) = config::load(&config_path);
    if let Some(url) = args.api_url {
        cfg.api_url = url;
    }
    init_logging(&cfg.log_file)?;
    if let Some(warning) = warning {
        tracing::warn!("{warning}");
    }
    tracing::info!(api = %cfg.api_url, config = %config_path.display(), "starting gitmarks");

    let theme = Theme::from_name(&cfg.theme);
    let client = ApiClient::new(&cfg.api_url, cfg.session_cookie.as_deref())
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    let drafts_conn = open_drafts(&cfg.drafts_db).await;

    if let Some(command) = args.command {
        if let Err(err) = cmd::run(command, &client, drafts_conn.as_ref()).await {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err}");
            std::process::exit(1);
        }
        return Ok(());
    }

    let classroom = match args.classroom {
        Some(id) => Some(id),
        None => saved_classroom(drafts_conn.as_ref()).await,
    };

    tui::install_panic_hook();
    let term_flag = tui::register_sigterm()?;
    let mut terminal = tui::init_tui()?;

    let handler = EventHandler::new();
    event::spawn_event_task(handler.tx.clone());
    let mut rx = handler.rx;

    let poll_every = Duration::from_secs(cfg.user_poll_secs.max(1));
    let api = ApiWorker::new(client, handler.tx.clone(), poll_every);
    let _user_poll = api.spawn_user_poll(poll_every);
    let drafts = DraftWorker::spawn(drafts_conn, handler.tx.clone());
    let mut workers = Workers::new(api, drafts, handler.tx.clone());

    let mut state = AppState::new(theme.syntax_theme);
    state.start(classroom, args.assignment, args.work);
    drain_requests(&mut state, &mut workers);

    'event_loop: loop {
        tokio::select! {
            // Guarantees the SIGTERM flag is polled on a quiet terminal.
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
            maybe_event = rx.recv() => {
                let Some(event) = maybe_event else {
                    break 'event_loop;
                };
                match event {
                    AppEvent::Render => {
                        terminal.draw(|frame| ui::render(frame, &mut state, &theme))?;
                    }
                    AppEvent::Key(key) => {
                        if handle_key(key, &mut state) == KeyAction::Quit {
                            break 'event_loop;
                        }
                    }
                    AppEvent::Mouse(mouse) => {
                        handle_mouse(mouse, &mut state);
                    }
                    AppEvent::Resize(width, height) => state.on_resize(width, height),
                    AppEvent::FocusGained => state.on_focus_gained(),
                    AppEvent::Tick => state.on_tick(Instant::now()),
                    AppEvent::Api(result) => state.apply_api(*result),
                    AppEvent::Highlighted(result) => state.apply_highlight(*result),
                    AppEvent::Drafts(result) => state.apply_drafts(*result),
                }
                drain_requests(&mut state, &mut workers);
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
        }
    }

    tui::restore_tui()?;
    tracing::info!("gitmarks exited");
    Ok(())
}
