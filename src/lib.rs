pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod sensing;
pub mod settings;
pub mod timeline;
pub mod timer;
pub mod utils;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};

use commands::Command;
use db::Database;
use settings::{SettingsRepository, SettingsStore};
use timer::{TimerController, TimerEvent};

const WINDOW_FEED_CAPACITY: usize = 32;

fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("FOCUSLINE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    std::env::var("HOME")
        .map(|home| PathBuf::from(home).join(".focusline"))
        .unwrap_or_else(|_| PathBuf::from(".focusline"))
}

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Focusline starting up...");

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(serve())
}

async fn serve() -> Result<()> {
    let app_data_dir = data_dir();
    std::fs::create_dir_all(&app_data_dir).with_context(|| {
        format!("failed to create data directory {}", app_data_dir.display())
    })?;

    let database = Database::new(app_data_dir.join("focusline.sqlite3"))?;
    let settings: Arc<dyn SettingsRepository> =
        Arc::new(SettingsStore::new(app_data_dir.join("settings.json"))?);

    let (feed_tx, feed_rx) = mpsc::channel(WINDOW_FEED_CAPACITY);
    let controller = TimerController::new(database, settings, feed_rx);
    if let Err(err) = controller.load_history().await {
        warn!("Could not load timeline history: {err:?}");
    }

    tokio::spawn(log_events(controller.subscribe()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                warn!("{err}");
                continue;
            }
        };

        match command {
            Command::Window(event) => {
                if feed_tx.send(event).await.is_err() {
                    warn!("Window feed closed; dropping event");
                }
            }
            command => match commands::dispatch(&controller, command).await {
                Ok(reply) => println!("{reply}"),
                Err(err) => warn!("Command failed: {err:?}"),
            },
        }
    }

    info!("Input closed, shutting down");
    if let Some(id) = controller.shutdown().await? {
        info!("Archived unfinished run {id}");
    }
    Ok(())
}

async fn log_events(mut events: broadcast::Receiver<TimerEvent>) {
    loop {
        match events.recv().await {
            Ok(TimerEvent::Heartbeat { clock, .. }) => {
                debug!("heartbeat: {} s left", clock.remaining_secs());
            }
            Ok(TimerEvent::StateChanged { clock }) => {
                info!(
                    "clock {:?} (paused: {}), {} s left",
                    clock.phase(),
                    clock.is_paused(),
                    clock.remaining_secs()
                );
            }
            Ok(TimerEvent::TimelineCommitted {
                tick,
                window_class,
                intervals,
            }) => {
                debug!("tick {tick}: {intervals} intervals committed for {window_class}");
            }
            Ok(TimerEvent::SessionArchived { timeline }) => {
                info!("timeline {} archived", timeline.id);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("event log skipped {skipped} events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
