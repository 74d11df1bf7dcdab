use std::path::PathBuf;

mod backend_bridge;
mod config;
mod controller;
mod ui;

use anyhow::{anyhow, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::backend_bridge::{commands::BackendCommand, runtime};
use crate::config::{load_settings, DEFAULT_CONFIG_FILE};
use crate::controller::events::UiEvent;
use crate::ui::{TodoApp, APP_TITLE};

#[derive(Parser, Debug)]
struct Args {
    /// Flat `key = "value"` settings file.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_filter: String,
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_filter);

    let settings = load_settings(&args.config);
    let hosted = settings.hosted_config()?;
    info!(service_url = %hosted.service_url(), table = hosted.table(), "starting todo client");

    let (cmd_tx, cmd_rx) = mpsc::channel::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    let worker = runtime::launch(hosted, cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(APP_TITLE)
            .with_inner_size([480.0, 640.0])
            .with_min_inner_size([360.0, 420.0]),
        ..Default::default()
    };
    let app_tx = cmd_tx.clone();
    let ui_result = eframe::run_native(
        APP_TITLE,
        options,
        Box::new(move |_cc| Ok(Box::new(TodoApp::new(app_tx, ui_rx)))),
    );

    let _ = cmd_tx.try_send(BackendCommand::Shutdown);
    drop(cmd_tx);
    if worker.join().is_err() {
        warn!("backend worker panicked");
    }

    ui_result.map_err(|err| anyhow!("ui failed: {err}"))
}
