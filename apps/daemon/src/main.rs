//! inkviewd: e-ink display sync daemon.
//!
//! Loads the device configuration, opens the panel driver, and runs the
//! sync scheduler until SIGINT/SIGTERM. Intended to run under a process
//! supervisor that restarts it on crash.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

use inkview_api::ApiClient;
use inkview_core::config::DeviceConfig;
use inkview_core::sync::{Diagnostics, Scheduler};
use inkview_panel::PanelDriver;

const DEFAULT_CONFIG_PATH: &str = "/etc/inkview/config.json";

fn config_path() -> PathBuf {
    std::env::var_os("INKVIEW_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(feature = "waveshare")]
fn build_panel(config: &DeviceConfig) -> Result<Box<dyn PanelDriver>> {
    use inkview_core::config::DisplayMode;
    use inkview_panel::PanelDepth;

    let depth = match config.display_mode {
        DisplayMode::Mono => PanelDepth::Mono1,
        DisplayMode::Gray4 => PanelDepth::Gray4,
    };
    let panel = inkview_panel::Epd7in5Panel::open(depth).context("opening EPD 7.5\" panel")?;
    Ok(Box::new(panel))
}

#[cfg(not(feature = "waveshare"))]
fn build_panel(config: &DeviceConfig) -> Result<Box<dyn PanelDriver>> {
    use inkview_core::config::DisplayMode;
    use inkview_panel::{PanelCapabilities, PanelDepth, SimPanel};

    let depth = match config.display_mode {
        DisplayMode::Mono => PanelDepth::Mono1,
        DisplayMode::Gray4 => PanelDepth::Gray4,
    };
    let caps = PanelCapabilities {
        width: 800,
        height: 480,
        depth,
        supports_partial: false,
    };
    Ok(Box::new(SimPanel::new(
        caps,
        PathBuf::from(&config.frame_output_path),
    )))
}

/// Flip the shutdown channel on SIGINT or SIGTERM.
async fn watch_signals(shutdown: watch::Sender<bool>) {
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(stream) => stream,
        Err(err) => {
            warn!("Failed to install SIGINT handler: {}", err);
            return;
        }
    };
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            warn!("Failed to install SIGTERM handler: {}", err);
            return;
        }
    };

    tokio::select! {
        _ = sigint.recv() => info!("SIGINT received"),
        _ = sigterm.recv() => info!("SIGTERM received"),
    }
    let _ = shutdown.send(true);
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let path = config_path();
    let config = DeviceConfig::load(&path)
        .with_context(|| format!("loading config from {}", path.display()))?;
    info!(
        "inkviewd starting (view {:?}, mode {:?}, poll {}s)",
        config.view_type, config.display_mode, config.poll_interval_secs
    );

    let client = ApiClient::new(&config.api_url);
    let panel = build_panel(&config)?;
    let diagnostics = Diagnostics::new();
    let config = Arc::new(config);
    let scheduler = Scheduler::new(Arc::clone(&config), client, panel, diagnostics.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(watch_signals(shutdown_tx));

    scheduler.run(shutdown_rx).await;

    let state = diagnostics.snapshot();
    info!(
        "inkviewd stopped after {} cycles (last success: {})",
        state.cycles,
        state
            .last_success_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "never".to_string())
    );
    Ok(())
}
