// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
mod gui;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use eframe::egui;
use log::warn;

use scalar_monitor::{AcquisitionController, MonitorConfig, SensorRegistry};

#[derive(Parser, Debug)]
#[command(version, about = "Live plot of logged pressure / temperature values")]
struct Cli {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Source registry, overrides the configured one
    #[arg(long)]
    servers: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };
    if let Some(servers) = cli.servers {
        config.servers = servers;
    }

    // Without a registry only "Load LOG" is usable.
    let registry = SensorRegistry::load(&config.servers).unwrap_or_else(|e| {
        warn!("{e}; no named sources available");
        SensorRegistry::default()
    });
    let controller = AcquisitionController::new(&config, registry, gui::PlotSurface::default())?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 500.0])
            .with_title("Display Data"),
        ..Default::default()
    };
    eframe::run_native(
        "scalar-monitor",
        options,
        Box::new(move |_cc| Box::new(gui::MonitorApp::new(controller, &config))),
    )
    .map_err(|e| anyhow!("viewer exited with error: {e}"))
}
