//! IRP Dashboard - Retirement pension return & fee comparison
//!
//! Loads IRP return and fee sheets, cleans and joins them, and displays
//! interactive comparison charts.

mod charts;
mod config;
mod data;
mod gui;
mod presenter;
mod stats;

use config::AppConfig;
use eframe::egui;
use gui::IrpDashboardApp;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("irp_dashboard=info")),
        )
        .with_target(false)
        .init();

    let config_path = AppConfig::default_path();
    let config = AppConfig::load(&config_path).unwrap_or_else(|e| {
        tracing::warn!("{}; using default settings", e);
        AppConfig::default()
    });
    tracing::info!(
        returns = %config.returns_path.display(),
        fees = %config.fee_path.display(),
        "starting IRP dashboard"
    );

    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height])
            .with_min_inner_size([1000.0, 700.0])
            .with_title("IRP 수익률 대시보드"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "IRP Dashboard",
        options,
        Box::new(|cc| Ok(Box::new(IrpDashboardApp::new(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("failed to start UI: {}", e))
}
