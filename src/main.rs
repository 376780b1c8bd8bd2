mod app;
mod config;
mod error;
mod upload;
mod utils;


use app::SummarizerApp;
use clap::Parser;
use config::{load_settings, Args};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("failed to build runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let app = match SummarizerApp::new(&settings, runtime.handle().clone()) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([640.0, 720.0])
            .with_min_inner_size([480.0, 560.0]),
        ..Default::default()
    };

    let result = eframe::run_native(
        "Video Summarizer",
        options,
        Box::new(move |_cc| Box::new(app)),
    );

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("ui error: {e}");
            ExitCode::FAILURE
        }
    }
}
