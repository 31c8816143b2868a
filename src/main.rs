mod app;
mod config;
mod error;
mod export;
mod magnifier;
mod persist;
mod session;

use clap::Parser;
use eframe::egui;

use crate::app::CounterApp;
use crate::config::Settings;

// ── Main ────────────────────────────────────────────────────────────────────

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::parse();

    let title = match settings.image_path.as_ref().and_then(|p| p.file_name()) {
        Some(name) => format!("muggenteller — {}", name.to_string_lossy()),
        None => "muggenteller".to_string(),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title(&title),
        ..Default::default()
    };

    if let Err(e) = eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| Ok(Box::new(CounterApp::new(settings)))),
    ) {
        log::error!("Application error: {e}");
        std::process::exit(1);
    }
}
