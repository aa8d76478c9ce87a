//! BLAST Annotation Viewer
//!
//! Desktop viewer for protein annotation results: BLAST hits, eggNOG
//! annotations, InterPro domains and GO terms.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod app;
mod config;
mod error;
mod overlay;
mod results;
mod style;

use eframe::egui;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::results::OntologyDefinitions;

fn main() -> eframe::Result<()> {
    // BLASTVIEWER_LOG sets the level unless RUST_LOG is present
    let log_level = std::env::var("BLASTVIEWER_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    let (config, config_error) = Config::load();
    let ontology = OntologyDefinitions::load_or_empty(config.go_obo_path.as_deref());
    let initial_file = std::env::args().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 850.0])
            .with_min_inner_size([800.0, 500.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "BLAST Annotation Viewer",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::BlastViewerApp::new(
                cc,
                config,
                ontology,
                config_error,
                initial_file,
            )))
        }),
    )
}
