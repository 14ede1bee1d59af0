use std::path::PathBuf;

use clap::Parser;
use eframe::egui;

use kg_viewer::gui::backend::Backend;
use kg_viewer::gui::frontend::GraphApp;
use kg_viewer::persistence::settings::SettingsStore;

#[derive(Parser, Debug)]
#[command(name = "KG-Viewer", version, about = "Browse documents, chunks and entities stored in Neo4j")]
struct Args {
    /// Base URL of the ingestion backend that serves /sources_list
    #[arg(long)]
    backend_url: Option<String>,
    /// Directory holding settings.json (defaults to the OS config dir)
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let store = match args.config_dir {
        Some(dir) => SettingsStore::at(dir),
        None => SettingsStore::default(),
    };
    let mut settings = store.load();
    if let Some(url) = args.backend_url {
        settings.backend_url = url;
    }
    log::info!("settings directory: {}", store.dir().display());

    let backend = Backend::new(Some(settings.query_log_dir()))?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 710.0])
            // Provide sensible bounds so the UI stays usable on small screens
            .with_min_inner_size([700.0, 420.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "KG-Viewer",
        options,
        Box::new(move |_cc| Ok(Box::new(GraphApp::new(store, settings, backend)) as Box<dyn eframe::App>)),
    )
    .map_err(|e| anyhow::anyhow!("eframe failed: {e}"))
}
