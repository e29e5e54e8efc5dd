mod app;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, anyhow};
use clap::Parser;
use gfascope::config::ViewerConfig;
use gfascope::context::AppContext;
use gfascope::store::{FsStore, Store};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// GFA 1 file to open.
    gfa: PathBuf,
    /// Initial center, as a segment name or numeric node id.
    #[arg(long)]
    center: Option<String>,
    #[arg(long)]
    radius: Option<usize>,
    /// Genome to index once the file is loaded.
    #[arg(long)]
    genome: Option<String>,
    /// Where indices and bookmarks are kept; defaults to the platform data
    /// directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gfascope=info")),
        )
        .init();

    let config = match FsStore::config_dir() {
        Ok(dir) => ViewerConfig::load_or_default(&Store::new(Arc::new(dir))),
        Err(error) => {
            tracing::warn!(%error, "using default viewer config");
            ViewerConfig::default()
        }
    };
    let data = match args.data_dir {
        Some(dir) => FsStore::new(dir),
        None => FsStore::data_dir().context("failed to resolve the data directory")?,
    };
    let context = AppContext::new(config, Arc::new(data));

    let start = app::StartOptions {
        path: args.gfa,
        center: args.center,
        radius: args.radius,
        genome: args.genome,
    };
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 860.0]),
        ..Default::default()
    };

    eframe::run_native(
        "gfascope",
        options,
        Box::new(move |cc| Ok(Box::new(app::GfaScopeApp::new(cc, context, start)))),
    )
    .map_err(|error| anyhow!("viewer failed: {error}"))
}
