pub mod app;
pub mod audio;
pub mod catalog;
pub mod models;
pub mod presentation;
pub mod settings;
mod shell;
pub mod timer;
mod utils;

use std::path::PathBuf;

use anyhow::Context;
use audio::cues_from_settings;
use catalog::Catalog;
use settings::SettingsStore;

pub use app::{SelectError, WorkoutApp};
pub use models::{PlanError, SessionPlan};
pub use timer::{Phase, SessionController, SessionRunState, SessionSnapshot};

const DEFAULT_SETTINGS_FILE: &str = "runwalk-settings.json";

pub fn run() -> anyhow::Result<()> {
    utils::logging::init();

    log::info!("runwalk starting up...");

    let settings_path = std::env::var_os("RUNWALK_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    let settings = SettingsStore::new(settings_path)?;
    log::info!("Using settings from {}", settings.path().display());

    let catalog = Catalog::load(settings.catalog_path().as_deref())?;
    let audio = settings.audio();
    let app = WorkoutApp::new(
        catalog,
        settings.default_cadence(),
        Box::new(move || cues_from_settings(&audio)),
    );

    // One thread: both session timers and the shell share a single event loop.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build the event loop")?;

    runtime.block_on(shell::run_shell(app, &settings))
}
