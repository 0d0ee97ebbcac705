//! bnp-api library - BirdNET-Pi detection analytics service
//!
//! Browses, aggregates and curates the detection log written by the
//! BirdNET-Pi classifier, and resolves representative species images.

use axum::Router;
use bnp_common::config::SettingsHandle;
use bnp_common::process::{CommandRunner, TokioCommandRunner};
use bnp_common::time::{Clock, SystemClock};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod analytics;
pub mod api;
pub mod artifacts;
pub mod error;
pub mod images;
pub mod labels;
pub mod pagination;
pub mod scripts;
pub mod species_lists;

use images::ImageResolver;
use labels::ModelCatalog;
use scripts::HelperScripts;
use species_lists::SpeciesLists;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Detection store pool
    pub db: SqlitePool,
    /// Station settings from `birdnet.conf`
    pub settings: SettingsHandle,
    /// BirdNET-Pi installation root
    pub base_path: PathBuf,
    pub clock: Arc<dyn Clock>,
    pub species_lists: Arc<SpeciesLists>,
    pub images: Arc<ImageResolver>,
    /// Installed models and label translations under `<base>/model`
    pub models: ModelCatalog,
    pub scripts: HelperScripts,
}

impl AppState {
    /// Create application state with the system clock and process runner
    pub fn new(
        db: SqlitePool,
        settings: SettingsHandle,
        base_path: impl Into<PathBuf>,
        images: ImageResolver,
    ) -> Self {
        let base_path = base_path.into();
        Self {
            db,
            settings,
            clock: Arc::new(SystemClock),
            species_lists: Arc::new(SpeciesLists::new(base_path.join("scripts"))),
            images: Arc::new(images),
            models: ModelCatalog::new(base_path.join("model")),
            scripts: HelperScripts::new(base_path.clone(), Arc::new(TokioCommandRunner)),
            base_path,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_command_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.scripts = HelperScripts::new(self.base_path.clone(), runner);
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::health_routes())
        .merge(api::detection_routes())
        .merge(api::species_routes())
        .merge(api::species_list_routes())
        .merge(api::image_routes())
        .merge(api::label_routes())
        .merge(api::ebird_routes())
        .merge(api::media_routes())
        .merge(api::settings_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
