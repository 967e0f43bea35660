//! HTTP surface: form page, run submission, report downloads.

mod form;
mod handlers;
pub mod pages;

pub use form::{parse_preset_id, resolve_request, IndexQuery, RunForm};

use crate::orchestrator::AnalysisService;
use crate::presets::PresetRepository;
use crate::runs::RunRegistry;
use crate::settings::DownloadSettings;
use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AnalysisService>,
    pub presets: Arc<dyn PresetRepository>,
    registry: Arc<Mutex<RunRegistry>>,
    pub default_extra_instructions: Arc<str>,
}

impl AppState {
    pub fn new(
        service: Arc<AnalysisService>,
        presets: Arc<dyn PresetRepository>,
        downloads: &DownloadSettings,
        default_extra_instructions: &str,
    ) -> Self {
        Self {
            service,
            presets,
            registry: Arc::new(Mutex::new(RunRegistry::new(
                downloads.ttl,
                downloads.max_entries,
            ))),
            default_extra_instructions: Arc::from(default_extra_instructions),
        }
    }

    pub fn register_run(&self, run_id: String, run_dir: PathBuf) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(run_id, run_dir);
    }

    pub fn run_dir(&self, run_id: &str) -> Option<PathBuf> {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(run_id)
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index_handler))
        .route("/healthz", get(handlers::healthz_handler))
        .route("/run", post(handlers::run_handler))
        .route("/api/run", post(handlers::api_run_handler))
        .route(
            "/download/:run_id/:filename",
            get(handlers::download_handler),
        )
        .with_state(state)
}
