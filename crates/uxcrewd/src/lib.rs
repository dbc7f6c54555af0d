//! uxcrewd: HTTP front end for the uxcrew pipeline
//!
//! ## Routes
//!
//! - `POST /upload`: store a screenshot, create a job
//! - `GET /jobs/:job_id`: job status
//! - `POST /jobs/:job_id/evaluate`: evaluate an uploaded screenshot in the background
//! - `POST /evaluate-ui/`: evaluate a screenshot and wait for the result
//! - `POST /generate-wireframe/?evaluation_id=...`: wireframe for a stored evaluation
//! - `GET /healthz`

pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod jobs;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

use artifact_store::JobStore;
use uxcrew_pipeline::Pipeline;

pub use config::DaemonConfig;
pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub jobs: JobStore,
    pub upload_dir: PathBuf,
    pub config: Arc<DaemonConfig>,
}

impl AppState {
    /// Create the upload directory and assemble the state.
    pub fn new(pipeline: Pipeline, upload_dir: PathBuf, config: DaemonConfig) -> std::io::Result<Self> {
        std::fs::create_dir_all(&upload_dir)?;
        Ok(Self {
            pipeline,
            jobs: JobStore::new(),
            upload_dir,
            config: Arc::new(config),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/upload", post(handlers::upload))
        .route("/jobs/:job_id", get(handlers::job_status))
        .route("/jobs/:job_id/evaluate", post(handlers::evaluate_job))
        .route("/evaluate-ui/", post(handlers::evaluate_ui))
        .route("/generate-wireframe/", post(handlers::generate_wireframe))
        .layer(from_fn_with_state(state.clone(), cors::cors_middleware))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .with_state(state)
}
