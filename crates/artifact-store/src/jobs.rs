//! In-memory job tracking for uploads that are evaluated later.
//!
//! Every read and write goes through one `RwLock`, so a job's status
//! transitions are atomic: two concurrent `start` calls cannot both win.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Uploaded,
    Running,
    Completed,
    Failed,
}

/// Job record as reported to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub status: JobStatus,
    /// Fraction of the pipeline completed, 0.0 to 1.0.
    pub progress: f32,
    /// Stage currently running or last reached.
    pub step: Option<String>,
    pub result: Option<Value>,
    #[serde(skip)]
    pub screenshot_path: PathBuf,
}

impl JobRecord {
    fn uploaded(screenshot_path: PathBuf) -> Self {
        Self {
            status: JobStatus::Uploaded,
            progress: 0.0,
            step: None,
            result: None,
            screenshot_path,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<Uuid, JobRecord>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an uploaded screenshot under a caller-chosen id.
    pub async fn insert(&self, id: Uuid, screenshot_path: PathBuf) -> StoreResult<()> {
        let mut guard = self.jobs.write().await;
        if guard.contains_key(&id) {
            return Err(StoreError::Conflict(format!("job {id} already exists")));
        }
        guard.insert(id, JobRecord::uploaded(screenshot_path));
        Ok(())
    }

    pub async fn get(&self, id: &Uuid) -> Option<JobRecord> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Move a job to `Running`. Fails if the job is unknown or already running.
    pub async fn start(&self, id: &Uuid) -> StoreResult<JobRecord> {
        let mut guard = self.jobs.write().await;
        let job = guard.get_mut(id).ok_or_else(|| StoreError::NotFound {
            kind: "job",
            id: id.to_string(),
        })?;
        if job.status == JobStatus::Running {
            return Err(StoreError::Conflict(format!("job {id} is already running")));
        }
        job.status = JobStatus::Running;
        job.progress = 0.0;
        job.step = None;
        job.result = None;
        Ok(job.clone())
    }

    pub async fn set_progress(&self, id: &Uuid, step: &str, progress: f32) {
        if let Some(job) = self.jobs.write().await.get_mut(id) {
            job.step = Some(step.to_string());
            job.progress = progress.clamp(0.0, 1.0);
        }
    }

    pub async fn complete(&self, id: &Uuid, result: Value) {
        if let Some(job) = self.jobs.write().await.get_mut(id) {
            job.status = JobStatus::Completed;
            job.progress = 1.0;
            job.result = Some(result);
        }
    }

    pub async fn fail(&self, id: &Uuid, step: &str, error: &str) {
        if let Some(job) = self.jobs.write().await.get_mut(id) {
            job.status = JobStatus::Failed;
            job.step = Some(step.to_string());
            job.result = Some(serde_json::json!({ "error": error }));
        }
    }
}
