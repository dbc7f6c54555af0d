//! In-memory fakes for storage traits (testing only)
//!
//! `MemoryArtifactStore` and `MemoryEvaluationStore` satisfy the trait
//! contracts without touching disk.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use uxcrew_core::Stage;

use crate::error::{StoreError, StoreResult};
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryArtifactStore
// ---------------------------------------------------------------------------

/// Artifacts kept in insertion order.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: Mutex<Vec<StageArtifact>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored artifact, oldest first.
    pub fn all(&self) -> Vec<StageArtifact> {
        self.artifacts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, stage: Stage) -> usize {
        self.artifacts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|a| a.stage == stage)
            .count()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, artifact: NewArtifact) -> StoreResult<ArtifactId> {
        let created_at = Utc::now();
        let mut store = self.artifacts.lock().unwrap_or_else(PoisonError::into_inner);
        let mut seq = 1;
        let id = loop {
            let candidate = ArtifactId::new(artifact.stage, created_at, seq);
            if !store.iter().any(|a| a.id == candidate) {
                break candidate;
            }
            seq += 1;
        };
        store.push(StageArtifact::seal(artifact, id.clone(), created_at));
        Ok(id)
    }

    async fn get(&self, id: &ArtifactId) -> StoreResult<StageArtifact> {
        let store = self.artifacts.lock().unwrap_or_else(PoisonError::into_inner);
        let artifact = store
            .iter()
            .find(|a| &a.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "artifact",
                id: id.to_string(),
            })?;
        artifact.verify()?;
        Ok(artifact)
    }

    async fn list(&self, stage: Stage) -> StoreResult<Vec<ArtifactId>> {
        let store = self.artifacts.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(store
            .iter()
            .filter(|a| a.stage == stage)
            .map(|a| a.id.clone())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MemoryEvaluationStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryEvaluationStore {
    records: Mutex<HashMap<EvaluationId, EvaluationRecord>>,
}

impl MemoryEvaluationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EvaluationStore for MemoryEvaluationStore {
    async fn save(&self, record: &EvaluationRecord) -> StoreResult<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.evaluation_id.clone(), record.clone());
        Ok(())
    }

    async fn load(&self, id: &EvaluationId) -> StoreResult<EvaluationRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "evaluation",
                id: id.to_string(),
            })
    }
}
