//! Flat-file evaluation records: `<root>/{evaluation_id}_evaluation.json`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::fs::write_atomic;
use crate::storage_traits::{EvaluationId, EvaluationRecord, EvaluationStore};

#[derive(Debug, Clone)]
pub struct FsEvaluationStore {
    root: PathBuf,
}

impl FsEvaluationStore {
    pub fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn record_path(&self, id: &EvaluationId) -> PathBuf {
        self.root.join(file_name(id))
    }
}

fn file_name(id: &EvaluationId) -> String {
    format!("{id}_evaluation.json")
}

#[async_trait]
impl EvaluationStore for FsEvaluationStore {
    async fn save(&self, record: &EvaluationRecord) -> StoreResult<()> {
        let body = serde_json::to_vec_pretty(record)?;
        let root = self.root.clone();
        let name = file_name(&record.evaluation_id);
        tokio::task::spawn_blocking(move || write_atomic(&root, &name, &body, true)).await??;
        Ok(())
    }

    async fn load(&self, id: &EvaluationId) -> StoreResult<EvaluationRecord> {
        let bytes = tokio::fs::read(self.record_path(id)).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::NotFound {
                    kind: "evaluation",
                    id: id.to_string(),
                }
            } else {
                StoreError::Io(e)
            }
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
