use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::debug;

use uxcrew_core::{ResponseFormat, Stage};

use crate::error::{StoreError, StoreResult};
use crate::storage_traits::{ArtifactId, ArtifactOutcome, ArtifactStore, NewArtifact, StageArtifact};

/// Give up after this many same-millisecond collisions.
const MAX_SEQUENCE: u32 = 10_000;

/// Write `data` to `dir/name` via a synced temp file in the same directory.
///
/// With `clobber == false` an existing target is left alone and `Ok(false)`
/// is returned.
pub(crate) fn write_atomic(dir: &Path, name: &str, data: &[u8], clobber: bool) -> std::io::Result<bool> {
    let target = dir.join(name);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    let persisted = if clobber {
        tmp.persist(&target).map(|_| ())
    } else {
        tmp.persist_noclobber(&target).map(|_| ())
    };
    match persisted {
        Ok(()) => Ok(true),
        Err(e) if !clobber && e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error),
    }
}

/// Flat-file artifact store.
///
/// Layout: `<root>/{artifact_id}.json`, plus `<root>/{artifact_id}.html` for
/// parsed wireframes. Files are never overwritten.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self, id: &ArtifactId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    /// Companion markup file, present only for parsed wireframes.
    pub fn markup_path(&self, id: &ArtifactId) -> PathBuf {
        self.root.join(format!("{id}.{}", ResponseFormat::Html.extension()))
    }

    fn put_blocking(root: &Path, new: NewArtifact, created_at: DateTime<Utc>) -> StoreResult<ArtifactId> {
        let markup = match (&new.outcome, new.stage.response_format()) {
            (ArtifactOutcome::Parsed { payload: Value::String(html) }, ResponseFormat::Html) => {
                Some(html.clone())
            }
            _ => None,
        };

        for seq in 1..=MAX_SEQUENCE {
            let id = ArtifactId::new(new.stage, created_at, seq);
            let artifact = StageArtifact::seal(new.clone(), id.clone(), created_at);
            let body = serde_json::to_vec_pretty(&artifact)?;
            if !write_atomic(root, &format!("{id}.json"), &body, false)? {
                debug!(artifact_id = %id, "artifact id taken, retrying with next sequence");
                continue;
            }
            if let Some(html) = &markup {
                write_atomic(root, &format!("{id}.html"), html.as_bytes(), true)?;
            }
            return Ok(id);
        }
        Err(StoreError::Conflict(format!(
            "no free artifact id for {} at {created_at}",
            new.stage
        )))
    }

    fn list_blocking(root: &Path, stage: Stage) -> StoreResult<Vec<ArtifactId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(id) = ArtifactId::parse(stem) {
                if id.stage() == Some(stage) {
                    ids.push(id);
                }
            }
        }
        ids.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Ok(ids)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, artifact: NewArtifact) -> StoreResult<ArtifactId> {
        let root = self.root.clone();
        let created_at = Utc::now();
        tokio::task::spawn_blocking(move || Self::put_blocking(&root, artifact, created_at)).await?
    }

    async fn get(&self, id: &ArtifactId) -> StoreResult<StageArtifact> {
        let path = self.artifact_path(id);
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::NotFound {
                    kind: "artifact",
                    id: id.to_string(),
                }
            } else {
                StoreError::Io(e)
            }
        })?;
        let artifact: StageArtifact = serde_json::from_slice(&bytes)?;
        artifact.verify()?;
        Ok(artifact)
    }

    async fn list(&self, stage: Stage) -> StoreResult<Vec<ArtifactId>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || Self::list_blocking(&root, stage)).await?
    }
}
