//! Pipeline configuration read from the environment.
//!
//! Every setting has a default except the backend credential, which lives in
//! the backend crate. Values that are present but unparseable fail fast with
//! [`ConfigError::Invalid`] instead of silently falling back.

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::{ConfigError, Stage, ValidationPolicy};

pub const DEFAULT_OUTPUT_DIR: &str = "data/outputs";
pub const DEFAULT_EVALUATION_DIR: &str = "outputs";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 120;

const VISION_MODEL: &str = "gemini-2.5-flash";
const SYNTHESIS_MODEL: &str = "gemini-3-flash-preview";

/// Stage → backend model identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTable {
    models: BTreeMap<Stage, String>,
}

impl Default for ModelTable {
    fn default() -> Self {
        let models = Stage::ALL
            .into_iter()
            .map(|stage| {
                let model = match stage {
                    Stage::Vision | Stage::Heuristics => VISION_MODEL,
                    Stage::Feedback | Stage::Wireframe => SYNTHESIS_MODEL,
                };
                (stage, model.to_string())
            })
            .collect();
        Self { models }
    }
}

impl ModelTable {
    pub fn get(&self, stage: Stage) -> &str {
        self.models.get(&stage).map(String::as_str).unwrap_or(VISION_MODEL)
    }

    pub fn set(&mut self, stage: Stage, model: impl Into<String>) {
        self.models.insert(stage, model.into());
    }

    /// Apply `UXCREW_MODELS="vision=...,wireframe=..."`, then the per-stage
    /// `UXCREW_MODEL_<STAGE>` variables, on top of the defaults.
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut table = Self::default();
        for (key, model) in env_map(lookup, "UXCREW_MODELS") {
            let stage: Stage = key.parse().map_err(|_| ConfigError::Invalid {
                key: "UXCREW_MODELS".to_string(),
                value: key.clone(),
            })?;
            table.set(stage, model);
        }
        for stage in Stage::ALL {
            let key = format!("UXCREW_MODEL_{}", stage.as_str().to_ascii_uppercase());
            if let Some(model) = non_empty(lookup, &key) {
                table.set(stage, model);
            }
        }
        Ok(table)
    }
}

/// Settings shared by the CLI and the daemon.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Stage artifacts and markdown exports.
    pub output_dir: PathBuf,
    /// Combined evaluation records used to resume wireframe generation.
    pub evaluation_dir: PathBuf,
    pub upload_dir: PathBuf,
    /// `None` disables the per-stage timeout.
    pub stage_timeout: Option<Duration>,
    pub validation: ValidationPolicy,
    pub models: ModelTable,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            evaluation_dir: PathBuf::from(DEFAULT_EVALUATION_DIR),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            stage_timeout: Some(Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS)),
            validation: ValidationPolicy::default(),
            models: ModelTable::default(),
        }
    }
}

impl PipelineConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let path = |key: &str, default: PathBuf| non_empty(lookup, key).map(PathBuf::from).unwrap_or(default);

        let stage_timeout = match non_empty(lookup, "UXCREW_STAGE_TIMEOUT_SECS") {
            None => defaults.stage_timeout,
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) => None,
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(_) => {
                    return Err(ConfigError::Invalid {
                        key: "UXCREW_STAGE_TIMEOUT_SECS".to_string(),
                        value: raw,
                    })
                }
            },
        };

        let validation = match non_empty(lookup, "UXCREW_VALIDATION") {
            None => defaults.validation,
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "UXCREW_VALIDATION".to_string(),
                value: raw,
            })?,
        };

        Ok(Self {
            output_dir: path("UXCREW_OUTPUT_DIR", defaults.output_dir),
            evaluation_dir: path("UXCREW_EVALUATION_DIR", defaults.evaluation_dir),
            upload_dir: path("UXCREW_UPLOAD_DIR", defaults.upload_dir),
            stage_timeout,
            validation,
            models: ModelTable::from_lookup(lookup)?,
        })
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_map<F>(lookup: &F, key: &str) -> Vec<(String, String)>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .unwrap_or_default()
        .split(',')
        .filter_map(|item| {
            let (k, v) = item.split_once('=')?;
            let (k, v) = (k.trim(), v.trim());
            if k.is_empty() || v.is_empty() {
                return None;
            }
            Some((k.to_string(), v.to_string()))
        })
        .collect()
}
