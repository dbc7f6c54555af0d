use std::path::PathBuf;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use artifact_store::{EvaluationId, JobRecord};
use uxcrew_core::Screenshot;

use crate::error::ApiError;
use crate::jobs::spawn_evaluation;
use crate::AppState;

/// An uploaded file: original name (if any) and contents.
pub struct Upload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Take the `file` part of a multipart body, or the first part carrying a
/// file name.
pub async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), "invalid_request", e.body_text()))?
    {
        let is_file = field.name() == Some("file") || field.file_name().is_some();
        if !is_file {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(e.status(), "invalid_request", e.body_text()))?;
        return Ok(Upload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }
    Err(ApiError::bad_request("multipart body has no file part"))
}

/// File name safe to join under the upload directory.
pub fn sanitize_file_name(name: Option<&str>, shot: &Screenshot) -> String {
    let base = name
        .and_then(|n| n.rsplit(['/', '\\']).next())
        .unwrap_or_default();
    let clean: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .take(64)
        .collect();
    if clean.trim_matches('.').is_empty() {
        format!("screenshot.{}", shot.format().extension())
    } else {
        clean
    }
}

async fn save_upload(state: &AppState, file_name: String, shot: &Screenshot) -> Result<PathBuf, ApiError> {
    let path = state.upload_dir.join(file_name);
    tokio::fs::write(&path, shot.bytes())
        .await
        .map_err(|e| ApiError::internal(format!("failed to store upload: {e}")))?;
    Ok(path)
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let upload = read_upload(multipart).await?;
    let shot = Screenshot::from_bytes(upload.bytes)?;

    let job_id = Uuid::new_v4();
    let name = format!("{job_id}_{}", sanitize_file_name(upload.file_name.as_deref(), &shot));
    let path = save_upload(&state, name, &shot).await?;
    state.jobs.insert(job_id, path).await?;

    info!(job_id = %job_id, bytes = shot.len(), format = %shot.format(), "screenshot uploaded");
    Ok(Json(json!({ "job_id": job_id })))
}

pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobRecord>, ApiError> {
    state
        .jobs
        .get(&job_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("job not found: {job_id}")))
}

pub async fn evaluate_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    spawn_evaluation(state, job_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "job_id": job_id, "status": "running" })),
    ))
}

pub async fn evaluate_ui(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let upload = read_upload(multipart).await?;
    let shot = Screenshot::from_bytes(upload.bytes)?;
    save_upload(
        &state,
        format!("{}.{}", Uuid::new_v4(), shot.format().extension()),
        &shot,
    )
    .await?;

    let record = state.pipeline.run_evaluation(&shot).await?;
    let evaluation = record.report_text()?;
    Ok(Json(json!({
        "evaluation_id": record.evaluation_id,
        "evaluation": evaluation,
    })))
}

#[derive(Debug, Deserialize)]
pub struct WireframeQuery {
    pub evaluation_id: String,
}

pub async fn generate_wireframe(
    State(state): State<AppState>,
    Query(query): Query<WireframeQuery>,
) -> Result<Json<Value>, ApiError> {
    let id = EvaluationId::parse(&query.evaluation_id)?;
    let output = state.pipeline.run_wireframe(&id).await?;
    Ok(Json(json!({ "wireframe_output": output.wireframe.html })))
}
