//! Integration tests for the pipeline with a scripted backend.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use artifact_store::fakes::{MemoryArtifactStore, MemoryEvaluationStore};
use artifact_store::{
    ArtifactStore, EvaluationId, EvaluationStore, FsArtifactStore, FsEvaluationStore,
};
use uxcrew_core::fakes::ScriptedBackend;
use uxcrew_core::{
    GenerationError, PipelineConfig, Priority, Screenshot, Stage, Summary, ValidationPolicy,
};
use uxcrew_pipeline::{Pipeline, PipelineState, ProgressObserver, StageError};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

const VISION: &str = r#"```json
{
  "screen_type": "login",
  "components": [
    {"type": "text_input", "text": "Email", "position": "middle", "color": "white", "size": "medium"},
    {"type": "button", "text": "Sign in", "position": "bottom", "color": "blue", "size": "large"}
  ],
  "layout_structure": "single column form",
  "color_scheme": {"primary_colors": ["blue"], "background": "white", "text_colors": ["black"]},
  "typography": {"heading_sizes": "24px", "body_text_size": "14px"},
  "spacing_and_density": {"overall_density": "comfortable", "element_spacing": "16px"},
  "accessibility_observations": ["low contrast placeholder"],
  "notable_patterns": ["floating labels"]
}
```"#;

const HEURISTICS: &str = r#"{
  "violations": [
    {
      "heuristic_id": 1,
      "heuristic_name": "Visibility of system status",
      "severity": "high",
      "issue": "No loading indicator after tapping Sign in",
      "affected_components": ["Sign in button"],
      "improvement_suggestion": "Show a spinner while authenticating"
    }
  ],
  "strengths": [{"heuristic_name": "Aesthetic and minimalist design", "observation": "Clean form"}],
  "overall_score": 7.5
}"#;

const FEEDBACK: &str = r#"```
{
  "feedback_items": [
    {
      "id": 1,
      "title": "Add a loading state to Sign in",
      "priority": "high",
      "why_it_matters": "Users tap repeatedly when nothing happens",
      "what_to_do": ["Disable the button on tap", "Show a spinner"],
      "wireframe_changes": "Spinner inside the button"
    }
  ],
  "quick_wins": [{"change": "Disable button on tap", "impact": "Prevents double submits", "effort": "5 minutes"}],
  "summary": {"total_issues": 1, "high": 1, "medium": 0, "low": 0}
}
```"#;

const WIREFRAME: &str = "Here is the improved design:\n```html\n<!DOCTYPE html>\n<html><head><meta name=\"viewport\" content=\"width=375\"></head><body><div>Sign in</div></body></html>\n```\nLet me know if you need changes.";

fn screenshot() -> Screenshot {
    Screenshot::from_bytes(PNG.to_vec()).expect("png")
}

struct Harness {
    backend: Arc<ScriptedBackend>,
    artifacts: Arc<MemoryArtifactStore>,
    evaluations: Arc<MemoryEvaluationStore>,
    pipeline: Pipeline,
}

fn harness(responses: &[&str], config: PipelineConfig) -> Harness {
    let backend = Arc::new(ScriptedBackend::with_responses(responses.iter().copied()));
    let artifacts = Arc::new(MemoryArtifactStore::new());
    let evaluations = Arc::new(MemoryEvaluationStore::new());
    let pipeline = Pipeline::new(
        backend.clone(),
        artifacts.clone(),
        evaluations.clone(),
        config,
    );
    Harness {
        backend,
        artifacts,
        evaluations,
        pipeline,
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<PipelineState>>);

impl ProgressObserver for Recorder {
    fn on_transition(&self, state: &PipelineState) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(state.clone());
    }
}

/// Test: login screen with one high violation yields a {1,1,0,0} summary
#[tokio::test]
async fn test_login_evaluation_end_to_end() {
    let h = harness(&[VISION, HEURISTICS, FEEDBACK], PipelineConfig::default());

    let record = h.pipeline.run_evaluation(&screenshot()).await.expect("evaluation");

    assert_eq!(record.vision_analysis.screen_type, "login");
    assert_eq!(record.heuristic_evaluation.violations.len(), 1);
    assert_eq!(
        record.feedback_report.summary,
        Summary {
            total_issues: 1,
            high: 1,
            medium: 0,
            low: 0
        }
    );
    assert_eq!(record.feedback_report.feedback_items[0].priority, Priority::High);
    assert_eq!(record.artifacts.len(), 3);

    // One artifact per stage, none for wireframe yet.
    assert_eq!(h.artifacts.count(Stage::Vision), 1);
    assert_eq!(h.artifacts.count(Stage::Heuristics), 1);
    assert_eq!(h.artifacts.count(Stage::Feedback), 1);
    assert_eq!(h.artifacts.count(Stage::Wireframe), 0);
    assert_eq!(h.evaluations.len(), 1);

    let loaded = h.evaluations.load(&record.evaluation_id).await.unwrap();
    assert_eq!(loaded, record);
}

/// Test: only the vision request carries the screenshot, and it goes first
#[tokio::test]
async fn test_requests_thread_prior_outputs() {
    let h = harness(&[VISION, HEURISTICS, FEEDBACK], PipelineConfig::default());
    let record = h.pipeline.run_evaluation(&screenshot()).await.unwrap();

    let requests = h.backend.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].has_binary());
    assert!(!requests[1].has_binary());
    assert!(!requests[2].has_binary());

    let vision_text = serde_json::to_string_pretty(&record.vision_analysis).unwrap();
    let heuristics_text = serde_json::to_string_pretty(&record.heuristic_evaluation).unwrap();
    assert!(requests[1].instructions.contains(&vision_text));
    assert!(requests[2].instructions.contains(&vision_text));
    assert!(requests[2].instructions.contains(&heuristics_text));
}

/// Test: wireframe resumes from the stored report and never sees the image
#[tokio::test]
async fn test_wireframe_embeds_stored_feedback() {
    let h = harness(
        &[VISION, HEURISTICS, FEEDBACK, WIREFRAME],
        PipelineConfig::default(),
    );
    let record = h.pipeline.run_evaluation(&screenshot()).await.unwrap();

    let output = h
        .pipeline
        .run_wireframe(&record.evaluation_id)
        .await
        .expect("wireframe");

    assert_eq!(output.evaluation_id, record.evaluation_id);
    assert!(output.wireframe.html.starts_with("<!DOCTYPE html>"));
    assert!(output.wireframe.html.ends_with("</html>"));

    let request = h.backend.requests().pop().unwrap();
    assert_eq!(request.model, "gemini-3-flash-preview");
    assert!(!request.has_binary());
    let feedback_text = serde_json::to_string_pretty(&record.feedback_report).unwrap();
    assert!(request.instructions.contains(&feedback_text));

    let stored = h.artifacts.get(&output.artifact_id).await.unwrap();
    assert_eq!(stored.stage, Stage::Wireframe);
    assert_eq!(stored.raw, WIREFRAME);
}

/// Test: unknown evaluation id fails before any generation call
#[tokio::test]
async fn test_unknown_evaluation_is_not_found() {
    let h = harness(&[WIREFRAME], PipelineConfig::default());
    let id = EvaluationId::parse("eval_20260101_000000_deadbeef").unwrap();

    let failure = h.pipeline.run_wireframe(&id).await.unwrap_err();

    assert_eq!(failure.stage, Stage::Wireframe);
    assert!(failure.error.is_not_found());
    assert_eq!(h.backend.call_count(), 0);
    assert!(h.artifacts.all().is_empty());
}

/// Test: N invocations of a stage leave N artifacts
#[tokio::test]
async fn test_repeated_runs_keep_every_artifact() {
    let mut responses = Vec::new();
    for _ in 0..3 {
        responses.extend([VISION, HEURISTICS, FEEDBACK]);
    }
    let h = harness(&responses, PipelineConfig::default());

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(h.pipeline.run_evaluation(&screenshot()).await.unwrap().evaluation_id);
    }

    for stage in [Stage::Vision, Stage::Heuristics, Stage::Feedback] {
        assert_eq!(h.artifacts.count(stage), 3, "{stage}");
        assert_eq!(h.artifacts.list(stage).await.unwrap().len(), 3, "{stage}");
    }
    assert_eq!(h.evaluations.len(), 3);
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}

/// Test: malformed heuristics output is persisted, then the run fails
#[tokio::test]
async fn test_malformed_stage_output_stops_run() {
    let h = harness(
        &[VISION, "Sorry, I can't evaluate this screen.", FEEDBACK],
        PipelineConfig::default(),
    );
    let recorder = Arc::new(Recorder::default());
    let pipeline = h.pipeline.with_observer(recorder.clone());

    let failure = pipeline.run_evaluation(&screenshot()).await.unwrap_err();

    assert_eq!(failure.stage, Stage::Heuristics);
    let artifact_id = failure.error.artifact_id().cloned().expect("artifact id");
    let stored = h.artifacts.get(&artifact_id).await.unwrap();
    assert!(stored.is_malformed());
    assert_eq!(stored.raw, "Sorry, I can't evaluate this screen.");

    // The feedback stage never ran.
    assert_eq!(h.backend.call_count(), 2);
    assert_eq!(h.backend.remaining(), 1);
    assert!(h.evaluations.is_empty());

    let states = recorder.0.lock().unwrap().clone();
    assert_eq!(states[0], PipelineState::Uploaded);
    assert_eq!(states[1], PipelineState::VisionAnalyzed);
    assert!(matches!(
        states[2],
        PipelineState::Failed { stage: Stage::Heuristics, .. }
    ));
    assert!(failure.to_string().starts_with("Failed(heuristics, unparseable"));
}

/// Test: backend failure surfaces verbatim and writes no artifact
#[tokio::test]
async fn test_backend_failure_writes_nothing() {
    let h = harness(&[VISION], PipelineConfig::default());
    h.backend
        .push_error(GenerationError::Quota("per-minute limit".into()));

    let failure = h.pipeline.run_evaluation(&screenshot()).await.unwrap_err();

    assert_eq!(failure.stage, Stage::Heuristics);
    assert!(matches!(
        failure.error,
        StageError::Generation(GenerationError::Quota(ref m)) if m == "per-minute limit"
    ));
    assert_eq!(h.artifacts.count(Stage::Vision), 1);
    assert_eq!(h.artifacts.count(Stage::Heuristics), 0);
}

/// Test: a stage that outlives its timeout fails as a generation error
#[tokio::test(start_paused = true)]
async fn test_stage_timeout() {
    let backend = Arc::new(
        ScriptedBackend::with_responses([VISION]).with_delay(Duration::from_secs(300)),
    );
    let artifacts = Arc::new(MemoryArtifactStore::new());
    let config = PipelineConfig {
        stage_timeout: Some(Duration::from_secs(120)),
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(
        backend.clone(),
        artifacts.clone(),
        Arc::new(MemoryEvaluationStore::new()),
        config,
    );

    let failure = pipeline.run_evaluation(&screenshot()).await.unwrap_err();

    assert_eq!(failure.stage, Stage::Vision);
    assert!(matches!(
        failure.error,
        StageError::Generation(GenerationError::Timeout(120))
    ));
    assert!(artifacts.all().is_empty());
}

const INCONSISTENT_FEEDBACK: &str = r#"{
  "feedback_items": [
    {"id": 1, "title": "Add a loading state", "priority": "high"},
    {"id": 1, "title": "Raise placeholder contrast", "priority": "low"}
  ],
  "quick_wins": [],
  "summary": {"total_issues": 5, "high": 2, "medium": 2, "low": 1}
}"#;

/// Test: reconcile policy repairs derived fields and records the issues
#[tokio::test]
async fn test_reconcile_policy_repairs_summary() {
    let h = harness(
        &[VISION, HEURISTICS, INCONSISTENT_FEEDBACK],
        PipelineConfig::default(),
    );
    let record = h.pipeline.run_evaluation(&screenshot()).await.unwrap();

    let report = &record.feedback_report;
    assert!(report.summary_is_consistent());
    assert_eq!(
        report.summary,
        Summary {
            total_issues: 2,
            high: 1,
            medium: 0,
            low: 1
        }
    );
    let ids: Vec<u32> = report.feedback_items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![1, 2]);

    let stored = h.artifacts.get(&record.artifacts[2]).await.unwrap();
    assert!(!stored.is_malformed());
    assert!(stored.issues.iter().any(|i| i.field == "summary.total_issues"));
}

/// Test: warn policy keeps the stated summary but records the issues
#[tokio::test]
async fn test_warn_policy_keeps_payload() {
    let config = PipelineConfig {
        validation: ValidationPolicy::Warn,
        ..PipelineConfig::default()
    };
    let h = harness(&[VISION, HEURISTICS, INCONSISTENT_FEEDBACK], config);
    let record = h.pipeline.run_evaluation(&screenshot()).await.unwrap();

    assert_eq!(record.feedback_report.summary.total_issues, 5);
    let stored = h.artifacts.get(&record.artifacts[2]).await.unwrap();
    assert!(!stored.issues.is_empty());
}

/// Test: enforce policy rejects the payload after persisting it
#[tokio::test]
async fn test_enforce_policy_rejects() {
    let config = PipelineConfig {
        validation: ValidationPolicy::Enforce,
        ..PipelineConfig::default()
    };
    let h = harness(&[VISION, HEURISTICS, INCONSISTENT_FEEDBACK], config);

    let failure = h.pipeline.run_evaluation(&screenshot()).await.unwrap_err();

    assert_eq!(failure.stage, Stage::Feedback);
    let StageError::Rejected { artifact_id, issues, .. } = &failure.error else {
        panic!("expected Rejected, got {:?}", failure.error);
    };
    assert!(!issues.is_empty());
    let stored = h.artifacts.get(artifact_id).await.unwrap();
    assert!(stored.is_malformed());
    assert_eq!(stored.issues, *issues);
    assert!(h.evaluations.is_empty());
}

/// Test: an invented heuristic id is recorded as an issue, not a malformed stage
#[tokio::test]
async fn test_out_of_range_heuristic_id_is_flagged() {
    let heuristics = HEURISTICS.replace("\"heuristic_id\": 1", "\"heuristic_id\": 300");
    let h = harness(
        &[VISION, heuristics.as_str(), FEEDBACK],
        PipelineConfig::default(),
    );

    let record = h.pipeline.run_evaluation(&screenshot()).await.expect("evaluation");

    assert_eq!(record.heuristic_evaluation.violations[0].heuristic_id, 300);
    let stored = h.artifacts.get(&record.artifacts[1]).await.unwrap();
    assert!(!stored.is_malformed());
    assert_eq!(stored.issues.len(), 1);
    assert_eq!(stored.issues[0].field, "violations[0].heuristic_id");
}

/// Test: enforce policy keeps a usable markup fragment and records advisories
#[tokio::test]
async fn test_enforce_policy_accepts_wireframe_fragment() {
    let config = PipelineConfig {
        validation: ValidationPolicy::Enforce,
        ..PipelineConfig::default()
    };
    let fragment = "```html\n<div style=\"width:375px\">Sign in</div>\n```";
    let h = harness(&[VISION, HEURISTICS, FEEDBACK, fragment], config);

    let run = h.pipeline.run_full(&screenshot()).await.expect("full run");

    assert_eq!(run.wireframe.wireframe.as_str(), "<div style=\"width:375px\">Sign in</div>");
    let stored = h.artifacts.get(&run.wireframe.artifact_id).await.unwrap();
    assert!(!stored.is_malformed());
    assert_eq!(stored.issues.len(), 1);
    assert!(stored.issues[0].message.contains("complete HTML"));
}

/// Test: full run on the filesystem stores leaves four artifacts and an html file
#[tokio::test]
async fn test_full_run_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(ScriptedBackend::with_responses([
        VISION, HEURISTICS, FEEDBACK, WIREFRAME,
    ]));
    let artifacts = Arc::new(FsArtifactStore::new(dir.path().join("data/outputs")).unwrap());
    let evaluations = Arc::new(FsEvaluationStore::new(dir.path().join("outputs")).unwrap());
    let pipeline = Pipeline::new(
        backend,
        artifacts.clone(),
        evaluations.clone(),
        PipelineConfig::default(),
    );

    let run = pipeline.run_full(&screenshot()).await.expect("full run");

    for stage in Stage::ALL {
        assert_eq!(artifacts.list(stage).await.unwrap().len(), 1, "{stage}");
    }
    assert!(artifacts.markup_path(&run.wireframe.artifact_id).exists());
    assert!(evaluations.record_path(&run.evaluation.evaluation_id).exists());
    assert_eq!(run.wireframe.evaluation_id, run.evaluation.evaluation_id);

    // Wireframe can be regenerated later from the stored record alone.
    let backend = Arc::new(ScriptedBackend::with_responses([WIREFRAME]));
    let resumed = Pipeline::new(
        backend.clone(),
        artifacts.clone(),
        evaluations,
        PipelineConfig::default(),
    )
    .run_wireframe(&run.evaluation.evaluation_id)
    .await
    .unwrap();
    assert_eq!(resumed.wireframe, run.wireframe.wireframe);
    assert_eq!(backend.call_count(), 1);
    assert_eq!(artifacts.list(Stage::Wireframe).await.unwrap().len(), 2);
}
