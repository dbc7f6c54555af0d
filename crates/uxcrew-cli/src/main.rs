//! uxcrew - screenshot to UX feedback and wireframe
//!
//! ## Commands
//!
//! - `evaluate`: vision, heuristic and feedback stages on a screenshot
//! - `wireframe`: regenerate a wireframe from a stored evaluation
//! - `run`: all four stages in one go
//! - `report`: render a stored feedback report as Markdown
//! - `artifacts`: list or show stored stage artifacts

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use artifact_store::{
    ArtifactId, ArtifactOutcome, ArtifactStore, EvaluationId, EvaluationRecord, FsArtifactStore,
    FsEvaluationStore,
};
use gemini_backend::{GeminiClient, GeminiConfig};
use uxcrew_core::{
    feedback_report_file_name, write_feedback_report_md, FeedbackReport, GenerationBackend,
    LogSettings, PipelineConfig, Screenshot, Stage,
};
use uxcrew_pipeline::{Pipeline, WireframeOutput};

const DEFAULT_SCREENSHOT: &str = "data/screenshots/test_image.png";

#[derive(Parser)]
#[command(name = "uxcrew")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evaluate mobile UI screenshots and generate improved wireframes", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Directory for stage artifacts and Markdown reports
    #[arg(long, global = true, env = "UXCREW_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Directory for evaluation records
    #[arg(long, global = true, env = "UXCREW_EVALUATION_DIR")]
    evaluation_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a screenshot and produce prioritized feedback
    Evaluate {
        /// Screenshot to evaluate (PNG, JPEG, GIF or WebP)
        screenshot: PathBuf,
    },

    /// Generate an improved wireframe for a stored evaluation
    Wireframe {
        /// Evaluation id printed by `evaluate`
        evaluation_id: String,

        /// Also copy the HTML to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run every stage: analysis, evaluation, feedback and wireframe
    Run {
        #[arg(default_value = DEFAULT_SCREENSHOT)]
        screenshot: PathBuf,
    },

    /// Render a stored feedback report as Markdown
    Report {
        /// Feedback artifact id, or `latest`
        #[arg(default_value = "latest")]
        artifact: String,

        /// Write here instead of the output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect stored stage artifacts
    Artifacts {
        #[command(subcommand)]
        action: ArtifactsAction,
    },
}

#[derive(Subcommand)]
enum ArtifactsAction {
    /// List artifact ids for a stage, oldest first
    List {
        /// vision, heuristics, feedback or wireframe
        stage: Stage,
    },

    /// Print one artifact envelope
    Show { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let logging = LogSettings::from_env(cli.json, level).context("Invalid log settings")?;
    uxcrew_core::init_tracing(logging);

    let mut config = PipelineConfig::from_env().context("Invalid uxcrew configuration")?;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(dir) = cli.evaluation_dir {
        config.evaluation_dir = dir;
    }
    let stores = Stores::open(&config)?;

    match cli.command {
        Commands::Evaluate { screenshot } => {
            let pipeline = stores.pipeline(gemini_backend()?, &config);
            cmd_evaluate(&pipeline, &screenshot, &config.output_dir).await
        }
        Commands::Wireframe {
            evaluation_id,
            output,
        } => {
            let pipeline = stores.pipeline(gemini_backend()?, &config);
            cmd_wireframe(&pipeline, &stores, &evaluation_id, output.as_deref()).await
        }
        Commands::Run { screenshot } => {
            let pipeline = stores.pipeline(gemini_backend()?, &config);
            cmd_run(&pipeline, &stores, &screenshot, &config.output_dir).await
        }
        Commands::Report { artifact, output } => {
            let path = cmd_report(&stores, &artifact, output.as_deref(), &config.output_dir).await?;
            println!("Report written to {}", path.display());
            Ok(())
        }
        Commands::Artifacts { action } => match action {
            ArtifactsAction::List { stage } => cmd_artifacts_list(&stores, stage).await,
            ArtifactsAction::Show { id } => cmd_artifacts_show(&stores, &id).await,
        },
    }
}

/// The on-disk stores the commands share.
struct Stores {
    artifacts: Arc<FsArtifactStore>,
    evaluations: Arc<FsEvaluationStore>,
}

impl Stores {
    fn open(config: &PipelineConfig) -> Result<Self> {
        let artifacts = FsArtifactStore::new(&config.output_dir).with_context(|| {
            format!("Failed to open output dir {}", config.output_dir.display())
        })?;
        let evaluations = FsEvaluationStore::new(&config.evaluation_dir).with_context(|| {
            format!(
                "Failed to open evaluation dir {}",
                config.evaluation_dir.display()
            )
        })?;
        Ok(Self {
            artifacts: Arc::new(artifacts),
            evaluations: Arc::new(evaluations),
        })
    }

    fn pipeline(&self, backend: Arc<dyn GenerationBackend>, config: &PipelineConfig) -> Pipeline {
        Pipeline::new(
            backend,
            self.artifacts.clone(),
            self.evaluations.clone(),
            config.clone(),
        )
    }
}

fn gemini_backend() -> Result<Arc<dyn GenerationBackend>> {
    let config = GeminiConfig::from_env().context("Gemini backend is not configured")?;
    let client = GeminiClient::new(config).context("Failed to build Gemini client")?;
    Ok(Arc::new(client))
}

fn load_screenshot(path: &Path) -> Result<Screenshot> {
    Screenshot::load(path).with_context(|| format!("Failed to read screenshot {}", path.display()))
}

fn export_markdown(report: &FeedbackReport, dir: &Path) -> Result<PathBuf> {
    let now = Utc::now();
    let path = dir.join(feedback_report_file_name(now));
    write_feedback_report_md(&path, report, now)?;
    Ok(path)
}

fn print_evaluation(record: &EvaluationRecord) {
    let summary = record.feedback_report.tallied_summary();
    println!("Evaluation: {}", record.evaluation_id);
    println!("Screen:     {}", record.vision_analysis.screen_type);
    println!("Score:      {:.1}/10", record.heuristic_evaluation.overall_score);
    println!(
        "Issues:     {} (high {}, medium {}, low {})",
        summary.total_issues, summary.high, summary.medium, summary.low
    );
    for item in record.feedback_report.items_by_id() {
        println!("  {} {}. {}", item.priority.marker(), item.id, item.title);
    }
}

async fn cmd_evaluate(pipeline: &Pipeline, screenshot: &Path, output_dir: &Path) -> Result<()> {
    let shot = load_screenshot(screenshot)?;
    info!(path = %screenshot.display(), format = %shot.format(), bytes = shot.len(), "Evaluating screenshot");

    let record = pipeline.run_evaluation(&shot).await?;
    let report_path = export_markdown(&record.feedback_report, output_dir)?;

    print_evaluation(&record);
    println!("Report:     {}", report_path.display());
    Ok(())
}

fn print_wireframe(output: &WireframeOutput, stores: &Stores) {
    println!("Wireframe:  {}", output.artifact_id);
    println!(
        "HTML:       {}",
        stores.artifacts.markup_path(&output.artifact_id).display()
    );
}

async fn cmd_wireframe(
    pipeline: &Pipeline,
    stores: &Stores,
    evaluation_id: &str,
    output: Option<&Path>,
) -> Result<()> {
    let id = EvaluationId::parse(evaluation_id)?;
    let result = pipeline.run_wireframe(&id).await?;

    print_wireframe(&result, stores);
    if let Some(path) = output {
        std::fs::write(path, result.wireframe.as_str())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Copied to:  {}", path.display());
    }
    Ok(())
}

async fn cmd_run(
    pipeline: &Pipeline,
    stores: &Stores,
    screenshot: &Path,
    output_dir: &Path,
) -> Result<()> {
    let shot = load_screenshot(screenshot)?;
    info!(path = %screenshot.display(), "Running full pipeline");

    let run = pipeline.run_full(&shot).await?;
    let report_path = export_markdown(&run.evaluation.feedback_report, output_dir)?;

    print_evaluation(&run.evaluation);
    println!("Report:     {}", report_path.display());
    print_wireframe(&run.wireframe, stores);
    Ok(())
}

/// Resolve `latest` or an explicit id to a parsed feedback artifact.
async fn find_feedback_artifact(stores: &Stores, artifact: &str) -> Result<(ArtifactId, FeedbackReport)> {
    let id = if artifact == "latest" {
        let ids = stores.artifacts.list(Stage::Feedback).await?;
        let mut found = None;
        for id in ids.into_iter().rev() {
            if !stores.artifacts.get(&id).await?.is_malformed() {
                found = Some(id);
                break;
            }
        }
        match found {
            Some(id) => id,
            None => bail!("No parsed feedback reports in {}", stores.artifacts.root().display()),
        }
    } else {
        ArtifactId::parse(artifact)?
    };

    let stored = stores.artifacts.get(&id).await?;
    if stored.stage != Stage::Feedback {
        bail!("{id} is a {} artifact, not a feedback report", stored.stage);
    }
    let report = stored
        .payload_as::<FeedbackReport>()
        .with_context(|| format!("Artifact {id} holds no usable feedback report"))?;
    Ok((id, report))
}

async fn cmd_report(
    stores: &Stores,
    artifact: &str,
    output: Option<&Path>,
    output_dir: &Path,
) -> Result<PathBuf> {
    let (id, report) = find_feedback_artifact(stores, artifact).await?;
    info!(artifact_id = %id, "Rendering feedback report");

    match output {
        Some(path) => {
            write_feedback_report_md(path, &report, Utc::now())?;
            Ok(path.to_path_buf())
        }
        None => export_markdown(&report, output_dir),
    }
}

async fn cmd_artifacts_list(stores: &Stores, stage: Stage) -> Result<()> {
    let ids = stores.artifacts.list(stage).await?;
    if ids.is_empty() {
        println!("No {stage} artifacts in {}", stores.artifacts.root().display());
        return Ok(());
    }
    for id in ids {
        let artifact = stores.artifacts.get(&id).await?;
        let status = match &artifact.outcome {
            ArtifactOutcome::Parsed { .. } if artifact.issues.is_empty() => "ok".to_string(),
            ArtifactOutcome::Parsed { .. } => format!("ok ({} issues)", artifact.issues.len()),
            ArtifactOutcome::Malformed { reason } => format!("malformed: {reason}"),
        };
        println!(
            "{}  {}  {}",
            id,
            artifact.created_at.format("%Y-%m-%d %H:%M:%S"),
            status
        );
    }
    Ok(())
}

async fn cmd_artifacts_show(stores: &Stores, id: &str) -> Result<()> {
    let id = ArtifactId::parse(id)?;
    let artifact = stores.artifacts.get(&id).await?;
    println!("{}", serde_json::to_string_pretty(&artifact)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use artifact_store::NewArtifact;
    use uxcrew_core::fakes::ScriptedBackend;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

    const FEEDBACK: &str = r#"{
      "feedback_items": [
        {"id": 1, "title": "Add a loading state", "priority": "high",
         "why_it_matters": "Users tap twice", "what_to_do": ["Show a spinner"]}
      ],
      "quick_wins": [{"change": "Disable button on tap", "impact": "No double submits", "effort": "5 minutes"}],
      "summary": {"total_issues": 1, "high": 1, "medium": 0, "low": 0}
    }"#;

    fn stores(dir: &Path) -> (Stores, PipelineConfig) {
        let config = PipelineConfig {
            output_dir: dir.join("data/outputs"),
            evaluation_dir: dir.join("outputs"),
            ..PipelineConfig::default()
        };
        (Stores::open(&config).unwrap(), config)
    }

    #[tokio::test]
    async fn test_evaluate_writes_markdown_report() {
        let dir = tempfile::tempdir().unwrap();
        let (stores, config) = stores(dir.path());
        let screenshot = dir.path().join("login.png");
        std::fs::write(&screenshot, PNG).unwrap();

        let backend = Arc::new(ScriptedBackend::with_responses([
            r#"{"screen_type": "login", "components": [{"type": "button", "text": "Sign in"}]}"#,
            r#"{"violations": [], "strengths": [], "overall_score": 8.0}"#,
            FEEDBACK,
        ]));
        let pipeline = stores.pipeline(backend.clone(), &config);

        cmd_evaluate(&pipeline, &screenshot, &config.output_dir)
            .await
            .unwrap();

        assert_eq!(backend.call_count(), 3);
        let reports: Vec<_> = std::fs::read_dir(&config.output_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".md"))
            .collect();
        assert_eq!(reports.len(), 1);
        let text = std::fs::read_to_string(reports[0].path()).unwrap();
        assert!(text.contains("# UX Feedback Report"));
        assert!(text.contains("Add a loading state"));
    }

    #[tokio::test]
    async fn test_evaluate_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let (stores, config) = stores(dir.path());
        let not_image = dir.path().join("notes.txt");
        std::fs::write(&not_image, "hello").unwrap();

        let backend = Arc::new(ScriptedBackend::new());
        let pipeline = stores.pipeline(backend.clone(), &config);

        assert!(cmd_evaluate(&pipeline, &not_image, &config.output_dir)
            .await
            .is_err());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_wireframe_unknown_evaluation_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (stores, config) = stores(dir.path());
        let backend = Arc::new(ScriptedBackend::new());
        let pipeline = stores.pipeline(backend.clone(), &config);

        let err = cmd_wireframe(&pipeline, &stores, "eval_20260101_000000_00000000", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_report_latest_skips_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let (stores, config) = stores(dir.path());

        let report: FeedbackReport = serde_json::from_str(FEEDBACK).unwrap();
        let good = NewArtifact::parsed(
            Stage::Feedback,
            FEEDBACK,
            serde_json::to_value(&report).unwrap(),
        );
        stores.artifacts.put(good).await.unwrap();
        stores
            .artifacts
            .put(NewArtifact::malformed(Stage::Feedback, "oops", "invalid JSON"))
            .await
            .unwrap();

        let out = dir.path().join("report.md");
        let path = cmd_report(&stores, "latest", Some(&out), &config.output_dir)
            .await
            .unwrap();
        assert_eq!(path, out);
        let text = std::fs::read_to_string(out).unwrap();
        assert!(text.contains("### 1. Add a loading state"));
    }

    #[tokio::test]
    async fn test_report_refuses_other_stages() {
        let dir = tempfile::tempdir().unwrap();
        let (stores, config) = stores(dir.path());
        let id = stores
            .artifacts
            .put(NewArtifact::parsed(
                Stage::Vision,
                "{}",
                serde_json::json!({"screen_type": "home"}),
            ))
            .await
            .unwrap();

        let err = cmd_report(&stores, id.as_str(), None, &config.output_dir)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a feedback report"));
    }

    #[tokio::test]
    async fn test_report_latest_with_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let (stores, config) = stores(dir.path());
        assert!(cmd_report(&stores, "latest", None, &config.output_dir)
            .await
            .is_err());
    }

    #[test]
    fn test_cli_parses_stage_argument() {
        let cli = Cli::try_parse_from(["uxcrew", "artifacts", "list", "feedback_report"]).unwrap();
        match cli.command {
            Commands::Artifacts {
                action: ArtifactsAction::List { stage },
            } => assert_eq!(stage, Stage::Feedback),
            _ => panic!("unexpected command"),
        }

        let cli = Cli::try_parse_from(["uxcrew", "run"]).unwrap();
        match cli.command {
            Commands::Run { screenshot } => {
                assert_eq!(screenshot, PathBuf::from(DEFAULT_SCREENSHOT))
            }
            _ => panic!("unexpected command"),
        }
    }
}
