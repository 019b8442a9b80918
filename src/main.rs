//! `atf` command-line interface.
//!
//! Registers requirement documents, drives the generation pipeline over them
//! and exports what it produced.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use atf_lib::config::{AppConfig, LlmBackend};
use atf_lib::models::{ArtifactKind, StageName};
use atf_lib::pipeline::export::{default_bundle_path, export_bundle, render_artifact, stage_statuses};
use atf_lib::pipeline::generation::{client_from_config, PipelineOrchestrator, PipelineRun};
use atf_lib::pipeline::storage::{ArtifactStore, SqliteArtifactStore};

#[derive(Parser)]
#[command(
    name = "atf",
    version,
    about = "Turn a requirements document into analysis, user stories, test cases and test data",
    after_help = "EXAMPLES:\n  \
                  atf upload specs/checkout.md\n  \
                  atf run specs/checkout.md\n  \
                  atf stage <ID> test_data\n  \
                  atf export <ID> --out ./checkout.tar.gz"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory (overrides ATF_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Backend: ollama or openai (overrides ATF_LLM_BACKEND)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Backend base URL (overrides ATF_LLM_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Model or deployment name (overrides ATF_MODEL)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Retries for transient backend failures (overrides ATF_MAX_RETRIES)
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register one or more source documents
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List registered documents and their stage outcomes
    List,

    /// Run the full pipeline; each target is a document id or a file to register first
    Run {
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Re-run a single stage from the stored earlier stages
    Stage { id: Uuid, stage: StageName },

    /// Write every artifact of a document into a .tar.gz bundle
    Export {
        id: Uuid,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print one stored artifact as JSON
    Show { id: Uuid, artifact: ArtifactKind },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    atf_lib::init_tracing();

    let config = apply_overrides(AppConfig::from_env(), &cli)?;
    let store = Arc::new(
        SqliteArtifactStore::open(&config.database_path())
            .with_context(|| format!("Failed to open {}", config.database_path().display()))?,
    );

    match cli.command {
        Commands::Upload { files } => {
            let orchestrator = build_orchestrator(&config, store)?;
            for file in &files {
                let id = register_file(&orchestrator, file)?;
                println!("{id}  {}", file.display());
            }
            Ok(())
        }
        Commands::List => list_documents(store.as_ref()),
        Commands::Run { targets } => {
            let orchestrator = build_orchestrator(&config, store)?;
            check_model(&config);
            let ids = targets
                .iter()
                .map(|target| resolve_target(&orchestrator, target))
                .collect::<Result<Vec<_>>>()?;

            let mut failed = 0;
            for (id, result) in ids.iter().zip(orchestrator.run_many(&ids)) {
                match result {
                    Ok(run) => print_run(&run),
                    Err(e) => {
                        failed += 1;
                        eprintln!("{id}: {e}");
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} of {} document(s) failed", ids.len());
            }
            Ok(())
        }
        Commands::Stage { id, stage } => {
            let orchestrator = build_orchestrator(&config, store)?;
            check_model(&config);
            let result = orchestrator
                .run_stage(&id, stage)
                .with_context(|| format!("Stage {stage} failed for {id}"))?;
            println!(
                "{stage}: {} ({} record(s))",
                result.status.label(),
                result.payload.record_count()
            );
            Ok(())
        }
        Commands::Export { id, out } => {
            let document = store
                .get_document(&id)?
                .with_context(|| format!("Document not found: {id}"))?;
            let path = out.unwrap_or_else(|| {
                default_bundle_path(&config.exports_dir(), &document.file_name, &id)
            });
            let summary = export_bundle(store.as_ref(), &id, &path)
                .with_context(|| format!("Failed to export {id}"))?;
            println!("{} ({} entries, {} bytes)", summary.path.display(), summary.entries.len(), summary.size_bytes);
            Ok(())
        }
        Commands::Show { id, artifact } => {
            match render_artifact(store.as_ref(), &id, artifact)? {
                Some(json) => println!("{json}"),
                None => bail!("No {artifact} artifact stored for {id}"),
            }
            Ok(())
        }
    }
}

fn apply_overrides(mut config: AppConfig, cli: &Cli) -> Result<AppConfig> {
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(raw) = &cli.backend {
        config.backend =
            LlmBackend::parse(raw).with_context(|| format!("Unknown backend '{raw}'"))?;
    }
    if let Some(url) = &cli.url {
        config.base_url = url.clone();
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(retries) = cli.max_retries {
        config.max_retries = retries;
    }
    Ok(config)
}

fn build_orchestrator(
    config: &AppConfig,
    store: Arc<SqliteArtifactStore>,
) -> Result<PipelineOrchestrator> {
    let client = client_from_config(config).context("Failed to build LLM client")?;
    Ok(PipelineOrchestrator::new(client, store, &config.model).with_retry_policy(config.retry_policy()))
}

/// A missing model is reported but does not block the run; stages will
/// record the invocation failure themselves.
fn check_model(config: &AppConfig) {
    let checked = client_from_config(config).and_then(|client| client.check_model(&config.model));
    if let Err(e) = checked {
        tracing::warn!(model = %config.model, error = %e, "Model check failed");
    }
}

fn register_file(orchestrator: &PipelineOrchestrator, path: &Path) -> Result<Uuid> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let document = orchestrator
        .register_document(&file_name, &content)
        .with_context(|| format!("Failed to register {}", path.display()))?;
    Ok(document.id)
}

fn resolve_target(orchestrator: &PipelineOrchestrator, target: &str) -> Result<Uuid> {
    match Uuid::parse_str(target) {
        Ok(id) => Ok(id),
        Err(_) => register_file(orchestrator, Path::new(target)),
    }
}

fn list_documents(store: &dyn ArtifactStore) -> Result<()> {
    let documents = store.list_documents()?;
    if documents.is_empty() {
        println!("No documents registered.");
        return Ok(());
    }
    for document in documents {
        let stages = stage_statuses(store, &document.id)?
            .into_iter()
            .map(|(stage, result)| {
                let label = result.map(|r| r.status.label()).unwrap_or("pending");
                format!("{stage}={label}")
            })
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "{}  {}  {}  {}",
            document.id,
            document.uploaded_at.format("%Y-%m-%d %H:%M"),
            document.file_name,
            stages
        );
    }
    Ok(())
}

fn print_run(run: &PipelineRun) {
    let c = &run.coverage;
    println!("{}", run.document_id);
    for result in &run.stages {
        println!(
            "  {:<13} {:<17} {} record(s)",
            result.stage.as_str(),
            result.status.label(),
            result.payload.record_count()
        );
    }
    println!(
        "  coverage: {} requirement(s), {} stories, {} cases, {} data rows, {:.1}% stories covered",
        c.functional_requirements_count,
        c.user_stories_count,
        c.test_cases_count,
        c.test_data_count,
        c.story_coverage_percentage
    );
}
