//! # Batch Replicator CLI
//!
//! Runs batch replications against a JSON catalogue of template items, writing
//! each replica as a JSON line to an output file. Checkpoints are kept on disk,
//! so a paused run can be picked up by a later `resume` after a restart.

use anyhow::{bail, Context};
use async_trait::async_trait;
use batch_replicator::config::{ConfigManager, ReplicatorConfig};
use batch_replicator::constants::operations;
use batch_replicator::logging::{init_structured_logging, log_job_operation};
use batch_replicator::models::{
    CheckpointId, DerivedParams, JobSpec, ProducedItem, RunOutcome, StepUnit, TemplateItem,
};
use batch_replicator::orchestration::{ChannelScheduler, ResumableBatchJob, ResumeWorker};
use batch_replicator::store::FileCheckpointStore;
use batch_replicator::traits::{CheckpointStore, ItemResolver, UnitOfWork};
use batch_replicator::validation::validate_attributes;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "replicate")]
#[command(about = "Replicate a template item into time-shifted copies, resumably")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration directory (default: config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Environment overlay to load (default: detected from REPLICATOR_ENV / APP_ENV)
    #[arg(short, long)]
    environment: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a run now and follow it until it completes or fails
    Submit {
        #[command(flatten)]
        job: JobArgs,

        #[command(flatten)]
        io: IoArgs,

        /// Stop after the first invocation, leaving any checkpoint for `resume`
        #[arg(long)]
        no_follow: bool,
    },

    /// Queue a run without producing anything up front, then drain the queue
    Defer {
        #[command(flatten)]
        job: JobArgs,

        #[command(flatten)]
        io: IoArgs,
    },

    /// Continue a paused run from its checkpoint
    Resume {
        /// Checkpoint identifier printed by `submit --no-follow`
        checkpoint_id: String,

        #[command(flatten)]
        io: IoArgs,

        /// Run only this invocation, even if it pauses again
        #[arg(long)]
        no_follow: bool,
    },

    /// Remove checkpoints past retention
    Purge,
}

#[derive(Args)]
pub struct JobArgs {
    /// Reference of the template item to replicate
    #[arg(short, long)]
    template: String,

    /// Number of copies (default from configuration)
    #[arg(long)]
    count: Option<u32>,

    /// Seconds of work per invocation (default from configuration)
    #[arg(long)]
    budget: Option<u64>,

    /// Spacing between copies, in `unit`s (default from configuration)
    #[arg(long)]
    interval: Option<u32>,

    /// minute, hour, day or month (default from configuration)
    #[arg(long)]
    unit: Option<StepUnit>,
}

impl JobArgs {
    fn into_spec(self, config: &ReplicatorConfig) -> JobSpec {
        let defaults = &config.defaults;
        JobSpec::new(self.template)
            .with_total_count(self.count.unwrap_or(defaults.total_count))
            .with_time_budget_seconds(self.budget.unwrap_or(defaults.time_budget_seconds))
            .with_step(
                self.interval.unwrap_or(defaults.step_interval),
                self.unit.unwrap_or(defaults.step_unit),
            )
    }
}

#[derive(Args)]
pub struct IoArgs {
    /// JSON array of template items
    #[arg(long)]
    catalogue: PathBuf,

    /// JSON Lines file the copies are appended to
    #[arg(short, long)]
    output: PathBuf,
}

/// Template items loaded from a JSON catalogue file
struct CatalogueResolver {
    items: HashMap<String, TemplateItem>,
}

impl CatalogueResolver {
    async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading catalogue {}", path.display()))?;
        let entries: Vec<TemplateItem> = serde_json::from_slice(&raw)
            .with_context(|| format!("parsing catalogue {}", path.display()))?;

        let mut items = HashMap::with_capacity(entries.len());
        for item in entries {
            if let Err(e) = validate_attributes(&item.attributes) {
                warn!(reference = %item.reference, error = %e, "Skipping catalogue item");
                continue;
            }
            items.insert(item.reference.clone(), item);
        }

        info!(items = items.len(), catalogue = %path.display(), "Catalogue loaded");
        Ok(Self { items })
    }
}

#[async_trait]
impl ItemResolver for CatalogueResolver {
    async fn resolve(&self, reference: &str) -> Option<TemplateItem> {
        self.items.get(reference).cloned()
    }
}

#[derive(Serialize)]
struct ReplicaLine<'a> {
    reference: String,
    template_reference: &'a str,
    index: u32,
    starts_at: String,
    ends_at: String,
    attributes: &'a Value,
}

/// Appends one JSON line per copy
struct JsonLinesOutput {
    file: Mutex<tokio::fs::File>,
}

impl JsonLinesOutput {
    async fn open(path: &Path) -> anyhow::Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("opening output {}", path.display()))?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

#[async_trait]
impl UnitOfWork for JsonLinesOutput {
    async fn produce(
        &self,
        template: &TemplateItem,
        params: &DerivedParams,
    ) -> anyhow::Result<ProducedItem> {
        let reference = format!("{}-{}", template.reference, params.index);
        let line = ReplicaLine {
            reference: reference.clone(),
            template_reference: &template.reference,
            index: params.index,
            starts_at: params.starts_at.to_rfc3339(),
            ends_at: params.ends_at.to_rfc3339(),
            attributes: &template.attributes,
        };

        let mut encoded = serde_json::to_vec(&line)?;
        encoded.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&encoded).await?;
        file.flush().await?;

        Ok(ProducedItem {
            reference,
            index: params.index,
        })
    }
}

async fn open_store(config: &ReplicatorConfig) -> anyhow::Result<FileCheckpointStore> {
    let checkpoints = &config.checkpoints;
    Ok(FileCheckpointStore::open(
        &checkpoints.directory,
        checkpoints.key_prefix.clone(),
        checkpoints.retention(),
    )
    .await?)
}

/// A job wired to the catalogue, the output file and the on-disk store, plus
/// the worker that delivers its resumes
async fn build_job(
    config: &ReplicatorConfig,
    io: &IoArgs,
) -> anyhow::Result<(Arc<ResumableBatchJob>, ResumeWorker)> {
    let resolver = CatalogueResolver::load(&io.catalogue).await?;
    let output = JsonLinesOutput::open(&io.output).await?;
    let store = open_store(config).await?;
    let (scheduler, receiver) = ChannelScheduler::channel();

    let job = Arc::new(
        ResumableBatchJob::new(
            Arc::new(resolver),
            Arc::new(output),
            Arc::new(store),
            Arc::new(scheduler),
        )
        .with_resume_delay(config.scheduler.resume_delay()),
    );
    let worker = ResumeWorker::new(job.clone(), receiver);
    Ok((job, worker))
}

fn print_outcome(outcome: &RunOutcome) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(outcome)?);
    Ok(())
}

/// Drain pending resumes, then report the final state of the run
async fn follow(mut worker: ResumeWorker) -> anyhow::Result<()> {
    let mut last = None;
    while let Some(outcome) = worker.process_next().await {
        print_outcome(&outcome)?;
        last = Some(outcome);
    }

    match last {
        Some(RunOutcome::Failed { reason, .. }) => bail!("run failed: {reason}"),
        _ => Ok(()),
    }
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    let manager = match cli.environment.as_deref() {
        Some(environment) => ConfigManager::load_from_directory_with_env(cli.config_dir, environment)?,
        None => ConfigManager::load_from_directory(cli.config_dir)?,
    };
    let config = manager.config();

    match cli.command {
        Commands::Submit { job, io, no_follow } => {
            let spec = job.into_spec(config);
            let (job, worker) = build_job(config, &io).await?;

            let outcome = job.submit(spec).await;
            print_outcome(&outcome)?;
            match outcome {
                RunOutcome::Failed { reason, .. } => bail!("run failed: {reason}"),
                RunOutcome::Paused { .. } if !no_follow => follow(worker).await,
                _ => Ok(()),
            }
        }
        Commands::Defer { job, io } => {
            let spec = job.into_spec(config);
            let (job, worker) = build_job(config, &io).await?;

            let checkpoint_id = job.defer(spec).await?;
            println!("{}", serde_json::json!({ "status": "deferred", "checkpoint_id": checkpoint_id }));
            follow(worker).await
        }
        Commands::Resume {
            checkpoint_id,
            io,
            no_follow,
        } => {
            let (job, worker) = build_job(config, &io).await?;

            let outcome = job.resume(&CheckpointId::from(checkpoint_id)).await;
            print_outcome(&outcome)?;
            match outcome {
                RunOutcome::Failed { reason, .. } => bail!("run failed: {reason}"),
                RunOutcome::Paused { .. } if !no_follow => follow(worker).await,
                _ => Ok(()),
            }
        }
        Commands::Purge => {
            let store = open_store(config).await?;
            let removed = store.purge_expired().await?;
            log_job_operation(
                operations::PURGE,
                None,
                None,
                "completed",
                Some(&format!("{removed} expired checkpoints removed")),
            );
            println!("{}", serde_json::json!({ "status": "purged", "removed": removed }));
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_structured_logging();

    if let Err(e) = execute(cli).await {
        error!(error = %format!("{e:#}"), "replicate failed");
        eprintln!("❌ {e:#}");
        process::exit(1);
    }
}
