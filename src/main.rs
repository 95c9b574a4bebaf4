//! deepsight-ingest - run a batch of images through the detection pipeline
//!
//! Reads each path as an upload, classifies it with the simulated
//! classifier, and prints the per-file statuses and dashboard statistics
//! as JSON on stdout. Logs go to stderr.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

use deepsight_core::{
    init_logger, DetectionStore, PipelineConfig, PipelineCoordinator, SimulatedClassifier,
    UploadedFile,
};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Command-line arguments for deepsight-ingest
#[derive(Parser, Debug)]
#[command(name = "deepsight-ingest")]
#[command(about = "Classify a batch of ad images and report detections")]
#[command(version)]
struct Args {
    /// Image files to ingest as one batch
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// JSON pipeline configuration file (DEEPSIGHT_* variables still apply)
    #[arg(short, long, env = "DEEPSIGHT_CONFIG")]
    config: Option<PathBuf>,

    /// Seed for the simulated classifier
    #[arg(long)]
    seed: Option<u64>,

    /// Classifier timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Preload the store with the demo detections
    #[arg(long)]
    sample_data: bool,

    /// Write the store journal (JSON lines) to this path after the run
    #[arg(long)]
    journal: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            PipelineConfig::from_json(&raw)?
        }
        None => PipelineConfig::default(),
    };
    let mut config = config.with_overrides(|key| std::env::var(key).ok())?;
    if let Some(timeout_ms) = args.timeout_ms {
        config.classifier_timeout_ms = timeout_ms;
    }
    config.validate()?;
    Ok(config)
}

fn read_upload(path: &Path) -> Result<UploadedFile> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mime_type = infer::get(&bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or(FALLBACK_MIME);
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Ok(UploadedFile::new(&file_name, mime_type, bytes))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    let args = Args::parse();
    let config = load_config(&args)?;

    let store = Arc::new(if args.sample_data {
        DetectionStore::with_sample_data()
    } else {
        DetectionStore::from_config(&config)
    });

    let mut classifier = SimulatedClassifier::from_config(&config);
    if let Some(seed) = args.seed {
        classifier = classifier.with_seed(seed);
    }

    let uploads = args
        .paths
        .iter()
        .map(|path| read_upload(path))
        .collect::<Result<Vec<_>>>()?;

    let coordinator = PipelineCoordinator::new(config, store.clone(), Arc::new(classifier))?;
    let submission = coordinator.submit_batch(uploads);
    coordinator.wait_all().await;

    let rejected: Vec<_> = submission
        .rejected
        .iter()
        .map(|r| json!({ "fileName": r.file_name, "error": r.error.to_string() }))
        .collect();
    let report = json!({
        "batchId": submission.batch_id,
        "files": coordinator.snapshot(),
        "rejected": rejected,
        "stats": coordinator.compute_stats(),
    });

    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &report)?;
    writeln!(out)?;

    if let Some(path) = &args.journal {
        let file = File::create(path)
            .with_context(|| format!("Failed to create journal {}", path.display()))?;
        let written = store.write_journal(BufWriter::new(file))?;
        log::info!("JOURNAL_WRITTEN path={} records={}", path.display(), written);
    }

    Ok(())
}
