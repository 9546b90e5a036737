//! Shadow attack batch tester - Main Entry Point

use anyhow::{Context, Result};
use attack_runner::{init_logging, BatchMode, BatchRunner, Settings};
use clap::Parser;
use sign_classifier::{LuminanceClassifier, OnnxClassifier, SignClassifier};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Mock classes when the settings name none
const MOCK_CLASSES: usize = 16;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run the shadow attack over a directory of sign images")]
struct Args {
    /// Directory of sign images (numbered frames or any image files)
    frames_dir: PathBuf,

    /// JSON-lines log written for this run, truncated first
    log_file: PathBuf,

    /// Settings file with the mandatory seed
    #[arg(long, default_value = "params.json")]
    params: PathBuf,

    /// Directory `frames_dir` is looked up in first
    #[arg(long)]
    videos_dir: Option<PathBuf>,

    /// Attack each image or only classify it
    #[arg(long, value_enum)]
    mode: Option<BatchMode>,

    /// Ground-truth class of every image
    #[arg(long)]
    ground_truth: Option<usize>,

    /// Target class for a targeted attack
    #[arg(long)]
    target: Option<usize>,

    /// Images processed concurrently
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Write the perturbed image of each successful attack here
    #[arg(long)]
    save_adversarial: Option<PathBuf>,

    /// Use the luminance mock instead of the ONNX model
    #[arg(long)]
    mock: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn build_classifier(settings: &Settings, mock: bool) -> Result<Arc<dyn SignClassifier>> {
    if mock {
        let truth = settings.batch.ground_truth;
        let classes = settings
            .classifier
            .class_names
            .len()
            .max(MOCK_CLASSES)
            .max(truth + 2);
        let decoy = (truth + 1) % classes;
        info!("Using luminance mock classifier ({} classes)", classes);
        return Ok(Arc::new(LuminanceClassifier::new(truth, decoy, classes)?));
    }

    let classifier = OnnxClassifier::new(&settings.classifier).context("loading classifier")?;
    Ok(Arc::new(classifier))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    info!("=== Shadow Attack v{} ===", env!("CARGO_PKG_VERSION"));

    let mut settings = Settings::load(&args.params)?;
    if let Some(mode) = args.mode {
        settings.batch.mode = mode;
    }
    if let Some(truth) = args.ground_truth {
        settings.batch.ground_truth = truth;
    }
    if args.target.is_some() {
        settings.batch.target = args.target;
    }
    if let Some(jobs) = args.jobs {
        settings.batch.jobs = jobs;
    }
    if let Some(dir) = args.videos_dir {
        settings.batch.videos_dir = dir;
    }
    settings.validate()?;

    // Frame directories live under the videos directory; fall back to the
    // path as given
    let under_videos = settings.batch.videos_dir.join(&args.frames_dir);
    let frames_dir = if args.frames_dir.is_relative() && under_videos.is_dir() {
        under_videos
    } else {
        args.frames_dir.clone()
    };

    let classifier = build_classifier(&settings, args.mock)?;
    let mut runner = BatchRunner::new(classifier, &settings)?;
    if let Some(dir) = &args.save_adversarial {
        runner = runner.save_adversarial(dir)?;
    }

    info!("Frames: {}", frames_dir.display());
    info!("Log: {}", args.log_file.display());
    let summary = runner
        .run(&frames_dir, &args.log_file)
        .await
        .with_context(|| format!("batch over {}", frames_dir.display()))?;

    println!(
        "{} images: {} succeeded, {} unsuccessful, {} errors",
        summary.total, summary.succeeded, summary.unsuccessful, summary.errors
    );
    Ok(())
}
