//! Video key-frame preprocessing - Main Entry Point

use anyhow::Result;
use attack_runner::{frames_dir, init_logging, preprocess_video, PreprocessOptions, Settings};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Crop annotated signs out of a video, one directory per object")]
struct Args {
    /// Video file name inside the videos directory, e.g. `drive.mp4`
    video_file: String,

    /// Settings file; its `batch.videos_dir` is used unless overridden
    #[arg(long)]
    params: Option<PathBuf>,

    /// Directory holding the video and its `<name>.json` export
    #[arg(long)]
    videos_dir: Option<PathBuf>,

    /// Read frames extracted up front (`1.jpg`, `2.jpg`, ...) from here
    #[arg(long)]
    frames_from: Option<PathBuf>,

    /// Crop every frame, holding the nearest key frame's box outside the
    /// annotated range
    #[arg(long)]
    clamp_outside: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let videos_dir = match (args.videos_dir, &args.params) {
        (Some(dir), _) => dir,
        (None, Some(params)) => Settings::load(params)?.batch.videos_dir,
        (None, None) => PathBuf::from("videos"),
    };

    let mut options = PreprocessOptions::new(&videos_dir, args.video_file.as_str());
    options.frames_from = args.frames_from;
    options.clamp_outside = args.clamp_outside;

    let summary = preprocess_video(&options)?;
    info!(
        "Output in {}",
        frames_dir(&videos_dir, &args.video_file).display()
    );
    println!(
        "{} frames read, {} crops written, {} skipped",
        summary.frames_read, summary.crops_written, summary.crops_skipped
    );
    Ok(())
}
