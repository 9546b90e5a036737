//! Video preprocessing
//!
//! Turns a video plus its Label Studio key-frame export into one directory of
//! sign crops per tracked object: `<videos_dir>/<name>-frames/<object_id>/<frame>.jpg`.

use crate::RunnerError;
use keyframe::{load_objects, TrackedObject};
use sign_frame::{crop, save_image, DirectoryFrames, FrameSource};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Inputs of one preprocessing run
#[derive(Debug, Clone)]
pub struct PreprocessOptions {
    /// Directory holding `<name>.mp4` and `<name>.json`
    pub videos_dir: PathBuf,

    /// Video file name, must end in `.mp4`
    pub video_file: String,

    /// Read pre-extracted frames from this directory instead of decoding
    pub frames_from: Option<PathBuf>,

    /// Emit crops for every frame, holding the nearest key frame's box
    /// outside the annotated range
    pub clamp_outside: bool,
}

impl PreprocessOptions {
    pub fn new(videos_dir: impl Into<PathBuf>, video_file: impl Into<String>) -> Self {
        Self {
            videos_dir: videos_dir.into(),
            video_file: video_file.into(),
            frames_from: None,
            clamp_outside: false,
        }
    }

    /// Video name without the `.mp4` extension
    fn video_name(&self) -> Result<&str, RunnerError> {
        self.video_file.strip_suffix(".mp4").ok_or_else(|| {
            RunnerError::Usage(format!(
                "video file must be an mp4, got {}",
                self.video_file
            ))
        })
    }
}

/// Counters of one preprocessing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessSummary {
    pub frames_read: u64,
    pub crops_written: u64,
    pub crops_skipped: u64,
}

fn open_source(options: &PreprocessOptions) -> Result<Box<dyn FrameSource>, RunnerError> {
    if let Some(dir) = &options.frames_from {
        return Ok(Box::new(DirectoryFrames::open(dir)?));
    }

    #[cfg(feature = "opencv")]
    {
        let path = options.videos_dir.join(&options.video_file);
        Ok(Box::new(sign_frame::VideoFrames::open(&path)?))
    }

    #[cfg(not(feature = "opencv"))]
    {
        Err(RunnerError::Usage(
            "built without video decoding; pass --frames-from <dir> with extracted frames".into(),
        ))
    }
}

/// Range of frames for which `object` gets a crop
fn wanted(object: &TrackedObject, frame: u64, clamp_outside: bool) -> bool {
    clamp_outside
        || (object.annotation.first_frame()..=object.annotation.last_frame()).contains(&frame)
}

/// Crop every tracked object out of every frame it covers
pub fn preprocess_video(options: &PreprocessOptions) -> Result<PreprocessSummary, RunnerError> {
    let name = options.video_name()?;
    let annotation_path = options.videos_dir.join(format!("{}.json", name));
    let objects = load_objects(&annotation_path)?;

    let mut source = open_source(options)?;
    if let Some(total) = source.frame_count() {
        for object in &objects {
            object.annotation.validate_against(total)?;
        }
        info!("{}: {} frames, {} objects", options.video_file, total, objects.len());
    }

    let out_root = options.videos_dir.join(format!("{}-frames", name));
    let mut object_dirs = Vec::with_capacity(objects.len());
    for object in &objects {
        let dir = out_root.join(&object.id);
        std::fs::create_dir_all(&dir).map_err(|e| RunnerError::io(&dir, e))?;
        debug!("Object {} ({}) -> {}", object.id, object.label(), dir.display());
        object_dirs.push(dir);
    }

    let last_needed = objects
        .iter()
        .map(|o| o.annotation.last_frame())
        .max()
        .unwrap_or(0);

    let mut summary = PreprocessSummary::default();
    while let Some(frame) = source.next_frame()? {
        summary.frames_read += 1;

        for (object, dir) in objects.iter().zip(&object_dirs) {
            if !wanted(object, frame.index, options.clamp_outside) {
                continue;
            }
            let bbox = object
                .annotation
                .interpolate(frame.index)
                .to_pixels(frame.width(), frame.height());

            let path = dir.join(format!("{}.jpg", frame.index));
            match crop(&frame.image, &bbox) {
                Ok(sign) => {
                    save_image(&sign, &path)?;
                    summary.crops_written += 1;
                }
                Err(e) => {
                    warn!("Frame {} object {}: {}", frame.index, object.id, e);
                    summary.crops_skipped += 1;
                }
            }
        }

        if !options.clamp_outside && frame.index >= last_needed {
            break;
        }
    }

    info!(
        "Wrote {} crops from {} frames into {} ({} skipped)",
        summary.crops_written,
        summary.frames_read,
        out_root.display(),
        summary.crops_skipped
    );
    Ok(summary)
}

/// Frame directory written for `video_file` under `videos_dir`
pub fn frames_dir(videos_dir: &Path, video_file: &str) -> PathBuf {
    let stem = video_file.strip_suffix(".mp4").unwrap_or(video_file);
    videos_dir.join(format!("{}-frames", stem))
}
