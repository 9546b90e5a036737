//! Shadow Attack Runner
//!
//! Research drivers around the shadow attack:
//! - Batch testing of a directory of sign crops, one log record per image
//! - Video preprocessing from Label Studio key frames to per-frame crops
//! - Settings loading (`params.json`) and logging setup for the binaries

pub mod batch;
pub mod preprocess;
pub mod record;
pub mod settings;

pub use batch::{list_images, BatchRunner, BatchSummary};
pub use preprocess::{frames_dir, preprocess_video, PreprocessOptions, PreprocessSummary};
pub use record::{BatchRecord, RecordStatus, RecordWriter};
pub use settings::{BatchConfig, BatchMode, Settings, MAX_JOBS};

use keyframe::AnnotationError;
use shadow_attack::AttackError;
use sign_classifier::ClassifierError;
use sign_frame::FrameError;
use std::path::PathBuf;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Runner error types
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Usage(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error(transparent)]
    Attack(#[from] AttackError),
}

impl RunnerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RunnerError::Io {
            path: path.into(),
            source,
        }
    }

    /// Tag recorded in the batch log for a failed image
    pub fn kind(&self) -> &'static str {
        match self {
            RunnerError::Settings(_) => "settings",
            RunnerError::Usage(_) => "usage",
            RunnerError::Io { .. } => "io",
            RunnerError::Frame(e) => e.kind(),
            RunnerError::Annotation(_) => "annotation",
            RunnerError::Classifier(e) => e.kind(),
            RunnerError::Attack(AttackError::InvalidConfiguration(_)) => "invalid_configuration",
            RunnerError::Attack(e) => e.classifier_error().map_or("attack", ClassifierError::kind),
        }
    }
}

/// Initialize logging
pub fn init_logging(verbose: bool) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_keeps_classifier_cause() {
        let rejected = RunnerError::from(AttackError::from(ClassifierError::InvalidInput(
            "empty image".into(),
        )));
        assert_eq!(rejected.kind(), "invalid_input");

        let failed = RunnerError::from(AttackError::from(ClassifierError::Inference(
            "device lost".into(),
        )));
        assert_eq!(failed.kind(), "inference");

        let config = RunnerError::from(AttackError::InvalidConfiguration("bad".into()));
        assert_eq!(config.kind(), "invalid_configuration");
    }
}
