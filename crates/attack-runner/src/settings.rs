//! Run settings loaded from `params.json`
//!
//! `seed` is mandatory; every other section falls back to defaults. Values
//! can be overridden from the environment with a `SHADOW_` prefix and `__`
//! as the section separator, e.g. `SHADOW_ATTACK__MAX_ITERATIONS=50`.

use crate::RunnerError;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use shadow_attack::AttackConfig;
use sign_classifier::ClassifierConfig;
use std::path::{Path, PathBuf};
use tracing::info;

/// Upper bound on concurrently processed images
pub const MAX_JOBS: usize = 256;

/// What the batch driver does with each image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    /// Run the shadow attack search
    Attack,
    /// Classify only and check against the ground truth
    Inference,
}

/// Batch driver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub mode: BatchMode,

    /// Ground-truth class of every image in the directory
    pub ground_truth: usize,

    /// Target class for a targeted attack
    pub target: Option<usize>,

    /// Images processed concurrently
    pub jobs: usize,

    /// Root directory holding videos, annotations and frame directories
    pub videos_dir: PathBuf,

    /// Optional sign-shape mask restricting where shadows may fall
    pub region_mask: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            mode: BatchMode::Attack,
            ground_truth: 9,
            target: None,
            jobs: 1,
            videos_dir: PathBuf::from("videos"),
            region_mask: None,
        }
    }
}

/// Process-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Reproducibility seed, read once at start-up
    pub seed: u64,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub attack: AttackConfig,

    #[serde(default)]
    pub batch: BatchConfig,
}

impl Settings {
    /// Load settings from a JSON file plus `SHADOW_*` environment overrides
    pub fn load(path: &Path) -> Result<Self, RunnerError> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Json))
            .add_source(
                Environment::with_prefix("SHADOW")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| RunnerError::Settings(format!("{}: {}", path.display(), e)))?;

        settings.validate()?;
        info!("Loaded settings from {} (seed {})", path.display(), settings.seed);
        Ok(settings)
    }

    /// Parse settings from a JSON string, without environment overrides
    pub fn from_json(json: &str) -> Result<Self, RunnerError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(json, FileFormat::Json))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| RunnerError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), RunnerError> {
        self.attack.validate()?;
        if self.batch.jobs == 0 || self.batch.jobs > MAX_JOBS {
            return Err(RunnerError::Settings(format!(
                "batch.jobs must be between 1 and {}, got {}",
                MAX_JOBS, self.batch.jobs
            )));
        }
        Ok(())
    }
}
