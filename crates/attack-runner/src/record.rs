//! Batch log records
//!
//! The log is JSON lines, one record per image. Every record carries the
//! same set of keys; fields that do not apply are `null`.

use crate::{BatchMode, RunnerError};
use serde::{Deserialize, Serialize};
use shadow_attack::{AttackOutcome, AttackResult, ShadowPolygon};
use sign_classifier::ClassifierOutput;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Ok,
    Error,
}

/// Outcome of processing one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    /// Position in the directory listing
    pub index: usize,
    pub image: String,
    pub status: RecordStatus,
    pub mode: BatchMode,
    pub ground_truth: usize,
    pub original_label: Option<usize>,
    pub perturbed_label: Option<usize>,
    /// Attack mode: the shadow flipped the prediction.
    /// Inference mode: the clean prediction matches the ground truth.
    pub success: bool,
    pub outcome: Option<AttackOutcome>,
    pub confidence: Option<f32>,
    pub true_class_confidence: Option<f32>,
    pub iterations: Option<usize>,
    pub queries: Option<usize>,
    pub polygon: Option<ShadowPolygon>,
    pub error_kind: Option<String>,
    pub error: Option<String>,
}

impl BatchRecord {
    fn base(index: usize, image: String, mode: BatchMode, ground_truth: usize) -> Self {
        Self {
            index,
            image,
            status: RecordStatus::Ok,
            mode,
            ground_truth,
            original_label: None,
            perturbed_label: None,
            success: false,
            outcome: None,
            confidence: None,
            true_class_confidence: None,
            iterations: None,
            queries: None,
            polygon: None,
            error_kind: None,
            error: None,
        }
    }

    pub fn attacked(index: usize, image: String, ground_truth: usize, result: AttackResult) -> Self {
        Self {
            original_label: Some(result.original_label),
            perturbed_label: Some(result.perturbed_label),
            success: result.success,
            outcome: Some(result.outcome),
            confidence: Some(result.confidence),
            true_class_confidence: Some(result.true_class_confidence),
            iterations: Some(result.iterations),
            queries: Some(result.queries),
            polygon: result.polygon,
            ..Self::base(index, image, BatchMode::Attack, ground_truth)
        }
    }

    pub fn classified(
        index: usize,
        image: String,
        ground_truth: usize,
        output: &ClassifierOutput,
    ) -> Self {
        Self {
            original_label: Some(output.predicted_label),
            success: output.predicted_label == ground_truth,
            confidence: Some(output.confidence()),
            true_class_confidence: Some(output.score(ground_truth)),
            queries: Some(1),
            ..Self::base(index, image, BatchMode::Inference, ground_truth)
        }
    }

    pub fn failed(
        index: usize,
        image: String,
        mode: BatchMode,
        ground_truth: usize,
        error: &RunnerError,
    ) -> Self {
        Self {
            status: RecordStatus::Error,
            error_kind: Some(error.kind().to_string()),
            error: Some(error.to_string()),
            ..Self::base(index, image, mode, ground_truth)
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == RecordStatus::Error
    }
}

/// JSON-lines log writer.
///
/// Creating the writer truncates the file, so each batch run starts a fresh
/// log. Records are flushed as they are written.
pub struct RecordWriter {
    path: PathBuf,
    out: BufWriter<File>,
    written: usize,
}

impl RecordWriter {
    pub fn create(path: &Path) -> Result<Self, RunnerError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| RunnerError::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| RunnerError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn write(&mut self, record: &BatchRecord) -> Result<(), RunnerError> {
        serde_json::to_writer(&mut self.out, record)
            .map_err(|e| RunnerError::io(&self.path, e.into()))?;
        self.out
            .write_all(b"\n")
            .and_then(|_| self.out.flush())
            .map_err(|e| RunnerError::io(&self.path, e))?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }
}
