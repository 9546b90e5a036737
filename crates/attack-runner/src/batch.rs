//! Batch test driver
//!
//! Runs the attack (or plain inference) on every image of a directory and
//! writes one record per image, in listing order. A bad image becomes an
//! error record; only setup problems abort the batch.

use crate::{BatchMode, BatchRecord, RecordWriter, RunnerError};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, RgbImage};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shadow_attack::{AttackConfig, ShadowAttack};
use sign_classifier::SignClassifier;
use sign_frame::{load_image, save_image};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

/// List the regular files of `dir` in processing order.
///
/// Names with an integer stem (frame numbers) come first in numeric order,
/// the rest follow lexicographically.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, RunnerError> {
    let entries = std::fs::read_dir(dir).map_err(|e| RunnerError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| RunnerError::io(dir, e))?.path();
        if path.is_file() {
            files.push(path);
        }
    }

    let frame_number = |p: &PathBuf| {
        p.file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<u64>().ok())
    };
    files.sort_by(|a, b| match (frame_number(a), frame_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(b),
    });
    Ok(files)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Totals over one batch run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    /// Records with `success = true`
    pub succeeded: usize,
    /// Processed records with `success = false`
    pub unsuccessful: usize,
    /// Images that could not be processed
    pub errors: usize,
    /// Names of every image that did not succeed
    pub failed_images: Vec<String>,
}

impl BatchSummary {
    fn add(&mut self, record: &BatchRecord) {
        self.total += 1;
        if record.is_error() {
            self.errors += 1;
        } else if record.success {
            self.succeeded += 1;
            return;
        } else {
            self.unsuccessful += 1;
        }
        self.failed_images.push(record.image.clone());
    }
}

/// Read-only state shared by every worker
#[derive(Clone)]
struct Job {
    classifier: Arc<dyn SignClassifier>,
    attack: AttackConfig,
    mode: BatchMode,
    ground_truth: usize,
    target: Option<usize>,
    seed: u64,
    region: Option<GrayImage>,
    save_dir: Option<PathBuf>,
}

impl Job {
    fn process(&self, index: usize, path: &Path) -> BatchRecord {
        let name = display_name(path);
        match self.try_process(index, path, &name) {
            Ok(record) => record,
            Err(e) => {
                warn!("{}: {}", name, e);
                BatchRecord::failed(index, name, self.mode, self.ground_truth, &e)
            }
        }
    }

    fn try_process(
        &self,
        index: usize,
        path: &Path,
        name: &str,
    ) -> Result<BatchRecord, RunnerError> {
        let image = load_image(path)?;

        match self.mode {
            BatchMode::Inference => {
                let output = self.classifier.classify(&image)?;
                info!(
                    "{}: correct {} predict {} confidence {:.2}%",
                    name,
                    output.predicted_label == self.ground_truth,
                    output.predicted_label,
                    output.confidence() * 100.0
                );
                Ok(BatchRecord::classified(
                    index,
                    name.to_string(),
                    self.ground_truth,
                    &output,
                ))
            }
            BatchMode::Attack => {
                let region = self.region.as_ref().map(|r| fit_region(r, &image));
                let mut attack = ShadowAttack::new(&*self.classifier, self.attack.clone())?;
                if let Some(region) = region.as_ref() {
                    attack = attack.with_region(region);
                }

                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(index as u64));
                let result = attack.run(&image, self.ground_truth, self.target, &mut rng)?;
                info!(
                    "{}: success {} label {} -> {} ({} iterations)",
                    name,
                    result.success,
                    result.original_label,
                    result.perturbed_label,
                    result.iterations
                );

                if let (Some(dir), Some(polygon)) = (&self.save_dir, &result.polygon) {
                    if result.success {
                        let adversarial = attack.render(&image, polygon);
                        save_image(&adversarial, &dir.join(adversarial_name(path)))?;
                    }
                }
                Ok(BatchRecord::attacked(index, name.to_string(), self.ground_truth, result))
            }
        }
    }
}

/// Sign mask resized to the image it is applied to
fn fit_region(region: &GrayImage, image: &RgbImage) -> GrayImage {
    if region.dimensions() == image.dimensions() {
        return region.clone();
    }
    imageops::resize(region, image.width(), image.height(), FilterType::Nearest)
}

fn adversarial_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}_adv.png", stem)
}

/// Batch driver
pub struct BatchRunner {
    job: Arc<Job>,
    jobs: usize,
}

impl BatchRunner {
    /// Build a runner, rejecting settings that would fail on every image
    pub fn new(
        classifier: Arc<dyn SignClassifier>,
        settings: &crate::Settings,
    ) -> Result<Self, RunnerError> {
        settings.validate()?;
        let batch = &settings.batch;
        let num_classes = classifier.num_classes();
        if batch.ground_truth >= num_classes {
            return Err(RunnerError::Settings(format!(
                "ground truth {} outside the classifier's {} classes",
                batch.ground_truth, num_classes
            )));
        }
        if let Some(target) = batch.target {
            if target >= num_classes || target == batch.ground_truth {
                return Err(RunnerError::Settings(format!(
                    "target {} must differ from the ground truth and be below {}",
                    target, num_classes
                )));
            }
        }

        let region = match &batch.region_mask {
            Some(path) => Some(DynamicImage::ImageRgb8(load_image(path)?).to_luma8()),
            None => None,
        };

        Ok(Self {
            job: Arc::new(Job {
                classifier,
                attack: settings.attack.clone(),
                mode: batch.mode,
                ground_truth: batch.ground_truth,
                target: batch.target,
                seed: settings.seed,
                region,
                save_dir: None,
            }),
            jobs: batch.jobs,
        })
    }

    /// Write the perturbed image of every successful attack into `dir`
    pub fn save_adversarial(mut self, dir: &Path) -> Result<Self, RunnerError> {
        std::fs::create_dir_all(dir).map_err(|e| RunnerError::io(dir, e))?;
        Arc::make_mut(&mut self.job).save_dir = Some(dir.to_path_buf());
        Ok(self)
    }

    /// Process every image in `dir` and write the log to `log_path`
    pub async fn run(&self, dir: &Path, log_path: &Path) -> Result<BatchSummary, RunnerError> {
        let images = list_images(dir)?;
        let mut writer = RecordWriter::create(log_path)?;
        info!("Total frames: {}", images.len());

        let names: Vec<String> = images.iter().map(|p| display_name(p)).collect();
        let (tx, mut rx) = mpsc::channel::<(usize, BatchRecord)>(self.jobs * 2);
        let permits = Arc::new(Semaphore::new(self.jobs));

        let producer = async {
            for (index, path) in images.into_iter().enumerate() {
                let Ok(permit) = permits.clone().acquire_owned().await else {
                    break;
                };
                let job = Arc::clone(&self.job);
                let tx = tx.clone();
                tokio::task::spawn_blocking(move || {
                    let record = job.process(index, &path);
                    drop(permit);
                    if tx.blocking_send((index, record)).is_err() {
                        debug!("Record channel closed before image {}", index);
                    }
                });
            }
            drop(tx);
        };

        let consumer = async {
            let mut summary = BatchSummary::default();
            let mut pending = BTreeMap::new();
            let mut next = 0;

            while let Some((index, record)) = rx.recv().await {
                pending.insert(index, record);
                while let Some(record) = pending.remove(&next) {
                    writer.write(&record)?;
                    summary.add(&record);
                    next += 1;
                }
            }

            // A worker that died without reporting leaves a gap; record it so
            // every image still has exactly one entry
            for (index, name) in names.iter().enumerate().skip(next) {
                let record = pending.remove(&index).unwrap_or_else(|| {
                    let err = RunnerError::Usage("worker terminated without a result".into());
                    BatchRecord::failed(
                        index,
                        name.clone(),
                        self.job.mode,
                        self.job.ground_truth,
                        &err,
                    )
                });
                writer.write(&record)?;
                summary.add(&record);
            }

            Ok::<_, RunnerError>(summary)
        };

        let ((), summary) = tokio::join!(producer, consumer);
        let summary = summary?;

        info!(
            "Batch done: {} images, {} succeeded, {} unsuccessful, {} errors",
            summary.total, summary.succeeded, summary.unsuccessful, summary.errors
        );
        if !summary.failed_images.is_empty() {
            info!("Failed: {} {:?}", summary.failed_images.len(), summary.failed_images);
        }
        Ok(summary)
    }
}
