//! Label Studio video rectangle export
//!
//! Only the parts we need are parsed: the first task's first annotation,
//! and for each result its id, optional labels and the key-frame sequence.
//! Rectangle coordinates are percentages of the frame size.

use crate::{AnnotationError, KeyFrame, KeyFrameAnnotation};
use serde::Deserialize;
use sign_frame::BoundingBox;
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_LABEL: &str = "blank";

#[derive(Debug, Deserialize)]
struct Task {
    annotations: Vec<Annotation>,
}

#[derive(Debug, Deserialize)]
struct Annotation {
    result: Vec<ResultItem>,
}

#[derive(Debug, Deserialize)]
struct ResultItem {
    id: String,
    value: ResultValue,
}

#[derive(Debug, Deserialize)]
struct ResultValue {
    #[serde(default)]
    labels: Vec<String>,
    sequence: Vec<SequenceItem>,
}

#[derive(Debug, Deserialize)]
struct SequenceItem {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    frame: u64,
}

/// One labelled object track, boxes in percent of the frame size
#[derive(Debug, Clone)]
pub struct TrackedObject {
    pub id: String,
    pub labels: Vec<String>,
    pub annotation: KeyFrameAnnotation,
}

impl TrackedObject {
    /// Primary label, `"blank"` when the track carries none
    pub fn label(&self) -> &str {
        self.labels.first().map(String::as_str).unwrap_or(DEFAULT_LABEL)
    }
}

/// Parse a Label Studio JSON export
pub fn parse_objects(json: &str) -> Result<Vec<TrackedObject>, AnnotationError> {
    let tasks: Vec<Task> = serde_json::from_str(json)
        .map_err(|e| AnnotationError::invalid(format!("malformed export: {}", e)))?;

    let task = tasks
        .into_iter()
        .next()
        .ok_or_else(|| AnnotationError::invalid("export contains no tasks"))?;
    let annotation = task
        .annotations
        .into_iter()
        .next()
        .ok_or_else(|| AnnotationError::invalid("task has no annotations"))?;

    let mut objects = Vec::with_capacity(annotation.result.len());
    for item in annotation.result {
        let frames = item
            .value
            .sequence
            .iter()
            .map(|s| {
                BoundingBox::from_xywh(s.x, s.y, s.width, s.height)
                    .map(|bbox| KeyFrame::new(s.frame, bbox))
                    .map_err(|e| {
                        AnnotationError::invalid(format!("object {} frame {}: {}", item.id, s.frame, e))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let annotation = KeyFrameAnnotation::new(frames)
            .map_err(|e| AnnotationError::invalid(format!("object {}: {}", item.id, e)))?;
        debug!(
            "Object {}: {} key frames, frames {}..={}",
            item.id,
            annotation.key_frames().len(),
            annotation.first_frame(),
            annotation.last_frame()
        );

        objects.push(TrackedObject {
            id: item.id,
            labels: item.value.labels,
            annotation,
        });
    }

    Ok(objects)
}

/// Read and parse a Label Studio export from disk
pub fn load_objects(path: &Path) -> Result<Vec<TrackedObject>, AnnotationError> {
    let json = std::fs::read_to_string(path).map_err(|source| AnnotationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let objects = parse_objects(&json)?;
    info!("Loaded {} tracked objects from {}", objects.len(), path.display());
    Ok(objects)
}
