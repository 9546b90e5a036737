//! Key-Frame Annotation and Interpolation
//!
//! Sparse, manually labelled sign rectangles are turned into a box for every
//! frame of a video by linear interpolation between the surrounding key
//! frames. Annotations come from Label Studio's video rectangle export.

mod interpolate;
mod label_studio;

pub use interpolate::{KeyFrame, KeyFrameAnnotation};
pub use label_studio::{load_objects, parse_objects, TrackedObject};

use std::path::PathBuf;
use thiserror::Error;

/// Errors while reading or interpolating key-frame annotations
#[derive(Debug, Error)]
pub enum AnnotationError {
    /// Malformed, insufficient or inconsistent key-frame data
    #[error("Invalid annotation: {0}")]
    InvalidAnnotation(String),

    #[error("Failed to read annotation file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AnnotationError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        AnnotationError::InvalidAnnotation(msg.into())
    }
}
