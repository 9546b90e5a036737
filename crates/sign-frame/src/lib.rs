//! Sign Frame Library
//!
//! Image and frame plumbing shared by the attack and preprocessing tools:
//! - Bounding boxes in pixel or percent coordinates
//! - Image loading, saving and sign cropping
//! - Frame sources (directory of extracted frames, OpenCV video)

pub mod bbox;
pub mod frame;
pub mod source;

pub use bbox::BoundingBox;
pub use frame::{crop, load_image, resize, save_image, Frame};
pub use source::{DirectoryFrames, FrameSource};

#[cfg(feature = "opencv")]
pub use source::VideoFrames;

use std::path::PathBuf;
use thiserror::Error;

/// Frame error types
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Failed to encode image {path}: {reason}")]
    Encode { path: PathBuf, reason: String },

    #[error("Invalid bounding box: {0}")]
    InvalidBox(String),

    #[error("Crop region {0} lies outside the {1}x{2} frame")]
    EmptyCrop(String, u32, u32),

    #[error("Video error: {0}")]
    Video(String),
}

impl FrameError {
    /// Short tag used when a frame error is recorded instead of propagated
    pub fn kind(&self) -> &'static str {
        match self {
            FrameError::Io { .. } => "io",
            FrameError::Decode { .. } => "decode",
            FrameError::Encode { .. } => "encode",
            FrameError::InvalidBox(_) | FrameError::EmptyCrop(..) => "crop",
            FrameError::Video(_) => "video",
        }
    }
}
