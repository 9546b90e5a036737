//! Bounding box interpolation between key frames

use crate::AnnotationError;
use serde::{Deserialize, Serialize};
use sign_frame::BoundingBox;

/// A manually labelled frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyFrame {
    pub frame: u64,
    pub bbox: BoundingBox,
}

impl KeyFrame {
    pub fn new(frame: u64, bbox: BoundingBox) -> Self {
        Self { frame, bbox }
    }
}

/// Validated key frames of one tracked object.
///
/// Holds at least two key frames with strictly increasing frame indices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyFrameAnnotation {
    frames: Vec<KeyFrame>,
}

impl KeyFrameAnnotation {
    pub fn new(frames: Vec<KeyFrame>) -> Result<Self, AnnotationError> {
        if frames.len() < 2 {
            return Err(AnnotationError::invalid(format!(
                "need at least 2 key frames, got {}",
                frames.len()
            )));
        }
        for pair in frames.windows(2) {
            if pair[1].frame <= pair[0].frame {
                return Err(AnnotationError::invalid(format!(
                    "key frame indices must be strictly increasing ({} then {})",
                    pair[0].frame, pair[1].frame
                )));
            }
        }
        for key in &frames {
            key.bbox.validate().map_err(|e| {
                AnnotationError::invalid(format!("key frame {}: {}", key.frame, e))
            })?;
        }
        Ok(Self { frames })
    }

    /// Check every key frame lies inside a video of `total_frames` frames
    pub fn validate_against(&self, total_frames: u64) -> Result<(), AnnotationError> {
        let last = self.last_frame();
        if last >= total_frames {
            return Err(AnnotationError::invalid(format!(
                "key frame {} is beyond the last frame of a {}-frame video",
                last, total_frames
            )));
        }
        Ok(())
    }

    pub fn key_frames(&self) -> &[KeyFrame] {
        &self.frames
    }

    pub fn first_frame(&self) -> u64 {
        self.frames[0].frame
    }

    pub fn last_frame(&self) -> u64 {
        self.frames[self.frames.len() - 1].frame
    }

    /// Box for `frame`.
    ///
    /// Key frames are returned unchanged. Frames between two key frames are
    /// blended linearly with weight `(frame - lower) / (upper - lower)`.
    /// Frames before the first or after the last key frame get the nearest
    /// key frame's box; there is no extrapolation.
    pub fn interpolate(&self, frame: u64) -> BoundingBox {
        match self.frames.binary_search_by_key(&frame, |k| k.frame) {
            Ok(i) => self.frames[i].bbox,
            Err(0) => self.frames[0].bbox,
            Err(i) if i == self.frames.len() => self.frames[i - 1].bbox,
            Err(i) => {
                let lower = &self.frames[i - 1];
                let upper = &self.frames[i];
                let t = (frame - lower.frame) as f64 / (upper.frame - lower.frame) as f64;
                lower.bbox.lerp(&upper.bbox, t)
            }
        }
    }

    /// Boxes for every frame from the first to the last key frame, inclusive
    pub fn interpolate_range(&self) -> Vec<(u64, BoundingBox)> {
        (self.first_frame()..=self.last_frame())
            .map(|f| (f, self.interpolate(f)))
            .collect()
    }

    /// Boxes for every frame of a `total_frames`-frame video, clamping outside
    /// the annotated range
    pub fn interpolate_all(&self, total_frames: u64) -> Vec<(u64, BoundingBox)> {
        (0..total_frames).map(|f| (f, self.interpolate(f))).collect()
    }
}
