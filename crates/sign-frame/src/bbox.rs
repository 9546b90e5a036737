//! Axis-aligned bounding boxes

use crate::FrameError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned rectangle `[x_min, x_max) x [y_min, y_max)`
///
/// Units are whatever the producer uses: Label Studio exports percent of
/// the frame size, crops work in pixels. Use [`BoundingBox::to_pixels`] to
/// go from the former to the latter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    /// Create a box from its corners, checking `min < max` on both axes
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<Self, FrameError> {
        let bbox = Self {
            x_min,
            y_min,
            x_max,
            y_max,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Create a box from its origin and size
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Result<Self, FrameError> {
        Self::new(x, y, x + width, y + height)
    }

    /// Check the box is finite and non-degenerate
    pub fn validate(&self) -> Result<(), FrameError> {
        let coords = [self.x_min, self.y_min, self.x_max, self.y_max];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(FrameError::InvalidBox(format!("non-finite coordinate in {}", self)));
        }
        if self.x_min >= self.x_max || self.y_min >= self.y_max {
            return Err(FrameError::InvalidBox(format!("empty extent in {}", self)));
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Linear blend between two boxes, `t = 0` gives `self`, `t = 1` gives `other`
    pub fn lerp(&self, other: &BoundingBox, t: f64) -> BoundingBox {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        BoundingBox {
            x_min: mix(self.x_min, other.x_min),
            y_min: mix(self.y_min, other.y_min),
            x_max: mix(self.x_max, other.x_max),
            y_max: mix(self.y_max, other.y_max),
        }
    }

    /// Convert a percent-of-frame box into pixel coordinates
    pub fn to_pixels(&self, frame_width: u32, frame_height: u32) -> BoundingBox {
        let sx = frame_width as f64 / 100.0;
        let sy = frame_height as f64 / 100.0;
        BoundingBox {
            x_min: self.x_min * sx,
            y_min: self.y_min * sy,
            x_max: self.x_max * sx,
            y_max: self.y_max * sy,
        }
    }

    /// Integer pixel region `(x, y, w, h)` clipped to a `width x height` frame.
    ///
    /// Coordinates are truncated toward zero before clipping. Returns `None`
    /// when nothing of the box remains inside the frame.
    pub fn pixel_region(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let clip = |v: f64, hi: u32| -> u32 { v.trunc().clamp(0.0, hi as f64) as u32 };
        let x0 = clip(self.x_min, width);
        let y0 = clip(self.y_min, height);
        let x1 = clip(self.x_max, width);
        let y1 = clip(self.y_max, height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0, y0, x1 - x0, y1 - y0))
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.2}, {:.2}, {:.2}, {:.2}]",
            self.x_min, self.y_min, self.x_max, self.y_max
        )
    }
}
