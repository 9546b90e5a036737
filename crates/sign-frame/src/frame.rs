//! Frame types and image processing helpers

use crate::{BoundingBox, FrameError};
use image::imageops::{self, FilterType};
use image::{ImageError, RgbImage};
use std::path::Path;
use tracing::debug;

/// A decoded RGB frame and its position in the video
#[derive(Debug, Clone)]
pub struct Frame {
    /// Zero-based frame index
    pub index: u64,
    /// RGB pixel data
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Load an image from disk as 8-bit RGB
pub fn load_image(path: &Path) -> Result<RgbImage, FrameError> {
    let img = image::open(path).map_err(|e| match e {
        ImageError::IoError(source) => FrameError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => FrameError::Decode {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    })?;
    let rgb = img.to_rgb8();
    debug!("Loaded {} ({}x{})", path.display(), rgb.width(), rgb.height());
    Ok(rgb)
}

/// Save an image, the format is picked from the file extension
pub fn save_image(image: &RgbImage, path: &Path) -> Result<(), FrameError> {
    image.save(path).map_err(|e| match e {
        ImageError::IoError(source) => FrameError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => FrameError::Encode {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    })
}

/// Crop a pixel-space bounding box out of an image.
///
/// The box is clipped to the image; a box with nothing left inside the
/// image is an error.
pub fn crop(image: &RgbImage, bbox: &BoundingBox) -> Result<RgbImage, FrameError> {
    bbox.validate()?;
    let (x, y, w, h) = bbox
        .pixel_region(image.width(), image.height())
        .ok_or_else(|| FrameError::EmptyCrop(bbox.to_string(), image.width(), image.height()))?;
    Ok(imageops::crop_imm(image, x, y, w, h).to_image())
}

/// Resize with bilinear filtering
pub fn resize(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    if image.width() == width && image.height() == height {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 0]))
    }

    #[test]
    fn test_crop_region() {
        let img = gradient(64, 48);
        let bbox = BoundingBox::new(10.0, 5.0, 30.0, 25.0).unwrap();
        let cropped = crop(&img, &bbox).unwrap();

        assert_eq!(cropped.dimensions(), (20, 20));
        assert_eq!(cropped.get_pixel(0, 0), &Rgb([10, 5, 0]));
        assert_eq!(cropped.get_pixel(19, 19), &Rgb([29, 24, 0]));
    }

    #[test]
    fn test_crop_outside_frame_fails() {
        let img = gradient(32, 32);
        let bbox = BoundingBox::new(40.0, 40.0, 50.0, 50.0).unwrap();
        assert!(matches!(crop(&img, &bbox), Err(FrameError::EmptyCrop(..))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let img = gradient(16, 8);

        save_image(&img, &path).unwrap();
        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded, img);
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let err = load_image(&path).unwrap_err();
        assert_eq!(err.kind(), "decode");
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_image(Path::new("/nonexistent/0.jpg")).unwrap_err();
        assert_eq!(err.kind(), "io");
    }
}
