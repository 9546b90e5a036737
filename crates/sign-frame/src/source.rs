//! Frame sources
//!
//! Video decoding is optional: with the `opencv` feature a video file is read
//! through `VideoCapture`, otherwise frames must be extracted up front into a
//! directory of numbered images.

use crate::frame::{load_image, Frame};
use crate::FrameError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Sequential source of decoded frames
pub trait FrameSource {
    /// Next frame in decode order, `None` at end of stream
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError>;

    /// Total frame count if the container reports one
    fn frame_count(&self) -> Option<u64>;
}

/// Frames pre-extracted into a directory as `<number>.<ext>`
///
/// Files are ordered by their numeric stem; the frame index is the position
/// in that order, so `1.jpg, 2.jpg, ...` as written by `ffmpeg -i v.mp4 %d.jpg`
/// maps to indices `0, 1, ...`. Files without a numeric stem are ignored.
pub struct DirectoryFrames {
    files: Vec<PathBuf>,
    next_index: usize,
}

impl DirectoryFrames {
    pub fn open(dir: &Path) -> Result<Self, FrameError> {
        let entries = std::fs::read_dir(dir).map_err(|source| FrameError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut numbered = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| FrameError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let number = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok());
            match number {
                Some(n) => numbered.push((n, path)),
                None => debug!("Skipping non-frame file {}", path.display()),
            }
        }
        numbered.sort_by_key(|(n, _)| *n);

        info!("Found {} extracted frames in {}", numbered.len(), dir.display());
        Ok(Self {
            files: numbered.into_iter().map(|(_, p)| p).collect(),
            next_index: 0,
        })
    }
}

impl FrameSource for DirectoryFrames {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        let Some(path) = self.files.get(self.next_index) else {
            return Ok(None);
        };
        let image = load_image(path)?;
        let frame = Frame::new(self.next_index as u64, image);
        self.next_index += 1;
        Ok(Some(frame))
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.files.len() as u64)
    }
}

#[cfg(feature = "opencv")]
pub use video::VideoFrames;

#[cfg(feature = "opencv")]
mod video {
    use super::*;
    use image::RgbImage;
    use opencv::{core, imgproc, prelude::*, videoio};

    /// Video file decoded with OpenCV
    pub struct VideoFrames {
        capture: videoio::VideoCapture,
        frame_count: Option<u64>,
        next_index: u64,
    }

    fn video_err(e: opencv::Error) -> FrameError {
        FrameError::Video(e.to_string())
    }

    impl VideoFrames {
        pub fn open(path: &Path) -> Result<Self, FrameError> {
            let name = path
                .to_str()
                .ok_or_else(|| FrameError::Video(format!("non UTF-8 path {}", path.display())))?;
            let capture = videoio::VideoCapture::from_file(name, videoio::CAP_ANY).map_err(video_err)?;
            if !capture.is_opened().map_err(video_err)? {
                return Err(FrameError::Video(format!("cannot open {}", path.display())));
            }

            let frame_count = capture
                .get(videoio::CAP_PROP_FRAME_COUNT)
                .ok()
                .filter(|c| *c > 0.0)
                .map(|c| c as u64);
            info!("Opened video {} ({:?} frames)", path.display(), frame_count);

            Ok(Self {
                capture,
                frame_count,
                next_index: 0,
            })
        }
    }

    impl FrameSource for VideoFrames {
        fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
            let mut bgr = core::Mat::default();
            if !self.capture.read(&mut bgr).map_err(video_err)? || bgr.empty() {
                return Ok(None);
            }

            let mut rgb = core::Mat::default();
            imgproc::cvt_color(
                &bgr,
                &mut rgb,
                imgproc::COLOR_BGR2RGB,
                0,
                core::AlgorithmHint::ALGO_HINT_DEFAULT,
            )
            .map_err(video_err)?;

            let size = rgb.size().map_err(video_err)?;
            let data = rgb.data_bytes().map_err(video_err)?.to_vec();
            let image = RgbImage::from_raw(size.width as u32, size.height as u32, data)
                .ok_or_else(|| FrameError::Video("frame buffer size mismatch".into()))?;

            let frame = Frame::new(self.next_index, image);
            self.next_index += 1;
            Ok(Some(frame))
        }

        fn frame_count(&self) -> Option<u64> {
            self.frame_count
        }
    }
}
