//! Traffic Sign Classifier Adapter
//!
//! Wraps a pretrained sign classifier behind the [`SignClassifier`] trait so
//! the attack search can treat it as an opaque `image -> scores` function.

mod config;
mod mock;
mod onnx;
mod output;

pub use config::{ChannelOrder, ClassifierConfig};
pub use mock::LuminanceClassifier;
pub use onnx::OnnxClassifier;
pub use output::{softmax, ClassifierOutput};

use image::RgbImage;
use thiserror::Error;

/// Errors during classifier setup or inference
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Model load failed: {0}")]
    ModelLoad(String),
    #[error("Invalid input image: {0}")]
    InvalidInput(String),
    #[error("Inference failed: {0}")]
    Inference(String),
}

impl ClassifierError {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifierError::ModelLoad(_) => "model_load",
            ClassifierError::InvalidInput(_) => "invalid_input",
            ClassifierError::Inference(_) => "inference",
        }
    }
}

/// A classifier mapping an RGB sign crop to per-class confidences.
///
/// Implementations must not keep per-call state: the same image always
/// yields the same output, and one instance may be shared across threads.
pub trait SignClassifier: Send + Sync {
    /// Classify a single image
    fn classify(&self, image: &RgbImage) -> Result<ClassifierOutput, ClassifierError>;

    /// Number of classes in every [`ClassifierOutput`]
    fn num_classes(&self) -> usize;
}

impl<C: SignClassifier + ?Sized> SignClassifier for std::sync::Arc<C> {
    fn classify(&self, image: &RgbImage) -> Result<ClassifierOutput, ClassifierError> {
        (**self).classify(image)
    }

    fn num_classes(&self) -> usize {
        (**self).num_classes()
    }
}
