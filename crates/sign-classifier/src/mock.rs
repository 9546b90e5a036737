//! Mock classifier for development and tests

use crate::{ClassifierError, ClassifierOutput, SignClassifier};
use image::RgbImage;

/// Deterministic stand-in for a trained model.
///
/// Confidence in `true_label` follows a logistic curve of the image's mean
/// luminance: bright signs are recognised, dark ones drift to `decoy_label`.
/// A large enough shadow therefore flips the prediction, which is all the
/// attack search needs from a model during testing.
#[derive(Debug, Clone)]
pub struct LuminanceClassifier {
    true_label: usize,
    decoy_label: usize,
    num_classes: usize,
    /// Luminance (0..1) at which both labels are equally likely
    midpoint: f32,
    sharpness: f32,
}

impl LuminanceClassifier {
    pub fn new(true_label: usize, decoy_label: usize, num_classes: usize) -> Result<Self, ClassifierError> {
        if true_label >= num_classes || decoy_label >= num_classes || true_label == decoy_label {
            return Err(ClassifierError::ModelLoad(format!(
                "mock labels {} and {} must be distinct and below {}",
                true_label, decoy_label, num_classes
            )));
        }
        Ok(Self {
            true_label,
            decoy_label,
            num_classes,
            midpoint: 0.5,
            sharpness: 10.0,
        })
    }

    pub fn with_midpoint(mut self, midpoint: f32) -> Self {
        self.midpoint = midpoint;
        self
    }

    pub fn with_sharpness(mut self, sharpness: f32) -> Self {
        self.sharpness = sharpness;
        self
    }

    fn mean_luminance(image: &RgbImage) -> f32 {
        let total: f64 = image
            .pixels()
            .map(|p| 0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64)
            .sum();
        (total / (image.width() as f64 * image.height() as f64) / 255.0) as f32
    }
}

impl SignClassifier for LuminanceClassifier {
    fn classify(&self, image: &RgbImage) -> Result<ClassifierOutput, ClassifierError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ClassifierError::InvalidInput("empty image".into()));
        }

        let luminance = Self::mean_luminance(image);
        let p_true = 1.0 / (1.0 + (-(luminance - self.midpoint) * self.sharpness).exp());

        let mut scores = vec![0.0; self.num_classes];
        scores[self.true_label] = p_true;
        scores[self.decoy_label] = 1.0 - p_true;

        ClassifierOutput::from_scores(scores)
            .ok_or_else(|| ClassifierError::Inference("empty output".into()))
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_bright_sign_is_recognised() {
        let classifier = LuminanceClassifier::new(2, 0, 4).unwrap();
        let white = RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]));

        let out = classifier.classify(&white).unwrap();
        assert_eq!(out.predicted_label, 2);
        assert!(out.confidence() > 0.99);
        assert_eq!(out.scores.len(), 4);
    }

    #[test]
    fn test_dark_sign_flips() {
        let classifier = LuminanceClassifier::new(2, 0, 4).unwrap();
        let dark = RgbImage::from_pixel(8, 8, Rgb([40, 40, 40]));

        let out = classifier.classify(&dark).unwrap();
        assert_eq!(out.predicted_label, 0);
    }

    #[test]
    fn test_invalid_labels() {
        assert!(LuminanceClassifier::new(1, 1, 2).is_err());
        assert!(LuminanceClassifier::new(0, 5, 2).is_err());
    }

    #[test]
    fn test_empty_image_rejected() {
        let classifier = LuminanceClassifier::new(1, 0, 2).unwrap();
        let err = classifier.classify(&RgbImage::new(0, 0)).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }
}
