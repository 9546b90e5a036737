//! ONNX classifier backed by tract

use crate::{softmax, ChannelOrder, ClassifierConfig, ClassifierError, ClassifierOutput, SignClassifier};
use image::RgbImage;
use sign_frame::resize;
use std::path::Path;
use tracing::{debug, info};
use tract_onnx::prelude::*;

type Plan = TypedRunnableModel<TypedModel>;

/// Pretrained sign classifier loaded from an ONNX file.
///
/// Inputs are resized to the model resolution and fed as a `1x3xHxW` tensor
/// scaled to `[0, 1]`; logits are turned into probabilities with softmax.
pub struct OnnxClassifier {
    plan: Plan,
    input_width: u32,
    input_height: u32,
    channel_order: ChannelOrder,
    num_classes: usize,
}

impl OnnxClassifier {
    /// Load the model named by `config.model_path`
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let path = config
            .model_path
            .as_deref()
            .ok_or_else(|| ClassifierError::ModelLoad("no model path configured".into()))?;
        Self::load(path, config)
    }

    pub fn load(path: &Path, config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        if config.input_width == 0 || config.input_height == 0 {
            return Err(ClassifierError::ModelLoad(format!(
                "invalid input size {}x{}",
                config.input_width, config.input_height
            )));
        }
        info!("Loading sign classifier from {}", path.display());

        let shape = [1, 3, config.input_height as usize, config.input_width as usize];
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact(shape).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| ClassifierError::ModelLoad(format!("{}: {}", path.display(), e)))?;

        let mut classifier = Self {
            plan,
            input_width: config.input_width,
            input_height: config.input_height,
            channel_order: config.channel_order,
            num_classes: 0,
        };

        // Run a blank input once so the class count is known before the first real query
        let blank = RgbImage::new(config.input_width, config.input_height);
        classifier.num_classes = classifier.logits(&blank)?.len();
        if classifier.num_classes == 0 {
            return Err(ClassifierError::ModelLoad("model produces no outputs".into()));
        }
        info!(
            "Classifier ready: {}x{} input, {} classes",
            config.input_width, config.input_height, classifier.num_classes
        );
        Ok(classifier)
    }

    fn to_tensor(&self, image: &RgbImage) -> Tensor {
        let resized = resize(image, self.input_width, self.input_height);
        let (h, w) = (self.input_height as usize, self.input_width as usize);
        let order = match self.channel_order {
            ChannelOrder::Rgb => [0, 1, 2],
            ChannelOrder::Bgr => [2, 1, 0],
        };
        tract_ndarray::Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| {
            resized.get_pixel(x as u32, y as u32)[order[c]] as f32 / 255.0
        })
        .into()
    }

    fn logits(&self, image: &RgbImage) -> Result<Vec<f32>, ClassifierError> {
        let input = self.to_tensor(image);
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        let view = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        Ok(view.iter().copied().collect())
    }
}

impl SignClassifier for OnnxClassifier {
    fn classify(&self, image: &RgbImage) -> Result<ClassifierOutput, ClassifierError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ClassifierError::InvalidInput(format!(
                "empty image {}x{}",
                image.width(),
                image.height()
            )));
        }

        let logits = self.logits(image)?;
        if logits.len() != self.num_classes {
            return Err(ClassifierError::Inference(format!(
                "expected {} logits, got {}",
                self.num_classes,
                logits.len()
            )));
        }

        let output = ClassifierOutput::from_scores(softmax(&logits))
            .ok_or_else(|| ClassifierError::Inference("empty output".into()))?;
        debug!(
            "Predicted {} ({:.4})",
            output.predicted_label,
            output.confidence()
        );
        Ok(output)
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}
