//! Classifier configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Channel layout the model was trained on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    Rgb,
    /// OpenCV-loaded training data
    Bgr,
}

/// Classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// ONNX model path
    pub model_path: Option<PathBuf>,

    /// Model input width (pixels)
    pub input_width: u32,

    /// Model input height (pixels)
    pub input_height: u32,

    /// Channel order of the model input tensor
    pub channel_order: ChannelOrder,

    /// Human readable class names, indexed by label
    pub class_names: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            input_width: 32,
            input_height: 32,
            channel_order: ChannelOrder::Bgr,
            class_names: Vec::new(),
        }
    }
}

impl ClassifierConfig {
    /// Name of `label`, or its index when no name is configured
    pub fn class_name(&self, label: usize) -> String {
        self.class_names
            .get(label)
            .cloned()
            .unwrap_or_else(|| label.to_string())
    }
}
