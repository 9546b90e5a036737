//! Adversarial Shadow Attack
//!
//! Searches for a polygon-shaped shadow that makes a traffic sign classifier
//! mispredict once composited onto the sign:
//! - Shadow polygons and their plausibility bounds
//! - Shadow rasterisation and compositing
//! - Seeded particle swarm search against any [`SignClassifier`]
//!
//! [`SignClassifier`]: sign_classifier::SignClassifier

pub mod config;
pub mod polygon;
pub mod search;
pub mod shadow;

pub use config::{AttackConfig, MAX_EDGE_BLUR_SIGMA};
pub use polygon::ShadowPolygon;
pub use search::{AttackOutcome, AttackResult, ShadowAttack};
pub use shadow::{apply_shadow, shadow_mask};

use sign_classifier::ClassifierError;
use thiserror::Error;

/// Attack error types.
///
/// Not finding an adversarial shadow is not an error; it is reported through
/// [`AttackResult::success`].
#[derive(Error, Debug)]
pub enum AttackError {
    #[error("Invalid attack configuration: {0}")]
    InvalidConfiguration(String),

    /// The classifier could not be loaded or invoked
    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(#[source] ClassifierError),

    /// The classifier rejected the image it was given
    #[error("Classifier rejected the input: {0}")]
    InvalidInput(#[source] ClassifierError),
}

impl AttackError {
    /// Underlying classifier error, if any
    pub fn classifier_error(&self) -> Option<&ClassifierError> {
        match self {
            AttackError::InvalidConfiguration(_) => None,
            AttackError::ClassifierUnavailable(e) | AttackError::InvalidInput(e) => Some(e),
        }
    }
}

impl From<ClassifierError> for AttackError {
    fn from(e: ClassifierError) -> Self {
        match e {
            ClassifierError::InvalidInput(_) => AttackError::InvalidInput(e),
            ClassifierError::ModelLoad(_) | ClassifierError::Inference(_) => {
                AttackError::ClassifierUnavailable(e)
            }
        }
    }
}
