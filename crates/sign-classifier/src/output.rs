//! Classifier output

use serde::{Deserialize, Serialize};

/// Prediction for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierOutput {
    /// Index of the highest scoring class
    pub predicted_label: usize,
    /// Per-class probabilities
    pub scores: Vec<f32>,
}

impl ClassifierOutput {
    /// Build from probabilities; ties resolve to the lowest class index.
    ///
    /// Returns `None` for an empty score vector.
    pub fn from_scores(scores: Vec<f32>) -> Option<Self> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &s) in scores.iter().enumerate() {
            match best {
                Some((_, b)) if s <= b => {}
                _ => best = Some((i, s)),
            }
        }
        best.map(|(predicted_label, _)| Self {
            predicted_label,
            scores,
        })
    }

    /// Confidence of the predicted class
    pub fn confidence(&self) -> f32 {
        self.score(self.predicted_label)
    }

    /// Confidence of `label`, zero for labels outside the output
    pub fn score(&self, label: usize) -> f32 {
        self.scores.get(label).copied().unwrap_or(0.0)
    }
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_argmax_prefers_lowest_index_on_tie() {
        let out = ClassifierOutput::from_scores(vec![0.1, 0.45, 0.45]).unwrap();
        assert_eq!(out.predicted_label, 1);
        assert_eq!(out.confidence(), 0.45);
        assert_eq!(out.score(7), 0.0);
        assert!(ClassifierOutput::from_scores(Vec::new()).is_none());
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1000.0, 1000.0, 998.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!((probs[0] - probs[1]).abs() < 1e-7);
        assert!(probs[2] < probs[0]);
    }

    proptest! {
        #[test]
        fn prop_softmax_is_distribution(logits in prop::collection::vec(-50.0f32..50.0, 1..20)) {
            let probs = softmax(&logits);
            let sum: f32 = probs.iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-4);
            prop_assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));

            let out = ClassifierOutput::from_scores(probs.clone()).unwrap();
            prop_assert!(probs.iter().all(|p| *p <= out.confidence()));
        }
    }
}
