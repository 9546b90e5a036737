//! Particle swarm search for adversarial shadows
//!
//! ## Algorithm
//!
//! 1. **Clean query**: classify the unmodified sign; if it is already
//!    misclassified there is nothing to attack
//! 2. **Initialisation**: sample `population` polygons uniformly inside the
//!    plausibility bounds
//! 3. **Evaluation**: composite each candidate and score it by the
//!    classifier's confidence in the true class (or the distance from the
//!    target class); lower is fitter
//! 4. **Early exit**: stop as soon as a candidate flips the prediction
//! 5. **Update**: move every candidate toward its own best and the swarm's
//!    best position, with random weights, then clip back into bounds
//!
//! Every random draw comes from the generator passed to
//! [`ShadowAttack::run`], so a seed fully determines the result.

use crate::{apply_shadow, shadow_mask, AttackConfig, AttackError, ShadowPolygon};
use image::{GrayImage, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sign_classifier::{ClassifierOutput, SignClassifier};
use tracing::{debug, info};

/// How an attack attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackOutcome {
    /// A shadow flipped the prediction
    Success,
    /// The iteration budget ran out
    Exhausted,
    /// The clean image was already misclassified, no search was run
    CleanMisclassified,
}

/// Result of one attack attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackResult {
    /// Prediction on the clean image
    pub original_label: usize,
    /// Prediction on the reported (shadowed) image
    pub perturbed_label: usize,
    pub success: bool,
    pub outcome: AttackOutcome,
    /// Confidence of `perturbed_label` on the reported image
    pub confidence: f32,
    /// Confidence of the ground-truth class on the reported image
    pub true_class_confidence: f32,
    /// Swarm iterations evaluated
    pub iterations: usize,
    /// Classifier calls, including the clean query
    pub queries: usize,
    /// Winning polygon on success, best found otherwise; `None` means the
    /// unperturbed image was never beaten
    pub polygon: Option<ShadowPolygon>,
}

/// Box constraints of the flat `[x0, y0, ..., darkness]` search vector
struct SearchSpace {
    lower: Vec<f32>,
    upper: Vec<f32>,
    max_velocity: Vec<f32>,
    max_area: f32,
}

impl SearchSpace {
    fn new(config: &AttackConfig, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        let (mx, my) = (config.vertex_margin * w, config.vertex_margin * h);

        let mut lower = Vec::with_capacity(config.vertex_count * 2 + 1);
        let mut upper = Vec::with_capacity(config.vertex_count * 2 + 1);
        for _ in 0..config.vertex_count {
            lower.extend([-mx, -my]);
            upper.extend([w + mx, h + my]);
        }
        lower.push(config.darkness_range.0);
        upper.push(config.darkness_range.1);

        let max_velocity = lower
            .iter()
            .zip(&upper)
            .map(|(lo, hi)| (hi - lo) * config.max_velocity_ratio)
            .collect();

        Self {
            lower,
            upper,
            max_velocity,
            max_area: config.max_area_ratio * w * h,
        }
    }

    fn dims(&self) -> usize {
        self.lower.len()
    }

    fn sample_position<R: Rng>(&self, rng: &mut R) -> Vec<f32> {
        self.lower
            .iter()
            .zip(&self.upper)
            .map(|(lo, hi)| lo + (hi - lo) * rng.random::<f32>())
            .collect()
    }

    fn sample_velocity<R: Rng>(&self, rng: &mut R) -> Vec<f32> {
        self.max_velocity
            .iter()
            .map(|v| v * (2.0 * rng.random::<f32>() - 1.0))
            .collect()
    }

    /// Project a position back into the plausibility bounds
    fn clip(&self, position: &mut [f32]) {
        for ((p, lo), hi) in position.iter_mut().zip(&self.lower).zip(&self.upper) {
            *p = p.clamp(*lo, *hi);
        }

        let mut polygon = ShadowPolygon::from_params(position);
        polygon.untangle();
        let area = polygon.area();
        if area > self.max_area {
            // The vertex box is convex, so shrinking toward the vertex mean
            // keeps every vertex inside it
            polygon.scale((self.max_area / area).sqrt());
        }
        position.copy_from_slice(&polygon.to_params());
    }
}

struct Particle {
    position: Vec<f32>,
    velocity: Vec<f32>,
    best_position: Vec<f32>,
    best_objective: f32,
}

/// Best evaluation seen so far
struct Candidate {
    polygon: Option<ShadowPolygon>,
    output: ClassifierOutput,
    objective: f32,
}

/// Shadow attack against one classifier
pub struct ShadowAttack<'a, C: SignClassifier + ?Sized> {
    classifier: &'a C,
    config: AttackConfig,
    region: Option<&'a GrayImage>,
}

impl<'a, C: SignClassifier + ?Sized> ShadowAttack<'a, C> {
    pub fn new(classifier: &'a C, config: AttackConfig) -> Result<Self, AttackError> {
        config.validate()?;
        Ok(Self {
            classifier,
            config,
            region: None,
        })
    }

    /// Restrict shadows to the sign surface, non-zero mask pixels are sign
    pub fn with_region(mut self, region: &'a GrayImage) -> Self {
        self.region = Some(region);
        self
    }

    pub fn config(&self) -> &AttackConfig {
        &self.config
    }

    /// Composite `polygon` onto `image` the same way candidates are scored
    pub fn render(&self, image: &RgbImage, polygon: &ShadowPolygon) -> RgbImage {
        let mask = shadow_mask(
            polygon,
            image.width(),
            image.height(),
            self.region,
            self.config.edge_blur_sigma,
        );
        apply_shadow(image, &mask, polygon.darkness)
    }

    /// [`ShadowAttack::run`] with a fresh generator seeded from `seed`
    pub fn run_seeded(
        &self,
        image: &RgbImage,
        ground_truth: usize,
        target: Option<usize>,
        seed: u64,
    ) -> Result<AttackResult, AttackError> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.run(image, ground_truth, target, &mut rng)
    }

    /// Search for a shadow that makes the classifier mispredict `image`.
    ///
    /// Untargeted when `target` is `None`: any label other than
    /// `ground_truth` counts. Targeted: the prediction must become `target`.
    /// If several candidates succeed in the same iteration, the one with the
    /// lowest objective wins and exact ties go to the lowest candidate index.
    pub fn run<R: Rng>(
        &self,
        image: &RgbImage,
        ground_truth: usize,
        target: Option<usize>,
        rng: &mut R,
    ) -> Result<AttackResult, AttackError> {
        self.check_inputs(image, ground_truth, target)?;

        let goal = Goal {
            ground_truth,
            target,
        };
        let clean = self.classifier.classify(image)?;
        let mut queries = 1;
        let original_label = clean.predicted_label;

        if goal.is_adversarial(&clean) {
            info!(
                "Clean image already predicted as {} (ground truth {}), skipping search",
                original_label, ground_truth
            );
            return Ok(goal.report(
                original_label,
                AttackOutcome::CleanMisclassified,
                Candidate {
                    polygon: None,
                    objective: goal.objective(&clean),
                    output: clean,
                },
                0,
                queries,
            ));
        }

        let mut best = Candidate {
            objective: goal.objective(&clean),
            output: clean,
            polygon: None,
        };
        if self.config.max_iterations == 0 {
            return Ok(goal.report(original_label, AttackOutcome::Exhausted, best, 0, queries));
        }

        let space = SearchSpace::new(&self.config, image.width(), image.height());
        let mut swarm: Vec<Particle> = (0..self.config.population)
            .map(|_| {
                let mut position = space.sample_position(rng);
                let velocity = space.sample_velocity(rng);
                space.clip(&mut position);
                Particle {
                    best_position: position.clone(),
                    position,
                    velocity,
                    best_objective: f32::INFINITY,
                }
            })
            .collect();

        for iteration in 0..self.config.max_iterations {
            let mut winner: Option<Candidate> = None;

            for particle in swarm.iter_mut() {
                let polygon = ShadowPolygon::from_params(&particle.position);
                let output = self.classifier.classify(&self.render(image, &polygon))?;
                queries += 1;
                let objective = goal.objective(&output);

                if objective < particle.best_objective {
                    particle.best_objective = objective;
                    particle.best_position.copy_from_slice(&particle.position);
                }
                if goal.is_adversarial(&output)
                    && winner.as_ref().map_or(true, |w| objective < w.objective)
                {
                    winner = Some(Candidate {
                        polygon: Some(polygon.clone()),
                        output: output.clone(),
                        objective,
                    });
                }
                if objective < best.objective {
                    best = Candidate {
                        polygon: Some(polygon),
                        output,
                        objective,
                    };
                }
            }

            if let Some(winner) = winner {
                info!(
                    "Shadow attack succeeded after {} iterations: {} -> {} ({:.4})",
                    iteration + 1,
                    original_label,
                    winner.output.predicted_label,
                    winner.output.confidence()
                );
                return Ok(goal.report(
                    original_label,
                    AttackOutcome::Success,
                    winner,
                    iteration + 1,
                    queries,
                ));
            }

            let global_best = swarm
                .iter()
                .min_by(|a, b| a.best_objective.total_cmp(&b.best_objective))
                .map(|p| p.best_position.clone())
                .unwrap_or_default();
            debug!("Iteration {}: best objective {:.4}", iteration + 1, best.objective);

            for particle in swarm.iter_mut() {
                for d in 0..space.dims() {
                    let r1: f32 = rng.random();
                    let r2: f32 = rng.random();
                    let x = particle.position[d];
                    let v = self.config.inertia * particle.velocity[d]
                        + self.config.cognitive * r1 * (particle.best_position[d] - x)
                        + self.config.social * r2 * (global_best[d] - x);
                    let limit = space.max_velocity[d];
                    particle.velocity[d] = v.clamp(-limit, limit);
                    particle.position[d] = x + particle.velocity[d];
                }
                space.clip(&mut particle.position);
            }
        }

        info!(
            "Shadow attack exhausted {} iterations, best true-class confidence {:.4}",
            self.config.max_iterations,
            best.output.score(ground_truth)
        );
        Ok(goal.report(
            original_label,
            AttackOutcome::Exhausted,
            best,
            self.config.max_iterations,
            queries,
        ))
    }

    fn check_inputs(
        &self,
        image: &RgbImage,
        ground_truth: usize,
        target: Option<usize>,
    ) -> Result<(), AttackError> {
        let num_classes = self.classifier.num_classes();
        if ground_truth >= num_classes {
            return Err(AttackError::InvalidConfiguration(format!(
                "ground truth label {} outside the classifier's {} classes",
                ground_truth, num_classes
            )));
        }
        if let Some(target) = target {
            if target >= num_classes || target == ground_truth {
                return Err(AttackError::InvalidConfiguration(format!(
                    "target label {} must differ from {} and be below {}",
                    target, ground_truth, num_classes
                )));
            }
        }
        if let Some(region) = self.region {
            if region.dimensions() != image.dimensions() {
                return Err(AttackError::InvalidConfiguration(format!(
                    "sign region is {:?} but image is {:?}",
                    region.dimensions(),
                    image.dimensions()
                )));
            }
        }
        Ok(())
    }
}

struct Goal {
    ground_truth: usize,
    target: Option<usize>,
}

impl Goal {
    /// Lower is better for the attacker
    fn objective(&self, output: &ClassifierOutput) -> f32 {
        match self.target {
            Some(target) => 1.0 - output.score(target),
            None => output.score(self.ground_truth),
        }
    }

    fn is_adversarial(&self, output: &ClassifierOutput) -> bool {
        match self.target {
            Some(target) => output.predicted_label == target,
            None => output.predicted_label != self.ground_truth,
        }
    }

    fn report(
        &self,
        original_label: usize,
        outcome: AttackOutcome,
        candidate: Candidate,
        iterations: usize,
        queries: usize,
    ) -> AttackResult {
        AttackResult {
            original_label,
            perturbed_label: candidate.output.predicted_label,
            success: outcome == AttackOutcome::Success,
            outcome,
            confidence: candidate.output.confidence(),
            true_class_confidence: candidate.output.score(self.ground_truth),
            iterations,
            queries,
            polygon: candidate.polygon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};
    use sign_classifier::{ClassifierError, LuminanceClassifier};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const STOP: usize = 0;
    const DECOY: usize = 1;

    fn white_sign() -> RgbImage {
        RgbImage::from_pixel(32, 32, Rgb([255, 255, 255]))
    }

    fn config(max_iterations: usize) -> AttackConfig {
        AttackConfig {
            max_iterations,
            population: 10,
            darkness_range: (0.3, 0.7),
            edge_blur_sigma: 0.0,
            ..Default::default()
        }
    }

    /// Easy to fool: a modest shadow drops mean luminance below 0.9
    fn fragile() -> LuminanceClassifier {
        LuminanceClassifier::new(STOP, DECOY, 2).unwrap().with_midpoint(0.9)
    }

    /// Impossible to fool within the area and darkness bounds
    fn robust() -> LuminanceClassifier {
        LuminanceClassifier::new(STOP, DECOY, 2).unwrap().with_midpoint(0.2)
    }

    struct Unavailable;

    impl SignClassifier for Unavailable {
        fn classify(&self, _image: &RgbImage) -> Result<ClassifierOutput, ClassifierError> {
            Err(ClassifierError::Inference("device lost".into()))
        }

        fn num_classes(&self) -> usize {
            2
        }
    }

    struct RejectsInput;

    impl SignClassifier for RejectsInput {
        fn classify(&self, _image: &RgbImage) -> Result<ClassifierOutput, ClassifierError> {
            Err(ClassifierError::InvalidInput("unexpected shape".into()))
        }

        fn num_classes(&self) -> usize {
            2
        }
    }

    /// Recognises the first image it sees, then mispredicts everything with
    /// identical confidence
    struct FlipAfterFirst {
        calls: AtomicUsize,
    }

    impl SignClassifier for FlipAfterFirst {
        fn classify(&self, _image: &RgbImage) -> Result<ClassifierOutput, ClassifierError> {
            let scores = if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                vec![0.9, 0.1]
            } else {
                vec![0.4, 0.6]
            };
            Ok(ClassifierOutput::from_scores(scores).unwrap())
        }

        fn num_classes(&self) -> usize {
            2
        }
    }

    /// Recognises the first image, then mispredicts every candidate; the
    /// candidate answering call `best_call` gets the lowest true-class score
    struct LowestAtCall {
        calls: AtomicUsize,
        best_call: usize,
    }

    impl SignClassifier for LowestAtCall {
        fn classify(&self, _image: &RgbImage) -> Result<ClassifierOutput, ClassifierError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let scores = match call {
                0 => vec![0.9, 0.1],
                c if c == self.best_call => vec![0.1, 0.9],
                _ => vec![0.4, 0.6],
            };
            Ok(ClassifierOutput::from_scores(scores).unwrap())
        }

        fn num_classes(&self) -> usize {
            2
        }
    }

    /// Initial clipped position of particle `index` for `seed`
    fn initial_position(cfg: &AttackConfig, seed: u64, index: usize) -> Vec<f32> {
        let space = SearchSpace::new(cfg, 32, 32);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut position = Vec::new();
        for _ in 0..=index {
            position = space.sample_position(&mut rng);
            let _velocity = space.sample_velocity(&mut rng);
            space.clip(&mut position);
        }
        position
    }

    fn covered_pixels(polygon: &ShadowPolygon, width: u32, height: u32) -> usize {
        shadow_mask(polygon, width, height, None, 0.0)
            .pixels()
            .filter(|p| p[0] > 0)
            .count()
    }

    #[test]
    fn test_fragile_sign_is_fooled() {
        let classifier = fragile();
        let attack = ShadowAttack::new(&classifier, config(100)).unwrap();
        let result = attack.run_seeded(&white_sign(), STOP, None, 42).unwrap();

        assert!(result.success);
        assert_eq!(result.outcome, AttackOutcome::Success);
        assert_eq!(result.original_label, STOP);
        assert_eq!(result.perturbed_label, DECOY);
        assert!(result.iterations >= 1 && result.iterations <= 100);

        let polygon = result.polygon.clone().unwrap();
        assert_eq!(polygon.vertices.len(), 3);
        assert!(polygon.darkness >= 0.3 && polygon.darkness <= 0.7);
        assert!(polygon.area() <= 0.5 * 32.0 * 32.0 + 1e-2);

        // The reported polygon reproduces the misclassification
        let shaded = attack.render(&white_sign(), &polygon);
        assert_eq!(classifier.classify(&shaded).unwrap().predicted_label, DECOY);
    }

    #[test]
    fn test_robust_sign_exhausts_budget() {
        let classifier = robust();
        let attack = ShadowAttack::new(&classifier, config(5)).unwrap();
        let result = attack.run_seeded(&white_sign(), STOP, None, 42).unwrap();

        assert!(!result.success);
        assert_eq!(result.outcome, AttackOutcome::Exhausted);
        assert_eq!(result.iterations, 5);
        assert_eq!(result.queries, 1 + 5 * 10);
        assert_eq!(result.perturbed_label, STOP);

        let clean = classifier.classify(&white_sign()).unwrap();
        assert!(result.polygon.is_some());
        assert!(result.true_class_confidence < clean.score(STOP));
    }

    #[test]
    fn test_same_seed_same_result() {
        let classifier = fragile();
        let attack = ShadowAttack::new(&classifier, config(100)).unwrap();
        let image = white_sign();

        let first = attack.run_seeded(&image, STOP, None, 42).unwrap();
        let second = attack.run_seeded(&image, STOP, None, 42).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );

        let classifier = robust();
        let attack = ShadowAttack::new(&classifier, config(8)).unwrap();
        let first = attack.run_seeded(&image, STOP, None, 7).unwrap();
        let second = attack.run_seeded(&image, STOP, None, 7).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_iterations_returns_unperturbed() {
        let classifier = fragile();
        let attack = ShadowAttack::new(&classifier, config(0)).unwrap();
        let result = attack.run_seeded(&white_sign(), STOP, None, 42).unwrap();

        let clean = classifier.classify(&white_sign()).unwrap();
        assert!(!result.success);
        assert_eq!(result.outcome, AttackOutcome::Exhausted);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.queries, 1);
        assert_eq!(result.polygon, None);
        assert_eq!(result.perturbed_label, STOP);
        assert_eq!(result.true_class_confidence, clean.score(STOP));
    }

    #[test]
    fn test_already_misclassified() {
        let classifier = fragile();
        let dark = RgbImage::from_pixel(32, 32, Rgb([30, 30, 30]));
        let attack = ShadowAttack::new(&classifier, config(50)).unwrap();
        let result = attack.run_seeded(&dark, STOP, None, 1).unwrap();

        assert!(!result.success);
        assert_eq!(result.outcome, AttackOutcome::CleanMisclassified);
        assert_eq!(result.original_label, DECOY);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_targeted_attack() {
        let classifier = LuminanceClassifier::new(0, 2, 3).unwrap().with_midpoint(0.9);
        let attack = ShadowAttack::new(&classifier, config(100)).unwrap();
        let result = attack.run_seeded(&white_sign(), 0, Some(2), 3).unwrap();

        assert!(result.success);
        assert_eq!(result.perturbed_label, 2);

        assert!(matches!(
            attack.run_seeded(&white_sign(), 0, Some(0), 3),
            Err(AttackError::InvalidConfiguration(_))
        ));
        assert!(attack.run_seeded(&white_sign(), 0, Some(5), 3).is_err());
    }

    #[test]
    fn test_invalid_configuration() {
        let classifier = fragile();
        let bad = AttackConfig {
            darkness_range: (0.9, 0.1),
            ..Default::default()
        };
        assert!(matches!(
            ShadowAttack::new(&classifier, bad),
            Err(AttackError::InvalidConfiguration(_))
        ));

        let attack = ShadowAttack::new(&classifier, config(1)).unwrap();
        assert!(matches!(
            attack.run_seeded(&white_sign(), 9, None, 0),
            Err(AttackError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_classifier_failure_propagates() {
        let attack = ShadowAttack::new(&Unavailable, config(10)).unwrap();
        assert!(matches!(
            attack.run_seeded(&white_sign(), STOP, None, 0),
            Err(AttackError::ClassifierUnavailable(_))
        ));

        let attack = ShadowAttack::new(&RejectsInput, config(10)).unwrap();
        let err = attack.run_seeded(&white_sign(), STOP, None, 0).unwrap_err();
        assert!(matches!(err, AttackError::InvalidInput(_)));
        assert_eq!(err.classifier_error().map(|e| e.kind()), Some("invalid_input"));
    }

    #[test]
    fn test_region_blocks_shadow() {
        let classifier = fragile();
        let region = GrayImage::from_pixel(32, 32, Luma([0]));
        let attack = ShadowAttack::new(&classifier, config(3))
            .unwrap()
            .with_region(&region);
        let result = attack.run_seeded(&white_sign(), STOP, None, 42).unwrap();

        assert!(!result.success);
        assert_eq!(result.polygon, None);

        let small = GrayImage::new(8, 8);
        let attack = ShadowAttack::new(&classifier, config(3))
            .unwrap()
            .with_region(&small);
        assert!(attack.run_seeded(&white_sign(), STOP, None, 42).is_err());
    }

    #[test]
    fn test_simultaneous_success_picks_first_candidate() {
        let classifier = FlipAfterFirst {
            calls: AtomicUsize::new(0),
        };
        let cfg = config(10);
        let attack = ShadowAttack::new(&classifier, cfg.clone()).unwrap();
        let result = attack.run_seeded(&white_sign(), STOP, None, 11).unwrap();

        assert!(result.success);
        assert_eq!(result.iterations, 1);

        // Every candidate scores the same, so candidate 0 wins
        let first = initial_position(&cfg, 11, 0);
        assert_eq!(result.polygon, Some(ShadowPolygon::from_params(&first)));
    }

    #[test]
    fn test_simultaneous_success_picks_lowest_objective() {
        // Call 0 is the clean query, so call 4 answers candidate 3
        let classifier = LowestAtCall {
            calls: AtomicUsize::new(0),
            best_call: 4,
        };
        let cfg = config(10);
        let attack = ShadowAttack::new(&classifier, cfg.clone()).unwrap();
        let result = attack.run_seeded(&white_sign(), STOP, None, 11).unwrap();

        assert!(result.success);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.queries, 1 + cfg.population);
        assert_eq!(result.true_class_confidence, 0.1);

        let fourth = initial_position(&cfg, 11, 3);
        assert_ne!(fourth, initial_position(&cfg, 11, 0));
        assert_eq!(result.polygon, Some(ShadowPolygon::from_params(&fourth)));
    }

    #[test]
    fn test_stop_sign_scenario_is_reproducible() {
        // Bright 64x64 sign recognised with about 0.98 confidence
        let classifier = LuminanceClassifier::new(STOP, DECOY, 2)
            .unwrap()
            .with_midpoint(0.9)
            .with_sharpness(39.0);
        let image = RgbImage::from_pixel(64, 64, Rgb([255, 255, 255]));
        let clean = classifier.classify(&image).unwrap();
        assert_eq!(clean.predicted_label, STOP);
        assert!((clean.confidence() - 0.98).abs() < 0.005);

        let cfg = AttackConfig {
            max_iterations: 100,
            darkness_range: (0.3, 0.7),
            ..Default::default()
        };
        let attack = ShadowAttack::new(&classifier, cfg).unwrap();
        let first = attack.run_seeded(&image, STOP, None, 42).unwrap();

        if first.success {
            assert_eq!(first.outcome, AttackOutcome::Success);
            assert_ne!(first.perturbed_label, STOP);
            assert!(first.iterations <= 100);
        } else {
            assert_eq!(first.outcome, AttackOutcome::Exhausted);
            assert_eq!(first.iterations, 100);
            assert!(first.true_class_confidence <= clean.score(STOP));
        }
        if let Some(polygon) = &first.polygon {
            assert!(polygon.darkness >= 0.3 && polygon.darkness <= 0.7);
        }

        let second = attack.run_seeded(&image, STOP, None, 42).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_clip_bounds_self_intersecting_polygon() {
        let cfg = AttackConfig {
            vertex_count: 4,
            max_area_ratio: 0.1,
            ..config(1)
        };
        let space = SearchSpace::new(&cfg, 32, 32);
        let bound = 0.1 * 32.0 * 32.0;

        let mut bowtie = vec![0.0, 0.0, 32.0, 32.0, 32.0, 0.0, 0.0, 32.0, 0.5];
        // Shoelace cancels the two lobes, the fill does not
        let tangled = ShadowPolygon::from_params(&bowtie);
        assert!(tangled.area() < 1.0);
        assert!(covered_pixels(&tangled, 32, 32) as f32 > bound);
        space.clip(&mut bowtie);

        let polygon = ShadowPolygon::from_params(&bowtie);
        assert!(polygon.area() <= bound + 1e-2);
        assert!(covered_pixels(&polygon, 32, 32) as f32 <= bound);
    }

    #[test]
    fn test_clip_bounds_star_polygon() {
        let cfg = AttackConfig {
            vertex_count: 5,
            max_area_ratio: 0.1,
            ..config(1)
        };
        let space = SearchSpace::new(&cfg, 32, 32);
        let bound = 0.1 * 32.0 * 32.0;

        // Pentagram vertex order: every second point of a regular pentagon
        let mut star = Vec::new();
        for k in 0..5 {
            let angle = (k * 2 % 5) as f32 * std::f32::consts::TAU / 5.0;
            star.extend([16.0 + 14.0 * angle.cos(), 16.0 + 14.0 * angle.sin()]);
        }
        star.push(0.5);
        space.clip(&mut star);

        let polygon = ShadowPolygon::from_params(&star);
        assert!(polygon.area() <= bound + 1e-2);
        // Pixel-centre sampling may overshoot the exact area along the edge
        assert!((covered_pixels(&polygon, 32, 32) as f32) < bound * 1.25);
    }

    #[test]
    fn test_clip_enforces_bounds() {
        let cfg = config(1);
        let space = SearchSpace::new(&cfg, 32, 32);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let mut position: Vec<f32> = space
                .sample_position(&mut rng)
                .iter()
                .map(|p| p * 3.0 - 20.0)
                .collect();
            space.clip(&mut position);

            let polygon = ShadowPolygon::from_params(&position);
            assert!(polygon.area() <= 0.5 * 32.0 * 32.0 + 1e-2);
            assert!(polygon.darkness >= 0.3 && polygon.darkness <= 0.7);
            for &(x, y) in &polygon.vertices {
                assert!((-16.001..=48.001).contains(&x) && (-16.001..=48.001).contains(&y));
            }
        }
    }
}
