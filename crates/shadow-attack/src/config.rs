//! Attack search configuration

use crate::AttackError;
use serde::{Deserialize, Serialize};

/// Largest accepted edge blur; the kernel grows with sigma
pub const MAX_EDGE_BLUR_SIGMA: f32 = 32.0;

/// Shadow attack configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackConfig {
    /// Upper bound on swarm iterations
    pub max_iterations: usize,

    /// Candidate polygons evaluated per iteration
    pub population: usize,

    /// Vertices per shadow polygon
    pub vertex_count: usize,

    /// Allowed shadow darkness `(min, max)`, 0 = no shadow, 1 = black
    pub darkness_range: (f32, f32),

    /// Largest polygon area as a fraction of the image area
    pub max_area_ratio: f32,

    /// How far vertices may leave the image, as a fraction of its side
    pub vertex_margin: f32,

    /// Velocity carried over between iterations
    pub inertia: f32,

    /// Pull toward each particle's own best position
    pub cognitive: f32,

    /// Pull toward the swarm's best position
    pub social: f32,

    /// Velocity bound per dimension, as a fraction of that dimension's range
    pub max_velocity_ratio: f32,

    /// Gaussian sigma (pixels) softening the shadow edge, 0 disables
    pub edge_blur_sigma: f32,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            population: 10,
            vertex_count: 3,
            darkness_range: (0.2, 0.7),
            max_area_ratio: 0.5,
            vertex_margin: 0.5,
            inertia: 1.0,
            cognitive: 2.0,
            social: 2.0,
            max_velocity_ratio: 0.2,
            edge_blur_sigma: 1.0,
        }
    }
}

impl AttackConfig {
    /// Quick search for smoke tests
    pub fn fast() -> Self {
        Self {
            max_iterations: 20,
            population: 5,
            ..Default::default()
        }
    }

    /// Longer search with a bigger swarm
    pub fn thorough() -> Self {
        Self {
            max_iterations: 1000,
            population: 30,
            ..Default::default()
        }
    }

    /// Check every option lies in its valid domain
    pub fn validate(&self) -> Result<(), AttackError> {
        let invalid = |msg: String| Err(AttackError::InvalidConfiguration(msg));

        if self.population == 0 {
            return invalid("population must be at least 1".into());
        }
        if self.vertex_count < 3 {
            return invalid(format!("vertex_count must be at least 3, got {}", self.vertex_count));
        }

        let (lo, hi) = self.darkness_range;
        if !(lo.is_finite() && hi.is_finite()) || lo < 0.0 || hi > 1.0 || lo > hi {
            return invalid(format!(
                "darkness_range must satisfy 0 <= min <= max <= 1, got ({}, {})",
                lo, hi
            ));
        }
        if !(self.max_area_ratio > 0.0 && self.max_area_ratio <= 1.0) {
            return invalid(format!("max_area_ratio must be in (0, 1], got {}", self.max_area_ratio));
        }
        if !(self.vertex_margin.is_finite() && self.vertex_margin >= 0.0) {
            return invalid(format!("vertex_margin must be >= 0, got {}", self.vertex_margin));
        }

        let coefficients = [
            ("inertia", self.inertia),
            ("cognitive", self.cognitive),
            ("social", self.social),
            ("edge_blur_sigma", self.edge_blur_sigma),
        ];
        for (name, value) in coefficients {
            if !(value.is_finite() && value >= 0.0) {
                return invalid(format!("{} must be finite and >= 0, got {}", name, value));
            }
        }
        if self.edge_blur_sigma > MAX_EDGE_BLUR_SIGMA {
            return invalid(format!(
                "edge_blur_sigma must be at most {}, got {}",
                MAX_EDGE_BLUR_SIGMA, self.edge_blur_sigma
            ));
        }
        if !(self.max_velocity_ratio.is_finite() && self.max_velocity_ratio > 0.0) {
            return invalid(format!(
                "max_velocity_ratio must be > 0, got {}",
                self.max_velocity_ratio
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(AttackConfig::default().validate().is_ok());
        assert!(AttackConfig::fast().validate().is_ok());
        assert!(AttackConfig::thorough().validate().is_ok());
    }

    #[test]
    fn test_darkness_range_domain() {
        for range in [(0.8, 0.2), (-0.1, 0.5), (0.3, 1.5), (f32::NAN, 0.5)] {
            let config = AttackConfig {
                darkness_range: range,
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(AttackError::InvalidConfiguration(_))),
                "{:?} should be rejected",
                range
            );
        }

        let fixed = AttackConfig {
            darkness_range: (0.43, 0.43),
            ..Default::default()
        };
        assert!(fixed.validate().is_ok());
    }

    #[test]
    fn test_vertex_count_and_population() {
        let config = AttackConfig {
            vertex_count: 2,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AttackConfig {
            population: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_iterations_is_valid() {
        let config = AttackConfig {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_area_and_coefficients() {
        let config = AttackConfig {
            max_area_ratio: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AttackConfig {
            social: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AttackConfig {
            max_velocity_ratio: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_edge_blur_upper_bound() {
        let config = AttackConfig {
            edge_blur_sigma: MAX_EDGE_BLUR_SIGMA,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        for sigma in [MAX_EDGE_BLUR_SIGMA + 0.5, 1e30, f32::INFINITY] {
            let config = AttackConfig {
                edge_blur_sigma: sigma,
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(AttackError::InvalidConfiguration(_))),
                "sigma {} should be rejected",
                sigma
            );
        }
    }
}
