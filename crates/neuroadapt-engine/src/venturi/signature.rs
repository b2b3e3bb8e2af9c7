//! Venturi Stage 2: signature extraction
//!
//! Reduces the normalized feature vector to the engagement, fatigue, and
//! cognitive-load axes via a static linear projection. The weights are a
//! versioned configuration asset, not learned online: they can be loaded
//! from an external store through serde, and a compiled-in default ships
//! with the crate.

use serde::{Deserialize, Serialize};

use neuroadapt_core::types::{CognitiveTrait, Signature};

use super::preprocess::FEATURE_COUNT;

/// Number of signature axes (engagement, fatigue, cognitive load)
pub const SIGNATURE_AXES: usize = 3;

/// Static, versioned linear maps for Stages 2 and 3.
///
/// `signature` rows are in axis order (engagement, fatigue, load) over the
/// feature order (delta, theta, alpha, beta, gamma, blink rate, muscle,
/// line noise). `response` rows are in [`CognitiveTrait::ALL`] order over
/// the axis order, bridging the 3-axis signature to the 4-trait delta.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectionWeights {
    /// Asset version, bumped whenever the matrices are retuned
    pub version: u32,
    /// Stage-2 projection: feature vector → signature axes
    pub signature: [[f64; FEATURE_COUNT]; SIGNATURE_AXES],
    /// Stage-3 coupling: signature axes → per-trait drive
    pub response: [[f64; SIGNATURE_AXES]; CognitiveTrait::COUNT],
    /// Stage-3 orthonormal projection basis, applied before renormalization
    pub basis: [[f64; CognitiveTrait::COUNT]; CognitiveTrait::COUNT],
}

impl ProjectionWeights {
    /// The compiled-in weight set.
    ///
    /// Engagement loads on beta and gamma against delta/theta and artifact
    /// features; fatigue loads on theta, blinks, and muscle tone; cognitive
    /// load on beta/gamma plus muscle tone.
    pub const DEFAULT: Self = Self {
        version: 3,
        signature: [
            // delta   theta   alpha   beta    gamma   blink   muscle  mains
            [-0.25, -0.30, 0.10, 0.55, 0.35, -0.15, -0.20, -0.10],
            [0.20, 0.45, -0.10, -0.25, -0.15, 0.40, 0.35, 0.15],
            [-0.10, 0.15, -0.30, 0.45, 0.40, 0.05, 0.25, 0.10],
        ],
        response: [
            // engagement  fatigue  load
            [0.8, -0.2, 0.3],  // curiosity
            [0.3, -0.7, -0.2], // resilience
            [0.9, -0.4, -0.3], // attention
            [0.4, -0.1, 0.6],  // flexibility
        ],
        basis: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Apply the projection basis to a trait-space vector.
    #[must_use]
    pub fn project(&self, v: &[f64; CognitiveTrait::COUNT]) -> [f64; CognitiveTrait::COUNT] {
        let mut out = [0.0f64; CognitiveTrait::COUNT];
        for (slot, row) in out.iter_mut().zip(&self.basis) {
            *slot = row.iter().zip(v).map(|(b, x)| b * x).sum();
        }
        out
    }

    /// Project a normalized feature vector onto the signature axes.
    ///
    /// Each axis is squashed with tanh so downstream thresholds operate on
    /// a bounded range regardless of z-score magnitude.
    #[must_use]
    pub fn signature(&self, features: &[f64; FEATURE_COUNT]) -> Signature {
        let mut axes = [0.0f64; SIGNATURE_AXES];
        for (axis, row) in axes.iter_mut().zip(&self.signature) {
            *axis = row
                .iter()
                .zip(features)
                .map(|(w, f)| w * f)
                .sum::<f64>()
                .tanh();
        }

        Signature {
            engagement: axes[0],
            fatigue: axes[1],
            cognitive_load: axes[2],
        }
    }

    /// Per-trait drive from a signature (the Stage-3 coupling step).
    #[must_use]
    pub fn trait_drive(&self, signature: &Signature) -> [f64; CognitiveTrait::COUNT] {
        let axes = [
            signature.engagement,
            signature.fatigue,
            signature.cognitive_load,
        ];
        let mut drive = [0.0f64; CognitiveTrait::COUNT];
        for (out, row) in drive.iter_mut().zip(&self.response) {
            *out = row.iter().zip(&axes).map(|(w, a)| w * a).sum();
        }
        drive
    }
}

impl Default for ProjectionWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_features_give_zero_signature() {
        let weights = ProjectionWeights::default();
        let s = weights.signature(&[0.0; FEATURE_COUNT]);

        assert!((s.engagement - 0.0).abs() < 1e-12);
        assert!((s.fatigue - 0.0).abs() < 1e-12);
        assert!((s.cognitive_load - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_beta_shift_raises_engagement() {
        let weights = ProjectionWeights::default();
        let mut features = [0.0; FEATURE_COUNT];
        features[3] = 2.0; // beta z-score well above baseline
        let s = weights.signature(&features);

        assert!(s.engagement > 0.3);
    }

    #[test]
    fn test_artifact_shift_raises_fatigue() {
        let weights = ProjectionWeights::default();
        let mut features = [0.0; FEATURE_COUNT];
        features[5] = 2.0; // blink rate
        features[6] = 2.0; // muscle index
        let s = weights.signature(&features);

        assert!(s.fatigue > 0.5);
    }

    #[test]
    fn test_signature_axes_are_bounded() {
        let weights = ProjectionWeights::default();
        let s = weights.signature(&[100.0; FEATURE_COUNT]);

        for axis in [s.engagement, s.fatigue, s.cognitive_load] {
            assert!((-1.0..=1.0).contains(&axis));
        }
    }

    #[test]
    fn test_weights_asset_roundtrip() {
        let weights = ProjectionWeights::default();
        let json = serde_json::to_string(&weights).unwrap();
        let back: ProjectionWeights = serde_json::from_str(&json).unwrap();

        assert_eq!(back, weights);
        assert_eq!(back.version, ProjectionWeights::DEFAULT.version);
    }

    #[test]
    fn test_trait_drive_tracks_engagement() {
        let weights = ProjectionWeights::default();
        let engaged = Signature {
            engagement: 0.8,
            fatigue: -0.2,
            cognitive_load: 0.1,
        };
        let drive = weights.trait_drive(&engaged);

        // All traits respond positively to clean engagement
        assert!(drive.iter().all(|&d| d > 0.0));
    }
}
