//! Venturi Stage 1: feature assembly and normalization
//!
//! Folds the band decomposition and artifact flags into a fixed-length
//! feature vector, z-scored against the subject's rolling baseline. The
//! baseline itself is exponential-moving-average state carried inside
//! `SubjectState`; this stage computes the successor baseline and returns
//! it for the orchestrator to commit.

use neuroadapt_core::types::{
    ArtifactFlags, BandPowerEstimate, EegBand, FeatureBaseline, SampleWindow,
};

/// Length of the Stage-1 feature vector:
/// five band fractions, blink rate, muscle index, line-noise indicator.
pub const FEATURE_COUNT: usize = EegBand::COUNT + 3;

/// Variance floor to keep z-scores finite on constant features
const VARIANCE_FLOOR: f64 = 1e-6;

/// Stage-1 output: raw and normalized features plus the successor baseline.
#[derive(Clone, Debug)]
pub struct FeatureVector {
    /// Raw feature values before normalization
    pub raw: [f64; FEATURE_COUNT],
    /// Z-scored feature values
    pub normalized: [f64; FEATURE_COUNT],
    /// Baseline advanced by this window, for the orchestrator to commit
    pub next_baseline: FeatureBaseline,
}

/// Assemble and normalize the feature vector for one window.
#[must_use]
pub fn extract(
    window: &SampleWindow,
    bands: &BandPowerEstimate,
    artifacts: &ArtifactFlags,
    baseline: &FeatureBaseline,
    decay: f64,
) -> FeatureVector {
    let mut raw = [0.0f64; FEATURE_COUNT];
    for band in EegBand::ALL {
        raw[band.index()] = bands.powers.fraction(band);
    }
    // Blinks per second, so the feature is window-length independent
    raw[EegBand::COUNT] = f64::from(artifacts.blink_count) / window.duration_s();
    raw[EegBand::COUNT + 1] = artifacts.muscle_index;
    raw[EegBand::COUNT + 2] = f64::from(u8::from(artifacts.line_noise_present));

    let mut next_baseline = baseline.clone();
    if next_baseline.mean.len() != FEATURE_COUNT {
        next_baseline = FeatureBaseline::new(FEATURE_COUNT);
    }

    if next_baseline.initialized {
        for i in 0..FEATURE_COUNT {
            let deviation = raw[i] - next_baseline.mean[i];
            next_baseline.mean[i] = decay * next_baseline.mean[i] + (1.0 - decay) * raw[i];
            next_baseline.variance[i] =
                decay * next_baseline.variance[i] + (1.0 - decay) * deviation * deviation;
        }
    } else {
        // First window seeds the statistics; z-scores start at zero
        next_baseline.mean.copy_from_slice(&raw);
        next_baseline.variance.fill(VARIANCE_FLOOR);
        next_baseline.initialized = true;
    }

    let mut normalized = [0.0f64; FEATURE_COUNT];
    for i in 0..FEATURE_COUNT {
        let std = next_baseline.variance[i].max(VARIANCE_FLOOR).sqrt();
        normalized[i] = (raw[i] - next_baseline.mean[i]) / std;
    }

    FeatureVector {
        raw,
        normalized,
        next_baseline,
    }
}
