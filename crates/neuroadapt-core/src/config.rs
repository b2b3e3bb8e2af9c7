//! Session configuration
//!
//! Every tunable of the pipeline is injected here at session start; nothing
//! is hard-coded in the processing stages. [`SessionConfig::validate`] is the
//! only fatal gate in the system: a configuration that cannot produce a
//! meaningful band decomposition rejects session creation, while everything
//! that can go wrong per window is handled recoverably downstream.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{CognitiveTrait, EegBand, TraitVector};

// ============================================================================
// Mains Frequency
// ============================================================================

/// Regional mains (power line) frequency.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MainsFrequency {
    /// 50 Hz regions (most of the world)
    #[default]
    Hz50,
    /// 60 Hz regions (Americas, parts of Asia)
    Hz60,
}

impl MainsFrequency {
    /// Frequency in Hz
    #[inline]
    #[must_use]
    pub const fn hz(self) -> f64 {
        match self {
            Self::Hz50 => 50.0,
            Self::Hz60 => 60.0,
        }
    }
}

// ============================================================================
// Signal Geometry
// ============================================================================

/// Declared geometry of the incoming sample stream.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Sample rate in Hz
    pub sample_rate_hz: f64,
    /// Number of channels per window
    pub channel_count: usize,
    /// Samples per channel per window
    pub window_samples: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 250.0,
            channel_count: 8,
            window_samples: 1000,
        }
    }
}

// ============================================================================
// Quality Assessment
// ============================================================================

/// Tunables for the signal quality assessor.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Minimum composite score (0-100) for a window to pass
    pub score_threshold: f64,
    /// Lower edge of the plausible peak-to-peak envelope in µV
    pub min_peak_to_peak_uv: f64,
    /// Upper edge of the plausible peak-to-peak envelope in µV
    pub max_peak_to_peak_uv: f64,
    /// SNR (dB) that maps to the full SNR score component
    pub snr_ceiling_db: f64,
    /// Cutoff of the low-pass reference filter used for noise estimation, Hz
    pub noise_reference_hz: f64,
    /// Variance (µV²) at which the stability component is halved
    pub variance_reference: f64,
}

impl QualityConfig {
    /// Score contribution ceiling for the SNR component
    pub const SNR_WEIGHT: f64 = 60.0;
    /// Score contribution ceiling for the amplitude-plausibility component
    pub const AMPLITUDE_WEIGHT: f64 = 25.0;
    /// Score contribution ceiling for the stability (inverse-variance) component
    pub const STABILITY_WEIGHT: f64 = 15.0;
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            score_threshold: 50.0,
            min_peak_to_peak_uv: 10.0,
            max_peak_to_peak_uv: 200.0,
            snr_ceiling_db: 30.0,
            noise_reference_hz: 40.0,
            variance_reference: 2500.0,
        }
    }
}

// ============================================================================
// Artifact Detection
// ============================================================================

/// Tunables for the artifact detector.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Absolute low-frequency deflection that counts as a blink, µV
    pub blink_threshold_uv: f64,
    /// Sliding sub-window for blink counting, in samples
    pub blink_window_samples: usize,
    /// Lower edge of the muscle (EMG) band in Hz
    pub muscle_band_low_hz: f64,
    /// Muscle index above which a window counts as a fatigue spike
    pub muscle_spike_threshold: f64,
    /// Regional mains frequency
    pub mains: MainsFrequency,
    /// Fraction of total power at the mains peak that flags line noise
    pub line_noise_ratio: f64,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            blink_threshold_uv: 100.0,
            blink_window_samples: 64,
            muscle_band_low_hz: 20.0,
            muscle_spike_threshold: 0.6,
            mains: MainsFrequency::default(),
            line_noise_ratio: 0.25,
        }
    }
}

// ============================================================================
// Trait Modulation
// ============================================================================

/// Tunables for the trait modulation engine.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraitConfig {
    /// Per-trait learning rates α
    pub learning_rates: [f64; CognitiveTrait::COUNT],
    /// Neuroplasticity growth rate β
    pub growth_rate: f64,
    /// EMA decay for the Stage-1 feature baseline
    pub baseline_decay: f64,
    /// Trait vector restored after a numeric-instability reset
    pub default_prior: TraitVector,
    /// Allowed norm drift per update, as (min, max) ratio to the prior norm
    pub norm_drift_band: (f64, f64),
}

impl Default for TraitConfig {
    fn default() -> Self {
        Self {
            // Curiosity, Resilience, Attention, Flexibility
            learning_rates: [0.12, 0.05, 0.15, 0.08],
            growth_rate: 0.1,
            baseline_decay: 0.95,
            default_prior: TraitVector::uniform(0.5),
            norm_drift_band: (0.9, 1.1),
        }
    }
}

// ============================================================================
// Stage Transitions
// ============================================================================

/// Tunables for the learning-stage state machine.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Engagement threshold per stage, in cycle order
    /// (Acquisition, Consolidation, Retrieval, Adaptation)
    pub engagement_thresholds: [f64; 4],
    /// Consecutive windows above threshold required to advance
    pub required_consecutive: u32,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            engagement_thresholds: [0.6; 4],
            required_consecutive: 5,
        }
    }
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Complete externally injected configuration for one session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Signal geometry
    pub signal: SignalConfig,
    /// Quality assessment tunables
    pub quality: QualityConfig,
    /// Artifact detection tunables
    pub artifacts: ArtifactConfig,
    /// Trait modulation tunables
    pub traits: TraitConfig,
    /// Stage transition tunables
    pub stages: StageConfig,
    /// Band edges (low, high) per band, in [`EegBand::ALL`] order
    pub band_edges_hz: [(f64, f64); EegBand::COUNT],
    /// Per-window end-to-end latency budget
    pub latency_budget: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let mut band_edges_hz = [(0.0, 0.0); EegBand::COUNT];
        for band in EegBand::ALL {
            band_edges_hz[band.index()] = band.range_hz();
        }
        Self {
            signal: SignalConfig::default(),
            quality: QualityConfig::default(),
            artifacts: ArtifactConfig::default(),
            traits: TraitConfig::default(),
            stages: StageConfig::default(),
            band_edges_hz,
            latency_budget: Duration::from_millis(2),
        }
    }
}

impl SessionConfig {
    /// Band edges for one band
    #[inline]
    #[must_use]
    pub const fn band_edges(&self, band: EegBand) -> (f64, f64) {
        self.band_edges_hz[band.index()]
    }

    /// Whether the sample rate can resolve the configured gamma band.
    ///
    /// When it cannot, sessions are still valid: the band analyzer forces
    /// gamma power to zero and raises the degraded flag instead.
    #[must_use]
    pub fn resolves_gamma(&self) -> bool {
        let (_, gamma_high) = self.band_edges(EegBand::Gamma);
        self.signal.sample_rate_hz >= 2.0 * gamma_high
    }

    /// Validate the configuration at session start.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the configuration cannot support the
    /// pipeline at all. This is the only fatal path in the system.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.signal.sample_rate_hz.is_finite() && self.signal.sample_rate_hz > 0.0) {
            return Err(ConfigError::InvalidSampleRate {
                sample_rate_hz: self.signal.sample_rate_hz,
            });
        }
        if self.signal.channel_count == 0 {
            return Err(ConfigError::InvalidChannelCount { got: 0 });
        }
        if self.signal.window_samples == 0 {
            return Err(ConfigError::InvalidWindowLength { got: 0 });
        }

        for band in EegBand::ALL {
            let (low, high) = self.band_edges(band);
            if !(low.is_finite() && high.is_finite()) || low < 0.0 || low >= high {
                return Err(ConfigError::InvalidBandEdges {
                    band: band.name(),
                    low_hz: low,
                    high_hz: high,
                });
            }
        }

        // Every band up through beta must satisfy Nyquist; gamma alone may
        // degrade (forced to zero with the side-channel flag).
        let (_, beta_high) = self.band_edges(EegBand::Beta);
        if self.signal.sample_rate_hz < 2.0 * beta_high {
            return Err(ConfigError::NyquistViolation {
                sample_rate_hz: self.signal.sample_rate_hz,
                required_hz: 2.0 * beta_high,
            });
        }

        if !(0.0..=100.0).contains(&self.quality.score_threshold) {
            return Err(ConfigError::InvalidThreshold {
                name: "quality.score_threshold",
                value: self.quality.score_threshold,
            });
        }
        if self.quality.min_peak_to_peak_uv >= self.quality.max_peak_to_peak_uv {
            return Err(ConfigError::InvalidEnvelope {
                min_uv: self.quality.min_peak_to_peak_uv,
                max_uv: self.quality.max_peak_to_peak_uv,
            });
        }

        if !(0.0..1.0).contains(&self.traits.baseline_decay) {
            return Err(ConfigError::InvalidThreshold {
                name: "traits.baseline_decay",
                value: self.traits.baseline_decay,
            });
        }
        let (drift_min, drift_max) = self.traits.norm_drift_band;
        if !(drift_min > 0.0 && drift_min < 1.0 && drift_max > 1.0) {
            return Err(ConfigError::InvalidThreshold {
                name: "traits.norm_drift_band",
                value: drift_min,
            });
        }

        for threshold in self.stages.engagement_thresholds {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::InvalidThreshold {
                    name: "stages.engagement_thresholds",
                    value: threshold,
                });
            }
        }
        if self.stages.required_consecutive == 0 {
            return Err(ConfigError::InvalidThreshold {
                name: "stages.required_consecutive",
                value: 0.0,
            });
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
