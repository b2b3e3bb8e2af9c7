//! Signal quality assessment
//!
//! Scores each window before any analysis runs. Failing windows short-circuit
//! the rest of the pipeline: the orchestrator returns a no-op decision and
//! leaves subject state untouched.

use neuroadapt_core::config::QualityConfig;
use neuroadapt_core::types::{QualityReport, SampleWindow};

use super::filters::Biquad;

/// Stateless quality assessor. Deterministic given identical input.
#[derive(Clone, Debug)]
pub struct QualityAssessor {
    config: QualityConfig,
}

impl QualityAssessor {
    /// Create an assessor from configuration
    #[must_use]
    pub const fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    /// Assess one window.
    ///
    /// Empty or NaN-containing windows return [`QualityReport::rejected`];
    /// this function never panics.
    #[must_use]
    pub fn assess(&self, window: &SampleWindow) -> QualityReport {
        if !window.is_finite() {
            return QualityReport::rejected();
        }

        let (signal_power, noise_power) = self.power_split(window);
        let snr_db = snr_db(signal_power, noise_power);
        let peak_to_peak_uv = peak_to_peak(window);
        let variance = mean_variance(window);

        // An all-zero window carries no signal at all; score it straight to
        // zero rather than letting the variance component float it.
        if signal_power <= f64::EPSILON {
            return QualityReport {
                snr_db: 0.0,
                peak_to_peak_uv,
                variance,
                score: 0.0,
                pass: false,
            };
        }

        let snr_score =
            (snr_db / self.config.snr_ceiling_db).clamp(0.0, 1.0) * QualityConfig::SNR_WEIGHT;
        let amplitude_score = self.amplitude_score(peak_to_peak_uv) * QualityConfig::AMPLITUDE_WEIGHT;
        let stability_score = (self.config.variance_reference
            / (self.config.variance_reference + variance))
            * QualityConfig::STABILITY_WEIGHT;

        let score = (snr_score + amplitude_score + stability_score).clamp(0.0, 100.0);

        QualityReport {
            snr_db,
            peak_to_peak_uv,
            variance,
            score,
            pass: score >= self.config.score_threshold,
        }
    }

    /// Split each channel into a low-pass reference and a high-frequency
    /// residual, returning (signal power, noise power) averaged over channels.
    ///
    /// The reference filter runs zero-phase so in-band content near the
    /// cutoff does not leak into the residual through group delay.
    fn power_split(&self, window: &SampleWindow) -> (f64, f64) {
        let mut signal_power = 0.0;
        let mut noise_power = 0.0;
        let mut reference =
            Biquad::lowpass(window.sample_rate_hz(), self.config.noise_reference_hz);

        for samples in window.channels() {
            let low = reference.filtfilt(samples);
            for (&s, &l) in samples.iter().zip(&low) {
                let residual = s - l;
                signal_power += l * l;
                noise_power += residual * residual;
            }
        }

        let n = (window.channel_count() * window.samples_per_channel()) as f64;
        (signal_power / n, noise_power / n)
    }

    /// Plausibility of the peak-to-peak amplitude, 0-1.
    ///
    /// Full marks inside the physiological envelope; tapering linearly to
    /// zero at 10× outside either edge.
    fn amplitude_score(&self, p2p_uv: f64) -> f64 {
        let min = self.config.min_peak_to_peak_uv;
        let max = self.config.max_peak_to_peak_uv;

        if (min..=max).contains(&p2p_uv) {
            1.0
        } else if p2p_uv < min {
            (p2p_uv / min).clamp(0.0, 1.0)
        } else {
            (1.0 - (p2p_uv - max) / (9.0 * max)).clamp(0.0, 1.0)
        }
    }
}

fn snr_db(signal_power: f64, noise_power: f64) -> f64 {
    if signal_power <= 0.0 {
        return 0.0;
    }
    if noise_power <= f64::EPSILON {
        // Noiseless input; cap rather than return infinity
        return 60.0;
    }
    10.0 * (signal_power / noise_power).log10()
}

fn peak_to_peak(window: &SampleWindow) -> f64 {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for samples in window.channels() {
        for &s in samples {
            min = min.min(s);
            max = max.max(s);
        }
    }
    max - min
}

fn mean_variance(window: &SampleWindow) -> f64 {
    let mut total = 0.0;
    for samples in window.channels() {
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        total += samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    }
    total / window.channel_count() as f64
}
