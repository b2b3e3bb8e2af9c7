//! Artifact detection heuristics
//!
//! Blink, muscle, and line-noise detection on raw windows. Independent of the
//! band analyzer; the orchestrator runs the two concurrently.

use neuroadapt_core::config::ArtifactConfig;
use neuroadapt_core::types::{ArtifactFlags, SampleWindow};

use super::filters::Biquad;
use super::spectrum::SpectralAnalyzer;

/// Upper cutoff of the blink envelope filter in Hz. Blinks are slow,
/// high-amplitude frontal deflections.
const BLINK_LOWPASS_HZ: f64 = 5.0;

/// Half-width of the mains peak search in Hz
const MAINS_HALF_WIDTH_HZ: f64 = 1.0;

/// Artifact detector for quality-passed windows.
pub struct ArtifactDetector {
    config: ArtifactConfig,
    analyzer: SpectralAnalyzer,
}

impl ArtifactDetector {
    /// Create a detector for the given configuration and window geometry.
    #[must_use]
    pub fn new(config: ArtifactConfig, sample_rate_hz: f64, window_samples: usize) -> Self {
        let fft_size = fft_size_for(window_samples);
        Self {
            config,
            analyzer: SpectralAnalyzer::new(fft_size, sample_rate_hz),
        }
    }

    /// Detect artifacts in one window.
    pub fn detect(&mut self, window: &SampleWindow) -> ArtifactFlags {
        let blink_count = self.count_blinks(window);

        let mut high_power = 0.0;
        let mut total_power = 0.0;
        let mut mains_peak = 0.0f64;
        let nyquist = window.sample_rate_hz() / 2.0;

        for samples in window.channels() {
            let psd = self.analyzer.compute_psd(samples);
            total_power += psd.iter().sum::<f64>();
            high_power += self
                .analyzer
                .band_power(&psd, self.config.muscle_band_low_hz, nyquist);
            mains_peak = mains_peak.max(self.analyzer.peak_power_near(
                &psd,
                self.config.mains.hz(),
                MAINS_HALF_WIDTH_HZ,
            ));
        }

        let muscle_index = if total_power > 0.0 {
            (high_power / total_power).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let line_noise_present = total_power > 0.0
            && mains_peak * window.channel_count() as f64
                > total_power * self.config.line_noise_ratio;

        ArtifactFlags {
            blink_count,
            muscle_index,
            line_noise_present,
        }
    }

    /// Count blink-like deflections: rising crossings of the configured µV
    /// threshold on the low-frequency envelope, at most one per sub-window.
    fn count_blinks(&self, window: &SampleWindow) -> u32 {
        let sub = self.config.blink_window_samples.max(1);
        let mut count = 0u32;

        // Blinks appear strongest on frontal channels; scanning all channels
        // and taking the maximum per sub-window avoids montage assumptions.
        let mut envelope_max = vec![0.0f64; window.samples_per_channel()];
        for samples in window.channels() {
            let mut lowpass = Biquad::lowpass(window.sample_rate_hz(), BLINK_LOWPASS_HZ);
            for (slot, &s) in envelope_max.iter_mut().zip(samples) {
                *slot = slot.max(lowpass.filter(s).abs());
            }
        }

        for chunk in envelope_max.chunks(sub) {
            let mut above = false;
            for &v in chunk {
                if v >= self.config.blink_threshold_uv {
                    if !above {
                        count += 1;
                    }
                    above = true;
                } else {
                    above = false;
                }
            }
        }

        count
    }
}

/// Largest power of two not exceeding the window length (min 64)
fn fft_size_for(window_samples: usize) -> usize {
    let mut size = 64;
    while size * 2 <= window_samples {
        size *= 2;
    }
    size
}
