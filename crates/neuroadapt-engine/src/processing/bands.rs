//! Frequency band decomposition
//!
//! Zero-phase band-pass filtering per EEG band, with band power computed as
//! mean squared amplitude after filtering and normalized to fractions.

use neuroadapt_core::types::{BandPowerEstimate, BandPowers, EegBand, SampleWindow};

use super::filters::BandpassFilter;

/// Band-power analyzer for quality-passed windows.
#[derive(Clone, Debug)]
pub struct BandAnalyzer {
    band_edges_hz: [(f64, f64); EegBand::COUNT],
}

impl BandAnalyzer {
    /// Create an analyzer with the given band edges (in [`EegBand::ALL`] order)
    #[must_use]
    pub const fn new(band_edges_hz: [(f64, f64); EegBand::COUNT]) -> Self {
        Self { band_edges_hz }
    }

    /// Create an analyzer with the standard band edges
    #[must_use]
    pub fn with_default_bands() -> Self {
        let mut edges = [(0.0, 0.0); EegBand::COUNT];
        for band in EegBand::ALL {
            edges[band.index()] = band.range_hz();
        }
        Self::new(edges)
    }

    /// Decompose one window into normalized band power fractions.
    ///
    /// When the sample rate cannot resolve the gamma band, gamma power is
    /// forced to zero and the `nyquist_limited` flag is raised; the remaining
    /// bands renormalize among themselves.
    #[must_use]
    pub fn analyze(&self, window: &SampleWindow) -> BandPowerEstimate {
        let sample_rate = window.sample_rate_hz();
        let (_, gamma_high) = self.band_edges_hz[EegBand::Gamma.index()];
        let nyquist_limited = sample_rate < 2.0 * gamma_high;

        let mut raw = [0.0f64; EegBand::COUNT];

        for band in EegBand::ALL {
            if band == EegBand::Gamma && nyquist_limited {
                continue;
            }
            let (low, high) = self.band_edges_hz[band.index()];
            let mut filter = BandpassFilter::new(sample_rate, low, high);

            let mut power = 0.0;
            for samples in window.channels() {
                let filtered = filter.filtfilt(samples);
                power +=
                    filtered.iter().map(|s| s * s).sum::<f64>() / filtered.len() as f64;
            }
            raw[band.index()] = power / window.channel_count() as f64;
        }

        let total: f64 = raw.iter().sum();
        let powers = if total > 0.0 {
            BandPowers {
                delta: raw[EegBand::Delta.index()] / total,
                theta: raw[EegBand::Theta.index()] / total,
                alpha: raw[EegBand::Alpha.index()] / total,
                beta: raw[EegBand::Beta.index()] / total,
                gamma: raw[EegBand::Gamma.index()] / total,
            }
        } else {
            BandPowers::default()
        };

        BandPowerEstimate {
            powers,
            nyquist_limited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_window(freq: f64, sample_rate: f64, channels: usize, n: usize) -> SampleWindow {
        let data: Vec<Vec<f64>> = (0..channels)
            .map(|ch| {
                (0..n)
                    .map(|i| {
                        let t = i as f64 / sample_rate;
                        30.0 * (2.0 * std::f64::consts::PI * freq * t + ch as f64 * 0.3).sin()
                    })
                    .collect()
            })
            .collect();
        SampleWindow::from_channels(0, 0, sample_rate, data).unwrap()
    }

    #[test]
    fn test_fractions_sum_to_one() {
        let analyzer = BandAnalyzer::with_default_bands();
        let estimate = analyzer.analyze(&sine_window(10.0, 250.0, 8, 1000));

        assert!((estimate.powers.total() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_alpha_dominant_signal() {
        // 250 Hz, 4 seconds, 8 channels of 10 Hz sine
        let analyzer = BandAnalyzer::with_default_bands();
        let estimate = analyzer.analyze(&sine_window(10.0, 250.0, 8, 1000));

        assert!(
            estimate.powers.alpha > 0.5,
            "alpha fraction was {}",
            estimate.powers.alpha
        );
        assert!(!estimate.nyquist_limited);
    }

    #[test]
    fn test_theta_dominant_signal() {
        let analyzer = BandAnalyzer::with_default_bands();
        let estimate = analyzer.analyze(&sine_window(6.0, 250.0, 4, 1000));

        assert!(estimate.powers.theta > 0.5);
    }

    #[test]
    fn test_nyquist_limited_gamma_forced_to_zero() {
        let analyzer = BandAnalyzer::with_default_bands();
        // 80 Hz sample rate resolves beta (30 Hz) but not gamma (45 Hz)
        let estimate = analyzer.analyze(&sine_window(10.0, 80.0, 2, 320));

        assert!(estimate.nyquist_limited);
        assert!((estimate.powers.gamma - 0.0).abs() < f64::EPSILON);
        assert!((estimate.powers.total() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_silent_window_yields_zero_powers() {
        let analyzer = BandAnalyzer::with_default_bands();
        let window = SampleWindow::from_channels(0, 0, 250.0, vec![vec![0.0; 500]; 2]).unwrap();
        let estimate = analyzer.analyze(&window);

        assert!((estimate.powers.total() - 0.0).abs() < f64::EPSILON);
    }
}
