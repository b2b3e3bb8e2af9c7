//! FFT-based spectral analysis
//!
//! Power spectral density and band-power extraction, used by the artifact
//! detector for high-frequency ratios and mains-peak detection.

use rustfft::{num_complex::Complex, FftPlanner};

/// FFT-based spectral analyzer
pub struct SpectralAnalyzer {
    fft_size: usize,
    sample_rate: f64,
    planner: FftPlanner<f64>,
    window: Vec<f64>,
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl SpectralAnalyzer {
    /// Create a new spectral analyzer
    ///
    /// # Arguments
    ///
    /// * `fft_size` - FFT size, at most the window length in samples
    /// * `sample_rate` - Sample rate in Hz
    #[must_use]
    pub fn new(fft_size: usize, sample_rate: f64) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            fft_size,
            sample_rate,
            planner,
            window: hann_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch: vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()],
        }
    }

    /// FFT size in samples
    #[must_use]
    pub const fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Frequency resolution (Hz per bin)
    #[must_use]
    pub fn frequency_resolution(&self) -> f64 {
        self.sample_rate / self.fft_size as f64
    }

    /// Compute the power spectrum of the first `fft_size` samples.
    ///
    /// Returns power spectral density (magnitude squared) over positive
    /// frequencies. Shorter inputs are zero-padded.
    pub fn compute_psd(&mut self, samples: &[f64]) -> Vec<f64> {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let s = samples.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(s * self.window[i], 0.0);
        }

        let fft = self.planner.plan_fft_forward(self.fft_size);
        fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        let n_freqs = self.fft_size / 2 + 1;
        let norm = 1.0 / (self.fft_size as f64).powi(2);

        self.buffer[..n_freqs]
            .iter()
            .map(|c| (c.re * c.re + c.im * c.im) * norm)
            .collect()
    }

    /// Total power over a frequency range
    #[must_use]
    pub fn band_power(&self, psd: &[f64], low_hz: f64, high_hz: f64) -> f64 {
        let freq_res = self.frequency_resolution();
        let start_bin = (low_hz / freq_res).floor() as usize;
        let end_bin = ((high_hz / freq_res).ceil() as usize).min(psd.len() - 1);

        if start_bin > end_bin {
            return 0.0;
        }
        psd[start_bin..=end_bin].iter().sum()
    }

    /// Peak power within ± `half_width_hz` of a center frequency
    #[must_use]
    pub fn peak_power_near(&self, psd: &[f64], center_hz: f64, half_width_hz: f64) -> f64 {
        let freq_res = self.frequency_resolution();
        let start_bin = ((center_hz - half_width_hz) / freq_res).floor().max(0.0) as usize;
        let end_bin = (((center_hz + half_width_hz) / freq_res).ceil() as usize).min(psd.len() - 1);

        if start_bin > end_bin {
            return 0.0;
        }
        psd[start_bin..=end_bin]
            .iter()
            .fold(0.0f64, |acc, &p| acc.max(p))
    }
}

/// Generate Hann window coefficients
fn hann_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (size - 1) as f64).cos()))
        .collect()
}
