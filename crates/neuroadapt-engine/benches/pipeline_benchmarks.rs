//! Benchmarks for the processing pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use neuroadapt_core::config::SessionConfig;
use neuroadapt_core::types::{SampleWindow, SubjectId};
use neuroadapt_engine::processing::bands::BandAnalyzer;
use neuroadapt_engine::processing::filters::{BandpassFilter, Biquad};
use neuroadapt_engine::processing::quality::QualityAssessor;
use neuroadapt_engine::session::Session;

/// Generate synthetic EEG data (sinusoidal with noise)
fn generate_eeg_samples(n: usize, freq_hz: f64, sample_rate: f64) -> Vec<f64> {
    use std::f64::consts::PI;

    (0..n)
        .map(|i| {
            let t = i as f64 / sample_rate;
            let signal = (2.0 * PI * freq_hz * t).sin();
            let noise = (i as f64 * 0.123).sin() * 0.1; // Pseudo-noise
            (signal + noise) * 30.0 // Scale to ~30 µV
        })
        .collect()
}

fn generate_window(index: u64, channels: usize, n: usize, sample_rate: f64) -> SampleWindow {
    let data: Vec<Vec<f64>> = (0..channels)
        .map(|_| generate_eeg_samples(n, 10.0, sample_rate))
        .collect();
    SampleWindow::from_channels(index, index * 4_000_000, sample_rate, data).unwrap()
}

fn bench_biquad_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("biquad_filter");

    for size in [256, 512, 1024, 2048].iter() {
        let samples = generate_eeg_samples(*size, 10.0, 250.0);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            let mut filter = Biquad::lowpass(250.0, 30.0);
            b.iter(|| {
                let output = filter.filter_slice(black_box(&samples));
                filter.reset();
                black_box(output)
            });
        });
    }

    group.finish();
}

fn bench_zero_phase_bandpass(c: &mut Criterion) {
    let mut group = c.benchmark_group("zero_phase_bandpass");

    for size in [256, 512, 1024].iter() {
        let samples = generate_eeg_samples(*size, 10.0, 250.0);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            let mut filter = BandpassFilter::new(250.0, 8.0, 13.0);
            b.iter(|| black_box(filter.filtfilt(black_box(&samples))));
        });
    }

    group.finish();
}

fn bench_band_decomposition(c: &mut Criterion) {
    let mut group = c.benchmark_group("band_decomposition");

    let analyzer = BandAnalyzer::with_default_bands();
    for channels in [1usize, 4, 8].iter() {
        let window = generate_window(0, *channels, 1000, 250.0);

        group.bench_with_input(
            BenchmarkId::from_parameter(channels),
            channels,
            |b, _| {
                b.iter(|| black_box(analyzer.analyze(black_box(&window))));
            },
        );
    }

    group.finish();
}

fn bench_quality_assessment(c: &mut Criterion) {
    let window = generate_window(0, 8, 1000, 250.0);
    let assessor = QualityAssessor::new(SessionConfig::default().quality);

    c.bench_function("quality_assessment", |b| {
        b.iter(|| black_box(assessor.assess(black_box(&window))));
    });
}

fn bench_end_to_end_window(c: &mut Criterion) {
    c.bench_function("process_window", |b| {
        let mut session = Session::new(SubjectId::from_u32(1), SessionConfig::default()).unwrap();
        let mut index = 0u64;
        b.iter(|| {
            let window = generate_window(index, 8, 1000, 250.0);
            index += 1;
            black_box(session.process_window(&window).unwrap())
        });
    });
}

criterion_group!(
    benches,
    bench_biquad_filter,
    bench_zero_phase_bandpass,
    bench_band_decomposition,
    bench_quality_assessment,
    bench_end_to_end_window,
);

criterion_main!(benches);
