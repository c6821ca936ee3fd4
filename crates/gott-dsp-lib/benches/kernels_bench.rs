// SPDX-License-Identifier: LGPL-3.0-or-later

//! Criterion benchmarks for biquad cascades, dynamics curves and FFT.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use gott_dsp_lib::dynamics::dynamics_gain;
use gott_dsp_lib::fft::FftState;
use gott_dsp_lib::filters::biquad_process;
use gott_dsp_lib::types::{Biquad, BiquadX1, DynamicsCurve, DynamicsKnee};
use num_complex::Complex;
use std::f32::consts::PI;

/// 1 kHz Butterworth lowpass section with pre-negated feedback terms.
fn lowpass_1k() -> BiquadX1 {
    let w0 = 2.0 * PI * 1000.0 / 48000.0;
    let alpha = w0.sin() / (2.0 * std::f32::consts::FRAC_1_SQRT_2);
    let cos_w0 = w0.cos();
    let a0 = 1.0 + alpha;
    BiquadX1 {
        b0: (1.0 - cos_w0) / 2.0 / a0,
        b1: (1.0 - cos_w0) / a0,
        b2: (1.0 - cos_w0) / 2.0 / a0,
        a1: 2.0 * cos_w0 / a0,
        a2: -(1.0 - alpha) / a0,
    }
}

/// Deterministic white noise from a simple LCG.
fn white_noise(len: usize) -> Vec<f32> {
    let mut state: u64 = 0xDEAD_BEEF_CAFE_BABEu64;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((state >> 33) as i32) as f32 / (i32::MAX as f32)
        })
        .collect()
}

fn bench_biquad_cascade(c: &mut Criterion) {
    let mut group = c.benchmark_group("biquad_cascade");
    let src = white_noise(1024);
    let mut dst = vec![0.0f32; 1024];

    for &sections in &[1usize, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::from_parameter(sections),
            &sections,
            |b, &sections| {
                let mut f = Biquad::default();
                f.set_sections(&vec![lowpass_1k(); sections]);
                b.iter(|| biquad_process(black_box(&mut dst), black_box(&src), &mut f));
            },
        );
    }
    group.finish();
}

fn bench_dynamics_gain(c: &mut Criterion) {
    let src: Vec<f32> = white_noise(1024).iter().map(|x| x.abs()).collect();
    let mut dst = vec![0.0f32; 1024];

    let t = 0.1f32;
    let mut curve = DynamicsCurve::default();
    curve.knees[0] = DynamicsKnee {
        start: t * 0.5,
        end: t * 2.0,
        herm: [-0.1, 0.8, -0.3],
        tilt: [0.25, 0.75 * t.ln()],
    };
    curve.count = 1;

    c.bench_function("dynamics_gain_1024", |b| {
        b.iter(|| dynamics_gain(black_box(&mut dst), black_box(&src), &curve));
    });
}

fn bench_fft(c: &mut Criterion) {
    let mut group = c.benchmark_group("fft_roundtrip");
    for &rank in &[12usize, 13, 14] {
        let mut state = FftState::new(rank);
        let mut buf: Vec<Complex<f32>> = white_noise(1 << rank)
            .into_iter()
            .map(|x| Complex::new(x, 0.0))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(rank), &rank, |b, _| {
            b.iter(|| {
                state.direct(black_box(&mut buf));
                state.inverse(black_box(&mut buf));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_biquad_cascade, bench_dynamics_gain, bench_fft);
criterion_main!(benches);
