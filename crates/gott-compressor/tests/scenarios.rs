// SPDX-License-Identifier: LGPL-3.0-or-later
//
// End-to-end scenarios for the compressor engine: crossover
// reconstruction, band gain behaviour, sidechain routing, surge
// protection, latency reporting and settings handling.

use float_cmp::assert_approx_eq;
use gott_compressor::meta::{FFT_MESH_POINTS, LOOKAHEAD};
use gott_compressor::{
    BandSettings, Compressor, CrossoverMode, EngineError, OperatingMode, ProcessBuffers, Settings,
    SidechainMode, SidechainType, SurgeState,
};
use gott_dsp_units::consts::GAIN_AMP_M_36_DB;
use gott_dsp_units::units::{db_to_gain, gain_to_db};
use gott_dsp_units::util::crossover::Crossover;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const SR: f32 = 48000.0;

fn engine(mode: OperatingMode, settings: &Settings) -> Compressor {
    let mut comp = Compressor::new(mode);
    comp.init();
    comp.set_sample_rate(SR);
    comp.apply(settings);
    comp.update_settings();
    comp
}

/// Every band passes at unity gain.
fn transparent(mode: CrossoverMode) -> Settings {
    let mut s = Settings::default();
    s.surge_protection = false;
    s.crossover.mode = mode;
    s.crossover.splits = [200.0, 2000.0, 7000.0];
    for b in &mut s.bands {
        b.enabled = false;
    }
    s
}

fn sine(freq: f32, amp: f32, n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| amp * (2.0 * std::f32::consts::PI * freq * i as f32 / SR).sin())
        .collect()
}

fn noise(seed: u64, n: usize) -> Vec<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-0.5f32..0.5)).collect()
}

fn run_mono(comp: &mut Compressor, input: &[f32]) -> Vec<f32> {
    let mut out = vec![0.0; input.len()];
    let mut outs = [out.as_mut_slice()];
    comp.process(&mut ProcessBuffers::new(&[input], &mut outs))
        .expect("process");
    out
}

fn run_stereo(comp: &mut Compressor, l: &[f32], r: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let mut ol = vec![0.0; l.len()];
    let mut or = vec![0.0; r.len()];
    let mut outs = [ol.as_mut_slice(), or.as_mut_slice()];
    comp.process(&mut ProcessBuffers::new(&[l, r], &mut outs))
        .expect("process");
    (ol, or)
}

/// Three-band classic engine with only the middle band compressing.
fn middle_band_only() -> Settings {
    let mut s = Settings::default();
    s.crossover.mode = CrossoverMode::Classic;
    s.crossover.splits = [200.0, 2000.0, 7000.0];
    s.sidechain.mode = SidechainMode::Peak;
    for b in &mut s.bands {
        b.enabled = false;
        b.mute = true;
    }
    s.bands[1] = BandSettings {
        min_threshold: -60.0,
        up_threshold: -36.0,
        down_threshold: -12.0,
        up_ratio: 50.0,
        down_ratio: 4.0,
        knee: 0.0,
        ..BandSettings::default()
    };
    s
}

#[test]
fn middle_band_between_thresholds_passes() {
    let mut comp = engine(OperatingMode::Mono, &middle_band_only());
    let x = sine(1000.0, db_to_gain(-20.0), 4800);
    run_mono(&mut comp, &x);

    let mid = comp.band_meters(0, 1).expect("band 1");
    assert!(gain_to_db(mid.gain).abs() < 0.5, "band 1 gain {} dB", gain_to_db(mid.gain));
    for j in [0, 2] {
        let m = comp.band_meters(0, j).expect("band");
        assert_eq!(m.gain, GAIN_AMP_M_36_DB);
    }

    let out = comp.out_level(0).expect("meter");
    assert!((0.08..0.11).contains(&out), "output peak {out}");
}

#[test]
fn middle_band_above_down_threshold_settles_at_ratio() {
    let mut comp = engine(OperatingMode::Mono, &middle_band_only());
    let x = sine(1000.0, db_to_gain(-4.0), 4800);
    run_mono(&mut comp, &x);

    // About 8 dB over the threshold at 4:1 leaves 6 dB of reduction
    let gain = gain_to_db(comp.band_meters(0, 1).expect("band 1").gain);
    assert!((-6.5..-5.0).contains(&gain), "band 1 gain {gain} dB");
}

#[test]
fn upward_section_lifts_quiet_material() {
    let mut s = middle_band_only();
    s.bands[1].attack = 1.0;
    s.bands[1].release = 10.0;
    let mut comp = engine(OperatingMode::Mono, &s);
    let x = sine(1000.0, db_to_gain(-48.0), 9600);
    run_mono(&mut comp, &x);

    let gain = gain_to_db(comp.band_meters(0, 1).expect("band 1").gain);
    assert!(gain > 6.0, "band 1 gain {gain} dB");
}

#[test]
fn missing_external_sidechain_is_silence() {
    let mut s = Settings::default();
    s.crossover.mode = CrossoverMode::Modern;
    let mut comp = engine(OperatingMode::Stereo, &s);
    let x = noise(1, 2048);
    run_stereo(&mut comp, &x, &x);

    s.sidechain.kind = SidechainType::External;
    comp.apply(&s);
    // One second for the envelopes to release
    for _ in 0..24 {
        let (l, r) = run_stereo(&mut comp, &x, &x);
        assert!(l.iter().chain(r.iter()).all(|v| v.is_finite()));
    }
    let m = comp.band_meters(0, 1).expect("band 1");
    assert!(m.envelope < 1e-3, "envelope {}", m.envelope);
    assert!(m.gain.is_finite());
}

#[test]
fn external_sidechain_with_bad_samples_stays_finite() {
    let mut s = Settings::default();
    s.sidechain.kind = SidechainType::External;
    let mut comp = engine(OperatingMode::Mono, &s);
    let x = noise(2, 1024);
    let mut sc = noise(3, 1024);
    sc[10] = f32::NAN;
    sc[20] = f32::INFINITY;
    let mut out = vec![0.0; 1024];
    let mut outs = [out.as_mut_slice()];
    let scs: [&[f32]; 1] = [&sc];
    comp.process(&mut ProcessBuffers::new(&[x.as_slice()], &mut outs).with_sidechain(&scs))
        .expect("process");
    assert!(out.iter().all(|v| v.is_finite()));
}

/// Overload, silence, then normal material through a default engine.
fn surge_cycle(mode: CrossoverMode) -> (Compressor, Vec<Vec<f32>>) {
    let mut s = Settings::default();
    s.crossover.mode = mode;
    let mut comp = engine(OperatingMode::Mono, &s);
    let mut outs = Vec::new();

    let overload = sine(440.0, 8.0, 24000);
    outs.push(run_mono(&mut comp, &overload));
    assert_eq!(comp.surge_state(), SurgeState::Triggered);
    outs.push(run_mono(&mut comp, &overload));
    assert_eq!(comp.surge_state(), SurgeState::Triggered);

    outs.push(run_mono(&mut comp, &vec![0.0; 48000]));
    assert_eq!(comp.surge_state(), SurgeState::Normal);

    outs.push(run_mono(&mut comp, &sine(440.0, 0.25, 48000)));
    assert_eq!(comp.surge_state(), SurgeState::Normal);
    (comp, outs)
}

#[test]
fn surge_protection_silences_overload_and_recovers() {
    let (_, outs) = surge_cycle(CrossoverMode::Classic);
    let held = &outs[1];
    let peak = held[held.len() - 4800..].iter().fold(0.0f32, |m, v| m.max(v.abs()));
    assert!(peak < 0.01, "held output peak {peak}");
    assert!(outs[3][40000..].iter().any(|v| v.abs() > 0.01));
}

#[test]
fn surge_protection_in_modern_mode_stays_finite() {
    let (comp, outs) = surge_cycle(CrossoverMode::Modern);
    for out in &outs {
        assert!(out.iter().all(|v| v.is_finite()));
    }
    assert!(outs[3][40000..].iter().any(|v| v.abs() > 0.01));
    for j in 0..3 {
        let m = comp.band_meters(0, j).expect("band");
        assert!(m.gain.is_finite() && m.envelope.is_finite());
    }
}

#[test]
fn surge_toggling_never_locks_output() {
    let mut s = Settings::default();
    s.crossover.mode = CrossoverMode::Classic;
    let mut comp = engine(OperatingMode::Mono, &s);
    let loud = sine(440.0, 8.0, 512);
    let quiet = vec![0.0; 512];

    for i in 0..60 {
        s.surge_protection = i % 2 == 0;
        comp.apply(&s);
        run_mono(&mut comp, if i % 3 == 0 { &quiet } else { &loud });
    }

    s.surge_protection = true;
    comp.apply(&s);
    let x = sine(440.0, 0.25, 48000);
    let y = run_mono(&mut comp, &x);
    assert_eq!(comp.surge_state(), SurgeState::Normal);
    assert!(comp.out_level(0).expect("meter") > 0.01);
    assert!(y.iter().all(|v| v.is_finite()));
}

#[test]
fn latency_adds_lookahead_and_fft_delay() {
    let mut s = transparent(CrossoverMode::Classic);
    s.lookahead = 5.0;
    let mut comp = engine(OperatingMode::Mono, &s);
    assert_eq!(comp.latency(), 240);

    s.crossover.mode = CrossoverMode::Modern;
    comp.apply(&s);
    comp.update_settings();
    assert_eq!(comp.latency(), 240);

    s.crossover.mode = CrossoverMode::LinearPhase;
    comp.apply(&s);
    comp.update_settings();
    // Rank 13 at 48 kHz
    assert_eq!(comp.latency(), 240 + 8192);

    s.lookahead = LOOKAHEAD.max;
    comp.apply(&s);
    comp.update_settings();
    assert_eq!(comp.latency(), 960 + 8192);
}

#[test]
fn settings_update_is_idempotent() {
    let s = transparent(CrossoverMode::Classic);
    let mut a = Compressor::new(OperatingMode::Mono);
    a.init();
    a.apply(&s);
    assert!(a.update_settings());
    assert!(!a.update_settings());
    a.apply(&s);
    assert!(!a.update_settings());

    let mut b = engine(OperatingMode::Mono, &s);
    b.apply(&s);
    b.update_settings();

    let x = noise(4, 3000);
    assert_eq!(run_mono(&mut a, &x), run_mono(&mut b, &x));
}

#[test]
fn solo_forces_other_bands_to_deep_attenuation() {
    let mut s = Settings::default();
    s.bands[1].solo = true;
    let mut comp = engine(OperatingMode::Mono, &s);
    for seed in 0..4 {
        run_mono(&mut comp, &noise(seed, 1024));
        for j in [0, 2] {
            assert_eq!(comp.band_meters(0, j).expect("band").gain, GAIN_AMP_M_36_DB);
        }
        assert_ne!(comp.band_meters(0, 1).expect("band").gain, GAIN_AMP_M_36_DB);
    }
}

#[test]
fn classic_band_sum_is_the_dry_allpass() {
    let mut comp = engine(OperatingMode::Mono, &transparent(CrossoverMode::Classic));
    let x = noise(5, 6000);
    let y = run_mono(&mut comp, &x);

    let mut xover = Crossover::new();
    xover.set_sample_rate(SR);
    xover.set_bands(3);
    xover.set_split(0, 200.0);
    xover.set_split(1, 2000.0);
    xover.update_settings();
    let mut dry = x.clone();
    xover.process_dry(&mut dry);

    for (a, b) in y.iter().zip(dry.iter()) {
        assert_approx_eq!(f32, *a, *b, epsilon = 1e-3);
    }
}

#[test]
fn fft_band_sum_is_the_delayed_input() {
    let mut comp = engine(OperatingMode::Mono, &transparent(CrossoverMode::LinearPhase));
    let latency = comp.latency();
    assert_eq!(latency, 8192);

    let x = noise(6, latency * 3);
    let y = run_mono(&mut comp, &x);
    for i in 0..latency * 2 {
        assert_approx_eq!(f32, y[i + latency], x[i], epsilon = 1e-3);
    }
}

#[test]
fn modern_mode_is_transparent_at_unity() {
    let mut comp = engine(OperatingMode::Mono, &transparent(CrossoverMode::Modern));
    let x = noise(7, 5000);
    let y = run_mono(&mut comp, &x);
    for (a, b) in x.iter().zip(y.iter()) {
        assert_approx_eq!(f32, *a, *b, epsilon = 1e-4);
    }
}

#[test]
fn mid_side_round_trip_is_transparent() {
    let mut comp = engine(OperatingMode::MidSide, &transparent(CrossoverMode::Modern));
    let l = noise(8, 2048);
    let r = noise(9, 2048);
    let (ol, or) = run_stereo(&mut comp, &l, &r);
    for i in 0..2048 {
        assert_approx_eq!(f32, ol[i], l[i], epsilon = 1e-4);
        assert_approx_eq!(f32, or[i], r[i], epsilon = 1e-4);
    }
}

#[test]
fn left_right_mode_uses_second_band_set() {
    let mut s = Settings::default();
    let mut second = s.bands;
    second[0].mute = true;
    s.channel_bands = Some(second);

    let x = noise(10, 1024);
    let mut comp = engine(OperatingMode::LeftRight, &s);
    run_stereo(&mut comp, &x, &x);
    assert_ne!(comp.band_meters(0, 0).expect("band").gain, GAIN_AMP_M_36_DB);
    assert_eq!(comp.band_meters(1, 0).expect("band").gain, GAIN_AMP_M_36_DB);

    // Stereo mode links both channels to the first set
    let mut comp = engine(OperatingMode::Stereo, &s);
    run_stereo(&mut comp, &x, &x);
    assert_ne!(comp.band_meters(1, 0).expect("band").gain, GAIN_AMP_M_36_DB);
}

#[test]
fn bypass_crossfades_to_dry() {
    let mut s = Settings::default();
    s.crossover.mode = CrossoverMode::Modern;
    s.bands[0].makeup = 12.0;
    let mut comp = engine(OperatingMode::Mono, &s);
    let x = noise(11, 1024);
    run_mono(&mut comp, &x);

    s.bypass = true;
    comp.apply(&s);
    let y = run_mono(&mut comp, &x);
    // 5 ms crossfade, then the input
    for i in 300..1024 {
        assert_approx_eq!(f32, y[i], x[i], epsilon = 1e-6);
    }
}

#[test]
fn meshes_follow_band_state() {
    let mut comp = engine(OperatingMode::Mono, &middle_band_only());
    run_mono(&mut comp, &noise(12, 512));

    let curve = comp.band_curve(0, 1).expect("band 1");
    assert_eq!(curve.len(), 256);
    let disabled = comp.band_curve(0, 0).expect("band 0");
    assert!(!disabled.is_empty());
    assert_eq!(disabled.len(), 0);

    let amp = comp.amplitude_response(0).expect("channel 0");
    assert_eq!(amp.len(), FFT_MESH_POINTS);

    // Consumed meshes only come back after a change
    comp.band_curve_mut(0, 1).expect("band 1").consume();
    run_mono(&mut comp, &noise(13, 512));
    assert!(comp.band_curve(0, 1).expect("band 1").is_empty());

    let mut s = middle_band_only();
    s.bands[1].makeup = 6.0;
    comp.apply(&s);
    run_mono(&mut comp, &noise(14, 512));
    let (x, y) = comp.band_curve(0, 1).expect("band 1").data().expect("curve");
    let i = x.iter().position(|&v| v >= db_to_gain(-24.0)).expect("point");
    assert_approx_eq!(f32, gain_to_db(y[i] / x[i]), 6.0, epsilon = 0.1);
}

#[test]
fn settings_survive_text_round_trip() {
    let mut s = Settings::default();
    s.lookahead = 3.5;
    s.crossover.mode = CrossoverMode::LinearPhase;
    s.crossover.extra_band = true;
    s.sidechain.kind = SidechainType::Link;
    s.bands[2].knee = 6.0;
    s.bands[3].solo = true;
    s.channel_bands = Some([BandSettings::default(); 4]);

    let toml = s.to_toml_string().expect("toml");
    assert_eq!(Settings::from_toml_str(&toml).expect("parse"), s);
    let json = s.to_json_string().expect("json");
    assert_eq!(Settings::from_json_str(&json).expect("parse"), s);
}

#[test]
fn uninitialized_engine_refuses_to_process() {
    let mut comp = Compressor::new(OperatingMode::Mono);
    let x = vec![0.5; 64];
    let mut out = vec![0.0; 64];
    let mut outs = [out.as_mut_slice()];
    assert_eq!(
        comp.process(&mut ProcessBuffers::new(&[x.as_slice()], &mut outs)),
        Err(EngineError::NotReady)
    );
    assert!(comp.band_curve(0, 0).is_none());
}

#[test]
fn odd_block_sizes_match_one_large_block() {
    let s = transparent(CrossoverMode::Classic);
    let x = noise(15, 10000);
    let mut a = engine(OperatingMode::Mono, &s);
    let whole = run_mono(&mut a, &x);

    let mut b = engine(OperatingMode::Mono, &s);
    let mut pieces = Vec::new();
    for chunk in x.chunks(333) {
        pieces.extend(run_mono(&mut b, chunk));
    }
    for (p, q) in whole.iter().zip(pieces.iter()) {
        assert_approx_eq!(f32, *p, *q, epsilon = 1e-6);
    }
}
