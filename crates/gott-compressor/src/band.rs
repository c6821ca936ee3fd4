// SPDX-License-Identifier: LGPL-3.0-or-later

//! One compressor band.
//!
//! A band filters the wideband sidechain into its own frequency range,
//! detects the level, runs it through the three-dot dynamics curve and
//! produces the VCA (gain) signal the crossover applies to the band's
//! audio.

use std::f32::consts::FRAC_1_SQRT_2;

use gott_dsp_lib::pmath::{abs_max, limit, mul_k1, mul2};
use gott_dsp_units::consts::{
    GAIN_AMP_0_DB, GAIN_AMP_M_36_DB, GAIN_AMP_M_72_DB, GAIN_AMP_P_72_DB, SPEC_FREQ_MAX,
    SPEC_FREQ_MIN,
};
use gott_dsp_units::dynamics::processor::{DynamicProcessor, band_dots};
use gott_dsp_units::filters::coeffs::FilterType;
use gott_dsp_units::filters::filter::{Filter, FilterParams};
use gott_dsp_units::units::db_to_gain;
use gott_dsp_units::util::sidechain::{Sidechain, SidechainMode, SidechainSource};

use crate::config::BandSettings;
use crate::meta::{BUFFER_SIZE, CURVE_MESH_SIZE, FILTER_MESH_POINTS, REACTIVITY};
use crate::mesh::Mesh;

/// Sections of the band-limiting sidechain filters.
const SC_EQ_SLOPE: usize = 2;

bitflags::bitflags! {
    /// Meshes waiting for an update.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Sync: u8 {
        const CURVE = 1 << 0;
        const EQ = 1 << 1;
    }
}

/// Levels of one band after the last block.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BandMeters {
    /// Peak of the detector envelope.
    pub envelope: f32,
    /// Curve output at that envelope, including makeup.
    pub curve: f32,
    /// Last VCA value.
    pub gain: f32,
}

/// High-pass / low-pass pair confining the detector to the band.
#[derive(Debug, Clone)]
struct BandEq {
    hpf: Filter,
    lpf: Filter,
}

impl BandEq {
    fn new() -> Self {
        Self {
            hpf: Filter::new(),
            lpf: Filter::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Band {
    sc: Sidechain,
    eq: [BandEq; 2],
    proc: DynamicProcessor,
    sc_buf: [Vec<f32>; 2],
    level: Vec<f32>,
    env: Vec<f32>,
    vca: Vec<f32>,
    makeup: f32,
    enabled: bool,
    solo: bool,
    mute: bool,
    edges: (Option<f32>, Option<f32>),
    meters: BandMeters,
    sync: Sync,
    curve_mesh: Mesh,
    filter_mesh: Mesh,
}

impl Band {
    pub(crate) fn new() -> Self {
        Self {
            sc: Sidechain::new(),
            eq: [BandEq::new(), BandEq::new()],
            proc: DynamicProcessor::new(),
            sc_buf: [vec![0.0; BUFFER_SIZE], vec![0.0; BUFFER_SIZE]],
            level: vec![0.0; BUFFER_SIZE],
            env: vec![0.0; BUFFER_SIZE],
            vca: vec![GAIN_AMP_0_DB; BUFFER_SIZE],
            makeup: GAIN_AMP_0_DB,
            enabled: true,
            solo: false,
            mute: false,
            edges: (None, None),
            meters: BandMeters {
                gain: GAIN_AMP_0_DB,
                ..BandMeters::default()
            },
            sync: Sync::all(),
            curve_mesh: Mesh::new(CURVE_MESH_SIZE),
            filter_mesh: Mesh::new(FILTER_MESH_POINTS),
        }
    }

    /// Size the detector for `channels` sidechain channels.
    pub(crate) fn init(&mut self, channels: usize) {
        self.sc.init(channels, REACTIVITY.max);
    }

    pub(crate) fn set_sample_rate(&mut self, sr: f32) {
        self.sc.set_sample_rate(sr);
        self.proc.set_sample_rate(sr);
        for eq in &mut self.eq {
            eq.hpf.set_sample_rate(sr);
            eq.lpf.set_sample_rate(sr);
        }
        self.sync |= Sync::EQ;
    }

    /// Apply band parameters.
    ///
    /// The thresholds are forced into `min < up < down` whatever order
    /// they arrive in.
    pub(crate) fn configure(&mut self, s: &BandSettings) {
        let [down, up, min] = band_dots(
            db_to_gain(s.min_threshold),
            db_to_gain(s.up_threshold),
            db_to_gain(s.down_threshold),
            s.up_ratio,
            db_to_gain(s.knee),
        );

        self.proc
            .set_attack_time(s.attack)
            .set_release_time(s.release)
            .set_dot(0, Some(down))
            .set_dot(1, Some(up))
            .set_dot(2, Some(min))
            .set_dot(3, None)
            .set_in_ratio(1.0)
            .set_out_ratio(s.down_ratio);

        let makeup = db_to_gain(s.makeup);
        if self.proc.modified() || self.makeup != makeup {
            self.proc.update_settings();
            self.makeup = makeup;
            self.sync |= Sync::CURVE;
        }
        if self.enabled != s.enabled {
            self.enabled = s.enabled;
            self.sync |= Sync::CURVE;
        }
        self.solo = s.solo;
        self.mute = s.mute;
    }

    /// Configure the detector.
    pub(crate) fn set_sidechain(
        &mut self,
        mode: SidechainMode,
        source: SidechainSource,
        mid_side: bool,
        reactivity: f32,
        preamp: f32,
    ) {
        self.sc.set_mode(mode);
        self.sc.set_source(source);
        self.sc.set_mid_side(mid_side);
        self.sc.set_reactivity(reactivity);
        if self.sc.preamp() != preamp {
            self.sc.set_preamp(preamp);
            self.sync |= Sync::EQ;
        }
    }

    /// Set the band edges: high-pass at `lower`, low-pass at `upper`.
    /// `None` leaves that side open.
    pub(crate) fn set_edges(&mut self, lower: Option<f32>, upper: Option<f32>) {
        if self.edges == (lower, upper) {
            return;
        }
        self.edges = (lower, upper);

        let edge = |ft: FilterType, freq: Option<f32>| match freq {
            Some(f) => FilterParams {
                filter_type: ft,
                frequency: f,
                slope: SC_EQ_SLOPE,
                q: FRAC_1_SQRT_2,
                gain: 0.0,
            },
            None => FilterParams::default(),
        };
        let hp = edge(FilterType::Highpass, lower);
        let lp = edge(FilterType::Lowpass, upper);
        for eq in &mut self.eq {
            eq.hpf.set_params(hp).update_settings();
            eq.lpf.set_params(lp).update_settings();
        }
        self.sync |= Sync::EQ;
    }

    pub(crate) fn enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn solo(&self) -> bool {
        self.solo
    }

    pub(crate) fn mute(&self) -> bool {
        self.mute
    }

    pub(crate) fn meters(&self) -> BandMeters {
        self.meters
    }

    pub(crate) fn vca(&self, n: usize) -> &[f32] {
        &self.vca[..n]
    }

    pub(crate) fn curve_mesh(&self) -> &Mesh {
        &self.curve_mesh
    }

    pub(crate) fn curve_mesh_mut(&mut self) -> &mut Mesh {
        &mut self.curve_mesh
    }

    pub(crate) fn filter_mesh(&self) -> &Mesh {
        &self.filter_mesh
    }

    pub(crate) fn filter_mesh_mut(&mut self) -> &mut Mesh {
        &mut self.filter_mesh
    }

    pub(crate) fn clear(&mut self) {
        self.sc.reset();
        self.proc.clear();
        for eq in &mut self.eq {
            eq.hpf.clear();
            eq.lpf.clear();
        }
    }

    /// Compute the VCA for the first `n` samples of `sc`.
    ///
    /// `modern` limits the gain to +/-72 dB before makeup.
    pub(crate) fn process(&mut self, sc: &[&[f32]], n: usize, modern: bool) {
        let n = n.min(BUFFER_SIZE);
        let channels = sc.len().min(2);
        for (c, src) in sc.iter().enumerate().take(channels) {
            let buf = &mut self.sc_buf[c][..n];
            self.eq[c].hpf.process(buf, &src[..n]);
            self.eq[c].lpf.process_inplace(buf);
        }

        let inputs: [&[f32]; 2] = [&self.sc_buf[0][..n], &self.sc_buf[1][..n]];
        self.sc.process(&mut self.level[..n], &inputs[..channels]);

        let vca = &mut self.vca[..n];
        if !self.enabled {
            vca.fill(GAIN_AMP_0_DB);
            self.meters.envelope = 0.0;
            self.meters.curve = 0.0;
            return;
        }

        let env = &mut self.env[..n];
        self.proc.process(vca, Some(env), &self.level[..n]);
        if modern {
            limit(vca, GAIN_AMP_M_72_DB, GAIN_AMP_P_72_DB);
        }
        mul_k1(vca, self.makeup);

        let lvl = abs_max(env);
        self.meters.envelope = lvl;
        self.meters.curve = self.proc.curve_single(lvl) * self.makeup;
    }

    /// Multiply the VCA by `gain` sample by sample.
    pub(crate) fn apply_gain(&mut self, gain: &[f32]) {
        let n = gain.len().min(BUFFER_SIZE);
        mul2(&mut self.vca[..n], &gain[..n]);
    }

    /// Force the deep attenuation on a muted band and record the last
    /// gain.
    pub(crate) fn finish(&mut self, n: usize, muted: bool) {
        let vca = &mut self.vca[..n.min(BUFFER_SIZE)];
        if muted {
            vca.fill(GAIN_AMP_M_36_DB);
        }
        if let Some(last) = vca.last() {
            self.meters.gain = *last;
        }
    }

    /// Refresh the meshes that changed and were consumed.
    ///
    /// `curve_x` holds the input levels of the compression curve and
    /// `freqs` the frequencies of the filter chart.
    pub(crate) fn update_meshes(&mut self, curve_x: &[f32], freqs: &[f32]) {
        if self.sync.contains(Sync::CURVE) {
            let (enabled, makeup, proc) = (self.enabled, self.makeup, &self.proc);
            let done = self.curve_mesh.fill(|x, y| {
                if !enabled {
                    return 0;
                }
                let n = curve_x.len().min(x.len());
                x[..n].copy_from_slice(&curve_x[..n]);
                proc.curve(&mut y[..n], &curve_x[..n]);
                if makeup != GAIN_AMP_0_DB {
                    mul_k1(&mut y[..n], makeup);
                }
                n
            });
            if done {
                self.sync.remove(Sync::CURVE);
            }
        }

        if self.sync.contains(Sync::EQ) {
            let (eq, preamp) = (&self.eq[0], self.sc.preamp());
            let done = self.filter_mesh.fill(|x, y| {
                let n = freqs.len().min(x.len().saturating_sub(2));
                x[0] = SPEC_FREQ_MIN * 0.5;
                y[0] = 0.0;
                for (i, &f) in freqs[..n].iter().enumerate() {
                    let h = eq.hpf.freq_response(f) * eq.lpf.freq_response(f);
                    x[i + 1] = f;
                    y[i + 1] = h.norm() * preamp;
                }
                x[n + 1] = SPEC_FREQ_MAX * 2.0;
                y[n + 1] = 0.0;
                n + 2
            });
            if done {
                self.sync.remove(Sync::EQ);
            }
        }
    }
}
