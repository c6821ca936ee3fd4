// SPDX-License-Identifier: LGPL-3.0-or-later

//! Top-level multiband compressor.

use gott_dsp_lib::float::copy_saturated;
use gott_dsp_lib::msmatrix::{lr_to_ms_inplace, ms_to_lr_inplace};
use gott_dsp_lib::pmath::{copy, mul_k1};
use gott_dsp_lib::types::DspContext;
use gott_dsp_units::consts::{SPEC_FREQ_MAX, SPEC_FREQ_MIN};
use gott_dsp_units::ctl::Counter;
use gott_dsp_units::dynamics::surge_protector::{SurgeProtector, SurgeState};
use gott_dsp_units::units::{ceil_log2, db_to_gain, millis_to_samples};
use gott_dsp_units::util::delay::Delay;
use gott_dsp_units::util::sidechain::{Sidechain, SidechainMode, SidechainSource};

use crate::band::BandMeters;
use crate::channel::Channel;
use crate::config::{CrossoverMode, OperatingMode, Settings, SidechainType};
use crate::error::EngineError;
use crate::meta::{
    BUFFER_SIZE, CURVE_DB_MAX, CURVE_DB_MIN, CURVE_MESH_SIZE, FFT_MESH_POINTS, FFT_XOVER_FREQ_MIN,
    FFT_XOVER_RANK_MIN, LOOKAHEAD, REACTIVITY, REFRESH_RATE, SURGE_OFF_THRESH_DB,
    SURGE_ON_THRESH_DB, SURGE_SHUTDOWN_TIME,
};
use crate::mesh::Mesh;

/// Default sample rate before the host sets one.
const DEFAULT_SAMPLE_RATE: f32 = 48000.0;

/// Audio buffers for one [`Compressor::process`] call.
///
/// `inputs` and `outputs` need one buffer per channel of the operating
/// mode; every buffer must hold at least `inputs[0].len()` samples.
/// Absent `sidechain` and `link` buffers read as silence.
#[derive(Debug)]
pub struct ProcessBuffers<'a, 'b> {
    /// Input channels.
    pub inputs: &'a [&'b [f32]],
    /// Output channels.
    pub outputs: &'a mut [&'b mut [f32]],
    /// External sidechain channels.
    pub sidechain: Option<&'a [&'b [f32]]>,
    /// Shared link channels.
    pub link: Option<&'a [&'b [f32]]>,
}

impl<'a, 'b> ProcessBuffers<'a, 'b> {
    /// Buffers without sidechain or link.
    pub fn new(inputs: &'a [&'b [f32]], outputs: &'a mut [&'b mut [f32]]) -> Self {
        Self {
            inputs,
            outputs,
            sidechain: None,
            link: None,
        }
    }

    /// Attach external sidechain channels.
    pub fn with_sidechain(mut self, sidechain: &'a [&'b [f32]]) -> Self {
        self.sidechain = Some(sidechain);
        self
    }

    /// Attach link channels.
    pub fn with_link(mut self, link: &'a [&'b [f32]]) -> Self {
        self.link = Some(link);
        self
    }
}

/// FFT rank of the linear-phase crossover at `sr`.
pub(crate) fn fft_rank(sr: f32) -> usize {
    let ratio = (sr / FFT_XOVER_FREQ_MIN).ceil().max(1.0) as usize;
    FFT_XOVER_RANK_MIN + ceil_log2(ratio)
}

/// Multiband compressor with upward and downward sections per band.
///
/// The engine is inert until [`init`](Self::init) allocates it. Settings
/// are staged with [`apply`](Self::apply) and take effect at the next
/// [`update_settings`](Self::update_settings) or
/// [`process`](Self::process).
///
/// # Examples
/// ```
/// use gott_compressor::{Compressor, OperatingMode, ProcessBuffers, Settings};
///
/// let mut comp = Compressor::new(OperatingMode::Mono);
/// comp.init();
/// comp.set_sample_rate(48000.0);
/// comp.apply(&Settings::default());
///
/// let input = vec![0.1f32; 512];
/// let mut output = vec![0.0f32; 512];
/// let mut outs = [output.as_mut_slice()];
/// comp.process(&mut ProcessBuffers::new(&[input.as_slice()], &mut outs))
///     .expect("engine is ready");
/// ```
#[derive(Debug)]
pub struct Compressor {
    mode: OperatingMode,
    ready: bool,
    sample_rate: f32,
    settings: Settings,
    pending: bool,
    channels: Vec<Channel>,
    sc_bufs: [Vec<f32>; 2],
    surge_sc: Sidechain,
    surge: SurgeProtector,
    surge_env: Vec<f32>,
    surge_gain: Vec<f32>,
    surge_delay: Delay,
    surge_state: SurgeState,
    counter: Counter,
    curve_x: Vec<f32>,
    freqs: Vec<f32>,
    xover_mode: CrossoverMode,
    latency: usize,
}

impl Compressor {
    /// Create an uninitialized engine for `mode`.
    pub fn new(mode: OperatingMode) -> Self {
        Self {
            mode,
            ready: false,
            sample_rate: DEFAULT_SAMPLE_RATE,
            settings: Settings::default(),
            pending: true,
            channels: Vec::new(),
            sc_bufs: [Vec::new(), Vec::new()],
            surge_sc: Sidechain::new(),
            surge: SurgeProtector::new(),
            surge_env: Vec::new(),
            surge_gain: Vec::new(),
            surge_delay: Delay::new(),
            surge_state: SurgeState::Normal,
            counter: Counter::new(),
            curve_x: Vec::new(),
            freqs: Vec::new(),
            xover_mode: CrossoverMode::default(),
            latency: 0,
        }
    }

    /// Allocate channels, bands and buffers.
    pub fn init(&mut self) {
        let channels = self.mode.channels();
        let rank = fft_rank(self.sample_rate);

        self.channels = (0..channels)
            .map(|_| {
                let mut c = Channel::new(rank);
                c.init(channels);
                c
            })
            .collect();
        self.sc_bufs = [vec![0.0; BUFFER_SIZE], vec![0.0; BUFFER_SIZE]];
        self.surge_env = vec![0.0; BUFFER_SIZE];
        self.surge_gain = vec![1.0; BUFFER_SIZE];

        self.surge_sc.init(channels, REACTIVITY.max);
        self.surge_sc.set_mode(SidechainMode::Rms);
        self.surge_sc.set_source(SidechainSource::Max);
        self.surge_sc.set_mid_side(self.mode == OperatingMode::MidSide);
        self.surge.set_on_threshold(db_to_gain(SURGE_ON_THRESH_DB));
        self.surge.set_off_threshold(db_to_gain(SURGE_OFF_THRESH_DB));
        self.surge.set_shutdown_time(SURGE_SHUTDOWN_TIME);

        let delta = (CURVE_DB_MAX - CURVE_DB_MIN) / (CURVE_MESH_SIZE - 1) as f32;
        self.curve_x = (0..CURVE_MESH_SIZE)
            .map(|i| db_to_gain(CURVE_DB_MIN + delta * i as f32))
            .collect();
        let span = (SPEC_FREQ_MAX / SPEC_FREQ_MIN).ln();
        self.freqs = (0..FFT_MESH_POINTS)
            .map(|i| SPEC_FREQ_MIN * (span * i as f32 / (FFT_MESH_POINTS - 1) as f32).exp())
            .collect();

        self.counter.set_frequency(REFRESH_RATE, true);
        self.ready = true;

        #[cfg(feature = "tracing")]
        tracing::debug!(mode = ?self.mode, channels, "compressor initialized");

        self.set_sample_rate(self.sample_rate);
    }

    /// The engine is allocated.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Operating mode.
    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Current sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Settings in use (after clamping).
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Change the sample rate.
    ///
    /// Reallocates the delay lines and the linear-phase crossover and
    /// re-applies the settings at the next update.
    pub fn set_sample_rate(&mut self, sr: f32) {
        if sr.is_nan() || sr <= 0.0 {
            return;
        }
        self.sample_rate = sr;
        if !self.ready {
            return;
        }

        let rank = fft_rank(sr);
        let max_lookahead = millis_to_samples(sr, LOOKAHEAD.max).ceil() as usize;
        for c in &mut self.channels {
            c.set_sample_rate(sr, rank, max_lookahead);
        }
        let fft_latency = self.fft_latency();

        self.surge_sc.set_sample_rate(sr);
        self.surge.set_sample_rate(sr);
        self.surge_delay.init(fft_latency);
        self.counter.set_sample_rate(sr as usize, true);
        self.counter.request();
        self.pending = true;

        #[cfg(feature = "tracing")]
        tracing::debug!(sample_rate = sr, fft_rank = rank, fft_latency, "sample rate changed");
    }

    /// Stage new settings. Values are clamped into their ranges.
    pub fn apply(&mut self, settings: &Settings) {
        self.settings = settings.clamped();
        self.pending = true;
    }

    /// Push staged settings into the DSP units.
    ///
    /// Returns `true` when a crossover was rebuilt. A second call without
    /// new settings does nothing.
    pub fn update_settings(&mut self) -> bool {
        if !self.ready || !self.pending {
            return false;
        }
        self.pending = false;

        let s = &self.settings;
        let mode = self.mode;
        let mid_side = mode == OperatingMode::MidSide;
        let lookahead = millis_to_samples(self.sample_rate, s.lookahead) as usize;
        let bands = s.crossover.bands();

        let mut rebuild = false;
        for (i, c) in self.channels.iter_mut().enumerate() {
            rebuild |= c.configure_crossover(&s.crossover);
            c.set_lookahead(lookahead);
            c.set_bypass(s.bypass);
            c.configure_sidechain(&s.sidechain, mid_side);
            c.configure_bands(s.bands_for(i, mode));
        }

        // Fade no faster than the slowest band reacts
        let attack = (0..self.channels.len())
            .flat_map(|i| s.bands_for(i, mode)[..bands].iter())
            .filter(|b| b.enabled)
            .map(|b| b.attack)
            .fold(0.0f32, f32::max);
        self.surge_sc.set_reactivity(s.sidechain.reactivity);
        self.surge.set_transition_time(attack + s.sidechain.reactivity);
        self.surge.set_enabled(s.surge_protection);

        let linear = s.crossover.mode == CrossoverMode::LinearPhase;
        let fft_latency = self.channels.first().map_or(0, Channel::fft_latency);
        if s.crossover.mode != self.xover_mode {
            self.surge_delay.clear();
            self.xover_mode = s.crossover.mode;
        }
        self.surge_delay.set_delay(if linear { fft_latency } else { 0 });

        let latency = lookahead + if linear { fft_latency } else { 0 };
        if latency != self.latency {
            #[cfg(feature = "tracing")]
            tracing::debug!(from = self.latency, to = latency, "latency changed");
            self.latency = latency;
        }

        #[cfg(feature = "tracing")]
        if rebuild {
            tracing::debug!(mode = ?s.crossover.mode, bands, splits = ?s.crossover.splits, "crossover rebuilt");
        }

        rebuild
    }

    /// Output latency in samples: lookahead plus the linear-phase
    /// crossover delay when that mode is active.
    pub fn latency(&self) -> usize {
        self.latency
    }

    fn fft_latency(&self) -> usize {
        self.channels.first().map_or(0, Channel::fft_latency)
    }

    /// Clear all filter, detector and delay state.
    pub fn clear(&mut self) {
        for c in &mut self.channels {
            c.clear();
        }
        self.surge_sc.reset();
        self.surge.reset();
        self.surge_delay.clear();
    }

    /// State of the surge protector.
    pub fn surge_state(&self) -> SurgeState {
        self.surge.state()
    }

    /// Peak input level of channel `ch` in the last block, after input
    /// gain.
    pub fn in_level(&self, ch: usize) -> Option<f32> {
        self.channels.get(ch).map(Channel::in_level)
    }

    /// Peak output level of channel `ch` in the last block.
    pub fn out_level(&self, ch: usize) -> Option<f32> {
        self.channels.get(ch).map(Channel::out_level)
    }

    /// Meters of one band.
    pub fn band_meters(&self, ch: usize, band: usize) -> Option<BandMeters> {
        self.channels.get(ch)?.band_meters(band)
    }

    /// Compression curve of one band.
    pub fn band_curve(&self, ch: usize, band: usize) -> Option<&Mesh> {
        Some(self.channels.get(ch)?.band(band)?.curve_mesh())
    }

    /// Compression curve of one band, for consuming.
    pub fn band_curve_mut(&mut self, ch: usize, band: usize) -> Option<&mut Mesh> {
        Some(self.channels.get_mut(ch)?.band_mut(band)?.curve_mesh_mut())
    }

    /// Response of one band's sidechain filters.
    pub fn band_filter_chart(&self, ch: usize, band: usize) -> Option<&Mesh> {
        Some(self.channels.get(ch)?.band(band)?.filter_mesh())
    }

    /// Response of one band's sidechain filters, for consuming.
    pub fn band_filter_chart_mut(&mut self, ch: usize, band: usize) -> Option<&mut Mesh> {
        Some(self.channels.get_mut(ch)?.band_mut(band)?.filter_mesh_mut())
    }

    /// Amplitude response of channel `ch` at the current band gains.
    pub fn amplitude_response(&self, ch: usize) -> Option<&Mesh> {
        self.channels.get(ch).map(Channel::amp_mesh)
    }

    /// Amplitude response of channel `ch`, for consuming.
    pub fn amplitude_response_mut(&mut self, ch: usize) -> Option<&mut Mesh> {
        self.channels.get_mut(ch).map(Channel::amp_mesh_mut)
    }

    fn check(&self, io: &ProcessBuffers<'_, '_>) -> Result<usize, EngineError> {
        let channels = self.channels.len();
        let count = |what, got| {
            if got < channels {
                Err(EngineError::ChannelMismatch {
                    what,
                    expected: channels,
                    got,
                })
            } else {
                Ok(())
            }
        };
        count("input", io.inputs.len())?;
        count("output", io.outputs.len())?;

        let samples = io.inputs.first().map_or(0, |b| b.len());
        let length = |what, got| {
            if got < samples {
                Err(EngineError::BlockMismatch {
                    what,
                    expected: samples,
                    got,
                })
            } else {
                Ok(())
            }
        };
        for i in 0..channels {
            length("input", io.inputs[i].len())?;
            length("output", io.outputs[i].len())?;
        }
        for (what, bufs) in [("sidechain", io.sidechain), ("link", io.link)] {
            if let Some(bufs) = bufs {
                count(what, bufs.len())?;
                for b in &bufs[..channels] {
                    length(what, b.len())?;
                }
            }
        }
        Ok(samples)
    }

    /// Process one block.
    ///
    /// Applies staged settings first. Fails without touching the outputs
    /// when the engine is not initialized or the buffers do not fit the
    /// operating mode.
    pub fn process(&mut self, io: &mut ProcessBuffers<'_, '_>) -> Result<(), EngineError> {
        if !self.ready {
            return Err(EngineError::NotReady);
        }
        let samples = self.check(io)?;
        self.update_settings();

        // Denormals flushed for the whole block
        let mut ctx = DspContext::default();
        ctx.start();

        let channels = self.channels.len();
        let in_gain = self.settings.input_gain;
        let out_gain = self.settings.output_gain;
        let wet_gain = self.settings.wet_gain;
        let dry_gain = self.settings.dry_gain;
        let kind = self.settings.sidechain.kind;
        let xmode = self.settings.crossover.mode;
        let bands = self.settings.crossover.bands();
        let mid_side = self.mode == OperatingMode::MidSide;
        let internal = kind == SidechainType::Internal;

        let mut offset = 0;
        while offset < samples {
            let n = (samples - offset).min(BUFFER_SIZE);
            let range = offset..offset + n;

            // Input gain and stereo transform
            for (c, ch) in self.channels.iter_mut().enumerate() {
                ch.load_input(&io.inputs[c][range.clone()], in_gain);
            }
            if mid_side {
                if let [l, r] = self.channels.as_mut_slice() {
                    lr_to_ms_inplace(l.io_mut(n).0, r.io_mut(n).0);
                }
            }

            // Sidechain source
            let external = match kind {
                SidechainType::Internal => None,
                SidechainType::External => Some(io.sidechain),
                SidechainType::Link => Some(io.link),
            };
            for c in 0..channels {
                let dst = &mut self.sc_bufs[c][..n];
                match external {
                    None => copy(dst, self.channels[c].buffer(n)),
                    Some(Some(bufs)) => {
                        copy_saturated(dst, &bufs[c][range.clone()]);
                        mul_k1(dst, in_gain);
                    }
                    Some(None) => dst.fill(0.0),
                }
            }
            if mid_side && external.is_some() {
                let [a, b] = &mut self.sc_bufs;
                lr_to_ms_inplace(&mut a[..n], &mut b[..n]);
            }
            for (c, ch) in self.channels.iter_mut().enumerate() {
                ch.prepare_sidechain(&mut self.sc_bufs[c][..n], xmode);
            }

            // Surge protection keyed on the raw input
            if internal {
                let raw: [&[f32]; 2] = [
                    self.channels[0].buffer(n),
                    self.channels[channels - 1].buffer(n),
                ];
                self.surge_sc.process(&mut self.surge_env[..n], &raw[..channels]);
                self.surge.process(&mut self.surge_gain[..n], &self.surge_env[..n]);
                if xmode == CrossoverMode::LinearPhase {
                    self.surge_delay.process_inplace(&mut self.surge_gain[..n]);
                }
                self.trace_surge();
            }

            // Detection and VCA
            let sc: [&[f32]; 2] = [&self.sc_bufs[0][..n], &self.sc_bufs[1][..n]];
            let surge = internal.then_some(&self.surge_gain[..n]);
            for ch in &mut self.channels {
                ch.detect(&sc[..channels], n, bands, xmode == CrossoverMode::Modern);
                ch.apply_vca(n, bands, surge);
            }

            // Reconstruction
            for ch in &mut self.channels {
                ch.reconstruct(n, bands, xmode);
            }
            if mid_side {
                if let [l, r] = self.channels.as_mut_slice() {
                    let (lw, ld) = l.io_mut(n);
                    let (rw, rd) = r.io_mut(n);
                    ms_to_lr_inplace(lw, rw);
                    ms_to_lr_inplace(ld, rd);
                }
            }

            for (c, ch) in self.channels.iter_mut().enumerate() {
                ch.finish(&mut io.outputs[c][range.clone()], xmode, wet_gain, dry_gain, out_gain);
            }

            offset += n;
        }

        let refresh = self.counter.submit(samples);
        for ch in &mut self.channels {
            ch.update_meshes(&self.curve_x, &self.freqs, refresh, bands);
        }
        if refresh {
            self.counter.commit();
        }

        ctx.finish();
        Ok(())
    }

    fn trace_surge(&mut self) {
        let state = self.surge.state();
        if state != self.surge_state {
            #[cfg(feature = "tracing")]
            tracing::trace!(from = ?self.surge_state, to = ?state, "surge protector");
            self.surge_state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_follows_sample_rate() {
        assert_eq!(fft_rank(44100.0), 12);
        assert_eq!(fft_rank(48000.0), 13);
        assert_eq!(fft_rank(96000.0), 14);
        assert_eq!(fft_rank(192000.0), 15);
    }

    #[test]
    fn not_ready_until_init() {
        let mut comp = Compressor::new(OperatingMode::Stereo);
        assert!(!comp.is_ready());
        assert!(!comp.update_settings());
        let input = vec![0.0f32; 16];
        let mut out = vec![7.0f32; 16];
        let mut outs = [out.as_mut_slice()];
        let inputs = [input.as_slice(), input.as_slice()];
        let err = comp.process(&mut ProcessBuffers::new(&inputs, &mut outs));
        assert_eq!(err, Err(EngineError::NotReady));
        assert!(out.iter().all(|&s| s == 7.0));
    }

    #[test]
    fn channel_count_is_checked() {
        let mut comp = Compressor::new(OperatingMode::Stereo);
        comp.init();
        let input = vec![0.0f32; 16];
        let mut out = vec![0.0f32; 16];
        let mut outs = [out.as_mut_slice()];
        let err = comp.process(&mut ProcessBuffers::new(&[input.as_slice()], &mut outs));
        assert_eq!(
            err,
            Err(EngineError::ChannelMismatch {
                what: "input",
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn short_output_is_rejected() {
        let mut comp = Compressor::new(OperatingMode::Mono);
        comp.init();
        let input = vec![0.0f32; 32];
        let mut out = vec![0.0f32; 16];
        let mut outs = [out.as_mut_slice()];
        let err = comp.process(&mut ProcessBuffers::new(&[input.as_slice()], &mut outs));
        assert_eq!(
            err,
            Err(EngineError::BlockMismatch {
                what: "output",
                expected: 32,
                got: 16
            })
        );
    }

    #[test]
    fn settings_are_clamped_on_apply() {
        let mut comp = Compressor::new(OperatingMode::Mono);
        let mut s = Settings::default();
        s.lookahead = 500.0;
        s.bands[0].down_ratio = 0.0;
        comp.apply(&s);
        assert_eq!(comp.settings().lookahead, LOOKAHEAD.max);
        assert_eq!(comp.settings().bands[0].down_ratio, 1.0);
    }

    #[test]
    fn meters_are_per_channel() {
        let mut comp = Compressor::new(OperatingMode::Mono);
        comp.init();
        assert!(comp.in_level(0).is_some());
        assert!(comp.in_level(1).is_none());
        assert!(comp.band_meters(0, 3).is_some());
        assert!(comp.band_meters(0, 4).is_none());
        assert!(comp.band_curve(1, 0).is_none());
    }
}
