// SPDX-License-Identifier: LGPL-3.0-or-later

//! One audio channel of the compressor: its bands, the three crossover
//! topologies, the lookahead and latency compensation delays, dry/wet
//! mixing and the bypass crossfade.

use std::f32::consts::FRAC_1_SQRT_2;

use gott_dsp_lib::mix::mix2;
use gott_dsp_lib::pmath::{abs_max, fmadd3, mul_k1, mul_k2};
use gott_dsp_units::ctl::Bypass;
use gott_dsp_units::filters::dynamic_filters::{
    DynamicFilterParams, DynamicFilterType, DynamicFilters,
};
use gott_dsp_units::filters::envelope_boost::EnvelopeBoostFilter;
use gott_dsp_units::util::crossover::Crossover;
use gott_dsp_units::util::delay::Delay;
use gott_dsp_units::util::fft_crossover::FftCrossover;

use crate::band::{Band, BandMeters};
use crate::config::{BandSettings, CrossoverMode, CrossoverSettings, SidechainSettings};
use crate::meta::{BANDS_MAX, BUFFER_SIZE, BYPASS_TIME, FFT_MESH_POINTS, FFT_XOVER_SLOPE};
use crate::mesh::Mesh;

/// Shelf sections of the modern-mode filters.
const DYN_FILTER_SLOPE: usize = 2;

#[derive(Debug, Clone)]
pub(crate) struct Channel {
    bands: Vec<Band>,
    boost: EnvelopeBoostFilter,
    crossover: Crossover,
    filters: DynamicFilters,
    fft: FftCrossover,
    /// Lookahead on the audio path.
    delay: Delay,
    /// Aligns the dry path with the linear-phase bands.
    dry_delay: Delay,
    /// Aligns the sidechain with the linear-phase bands.
    sc_delay: Delay,
    bypass: Bypass,
    buffer: Vec<f32>,
    dry: Vec<f32>,
    scratch: Vec<f32>,
    band_out: [Vec<f32>; BANDS_MAX],
    xover: Option<CrossoverSettings>,
    in_level: f32,
    out_level: f32,
    amp_mesh: Mesh,
}

impl Channel {
    pub(crate) fn new(rank: usize) -> Self {
        Self {
            bands: (0..BANDS_MAX).map(|_| Band::new()).collect(),
            boost: EnvelopeBoostFilter::new(),
            crossover: Crossover::new(),
            filters: DynamicFilters::new(BANDS_MAX),
            fft: FftCrossover::new(rank),
            delay: Delay::new(),
            dry_delay: Delay::new(),
            sc_delay: Delay::new(),
            bypass: Bypass::new(),
            buffer: vec![0.0; BUFFER_SIZE],
            dry: vec![0.0; BUFFER_SIZE],
            scratch: vec![0.0; BUFFER_SIZE],
            band_out: std::array::from_fn(|_| vec![0.0; BUFFER_SIZE]),
            xover: None,
            in_level: 0.0,
            out_level: 0.0,
            amp_mesh: Mesh::new(FFT_MESH_POINTS),
        }
    }

    /// Size the band detectors for `sc_channels` sidechain channels.
    pub(crate) fn init(&mut self, sc_channels: usize) {
        for b in &mut self.bands {
            b.init(sc_channels);
        }
    }

    /// Reconfigure every time-dependent unit. Delay contents are lost and
    /// the next [`configure_crossover`](Self::configure_crossover) rebuilds.
    pub(crate) fn set_sample_rate(&mut self, sr: f32, rank: usize, max_lookahead: usize) {
        for b in &mut self.bands {
            b.set_sample_rate(sr);
        }
        self.boost.set_sample_rate(sr).update_settings();
        self.crossover.set_sample_rate(sr);
        self.filters.set_sample_rate(sr);
        self.fft.set_rank(rank);
        self.fft.set_sample_rate(sr);

        let latency = self.fft.latency();
        self.delay.init(max_lookahead);
        self.dry_delay.init(latency);
        self.sc_delay.init(latency);
        self.bypass.init(sr as usize, BYPASS_TIME);
        self.xover = None;
    }

    /// Apply the crossover layout. Returns `true` when the filters were
    /// rebuilt.
    pub(crate) fn configure_crossover(&mut self, xs: &CrossoverSettings) -> bool {
        if self.xover.as_ref() == Some(xs) {
            return false;
        }
        let switched = self.xover.map(|x| x.mode) != Some(xs.mode);
        self.xover = Some(*xs);

        let bands = xs.bands();
        let splits = &xs.splits[..bands - 1];

        self.crossover.set_bands(bands);
        self.fft.set_bands(bands);
        self.fft.set_slope(FFT_XOVER_SLOPE);
        for (i, &f) in splits.iter().enumerate() {
            self.crossover.set_split(i, f);
            self.fft.set_split(i, f);
        }
        self.crossover.update_settings();
        for j in 0..BANDS_MAX {
            self.fft.enable_band(j, j < bands);
        }
        self.fft.update_settings();

        for j in 0..BANDS_MAX {
            let (filter_type, frequency, frequency2) = match j {
                _ if j >= bands => (DynamicFilterType::Off, splits[0], splits[0]),
                0 => (DynamicFilterType::LowShelf, splits[0], splits[0]),
                _ if j == bands - 1 => (DynamicFilterType::HighShelf, splits[j - 1], splits[j - 1]),
                _ => (DynamicFilterType::Ladder, splits[j - 1], splits[j]),
            };
            self.filters.set_params(
                j,
                DynamicFilterParams {
                    filter_type,
                    frequency,
                    frequency2,
                    slope: DYN_FILTER_SLOPE,
                    q: FRAC_1_SQRT_2,
                },
            );

            let lower = (j > 0).then(|| splits.get(j - 1).copied()).flatten();
            let upper = splits.get(j).copied();
            self.bands[j].set_edges(lower, upper);
        }

        let compensate = match xs.mode {
            CrossoverMode::LinearPhase => self.fft.latency(),
            _ => 0,
        };
        self.dry_delay.set_delay(compensate);
        self.sc_delay.set_delay(compensate);
        if switched {
            self.crossover.clear();
            self.filters.clear();
            self.fft.clear();
            self.dry_delay.clear();
            self.sc_delay.clear();
        }
        true
    }

    pub(crate) fn configure_sidechain(&mut self, s: &SidechainSettings, mid_side: bool) {
        self.boost.set_mode(s.boost.into()).update_settings();
        for b in &mut self.bands {
            b.set_sidechain(
                s.mode.into(),
                s.source.into(),
                mid_side,
                s.reactivity,
                s.preamp,
            );
        }
    }

    pub(crate) fn configure_bands(&mut self, settings: &[BandSettings; BANDS_MAX]) {
        for (b, s) in self.bands.iter_mut().zip(settings.iter()) {
            b.configure(s);
        }
    }

    pub(crate) fn set_lookahead(&mut self, samples: usize) {
        self.delay.set_delay(samples);
    }

    pub(crate) fn set_bypass(&mut self, bypass: bool) {
        self.bypass.set_bypass(bypass);
    }

    pub(crate) fn fft_latency(&self) -> usize {
        self.fft.latency()
    }

    pub(crate) fn in_level(&self) -> f32 {
        self.in_level
    }

    pub(crate) fn out_level(&self) -> f32 {
        self.out_level
    }

    pub(crate) fn band(&self, id: usize) -> Option<&Band> {
        self.bands.get(id)
    }

    pub(crate) fn band_mut(&mut self, id: usize) -> Option<&mut Band> {
        self.bands.get_mut(id)
    }

    pub(crate) fn band_meters(&self, id: usize) -> Option<BandMeters> {
        self.bands.get(id).map(Band::meters)
    }

    pub(crate) fn amp_mesh(&self) -> &Mesh {
        &self.amp_mesh
    }

    pub(crate) fn amp_mesh_mut(&mut self) -> &mut Mesh {
        &mut self.amp_mesh
    }

    /// Working buffer.
    pub(crate) fn buffer(&self, n: usize) -> &[f32] {
        &self.buffer[..n]
    }

    /// Working and dry buffers.
    pub(crate) fn io_mut(&mut self, n: usize) -> (&mut [f32], &mut [f32]) {
        (&mut self.buffer[..n], &mut self.dry[..n])
    }

    pub(crate) fn clear(&mut self) {
        for b in &mut self.bands {
            b.clear();
        }
        self.boost.clear();
        self.crossover.clear();
        self.filters.clear();
        self.fft.clear();
        self.delay.clear();
        self.dry_delay.clear();
        self.sc_delay.clear();
    }

    /// Copy `src` scaled by `gain` into the working buffer.
    pub(crate) fn load_input(&mut self, src: &[f32], gain: f32) {
        let n = src.len().min(BUFFER_SIZE);
        self.in_level = abs_max(&src[..n]) * gain;
        mul_k2(&mut self.buffer[..n], &src[..n], gain);
    }

    /// Emphasis and latency compensation for this channel's sidechain.
    pub(crate) fn prepare_sidechain(&mut self, sc: &mut [f32], mode: CrossoverMode) {
        self.boost.process_inplace(sc);
        if mode == CrossoverMode::LinearPhase {
            self.sc_delay.process_inplace(sc);
        }
    }

    /// Run the detectors of the first `bands` bands.
    pub(crate) fn detect(&mut self, sc: &[&[f32]], n: usize, bands: usize, modern: bool) {
        for b in self.bands.iter_mut().take(bands) {
            b.process(sc, n, modern);
        }
    }

    /// Apply the surge gain and the mute/solo rules to the VCAs.
    pub(crate) fn apply_vca(&mut self, n: usize, bands: usize, surge: Option<&[f32]>) {
        let active = &mut self.bands[..bands.min(BANDS_MAX)];
        let solo = active.iter().any(Band::solo);
        for b in active {
            if let Some(g) = surge {
                b.apply_gain(&g[..n]);
            }
            let muted = b.mute() || (solo && !b.solo());
            b.finish(n, muted);
        }
    }

    /// Delay the working buffer by the lookahead, keep it as the dry
    /// reference and replace it with the band sum.
    pub(crate) fn reconstruct(&mut self, n: usize, bands: usize, mode: CrossoverMode) {
        self.delay.process_inplace(&mut self.buffer[..n]);
        self.dry[..n].copy_from_slice(&self.buffer[..n]);

        match mode {
            CrossoverMode::Classic => {
                let vca: [&[f32]; BANDS_MAX] = std::array::from_fn(|j| self.bands[j].vca(n));
                self.crossover
                    .process(&mut self.buffer[..n], &self.dry[..n], &vca[..bands]);
            }
            CrossoverMode::Modern => {
                for (j, b) in self.bands.iter().enumerate().take(bands) {
                    self.filters
                        .process_inplace(j, &mut self.buffer[..n], b.vca(n));
                }
            }
            CrossoverMode::LinearPhase => {
                let [b0, b1, b2, b3] = &mut self.band_out;
                let mut outs: [&mut [f32]; BANDS_MAX] =
                    [&mut b0[..n], &mut b1[..n], &mut b2[..n], &mut b3[..n]];
                self.fft.process(&self.dry[..n], &mut outs[..bands]);

                let wet = &mut self.buffer[..n];
                wet.fill(0.0);
                for (out, b) in self.band_out.iter().zip(self.bands.iter()).take(bands) {
                    fmadd3(wet, &out[..n], b.vca(n));
                }
                self.dry_delay.process_inplace(&mut self.dry[..n]);
            }
        }
    }

    /// Mix wet and dry, apply the output gain and the bypass into `dst`.
    pub(crate) fn finish(
        &mut self,
        dst: &mut [f32],
        mode: CrossoverMode,
        wet_gain: f32,
        dry_gain: f32,
        out_gain: f32,
    ) {
        let n = dst.len().min(BUFFER_SIZE);
        let wet = &mut self.buffer[..n];

        if mode == CrossoverMode::Classic {
            let dry = &mut self.scratch[..n];
            dry.copy_from_slice(&self.dry[..n]);
            self.crossover.process_dry(dry);
            mix2(wet, dry, wet_gain, dry_gain);
        } else {
            mix2(wet, &self.dry[..n], wet_gain, dry_gain);
        }
        mul_k1(wet, out_gain);

        self.out_level = abs_max(wet);
        self.bypass.process(dst, &self.dry[..n], wet);
    }

    /// Refresh band meshes, and the amplitude response when `refresh` is
    /// set.
    pub(crate) fn update_meshes(
        &mut self,
        curve_x: &[f32],
        freqs: &[f32],
        refresh: bool,
        bands: usize,
    ) {
        for b in &mut self.bands {
            b.update_meshes(curve_x, freqs);
        }
        if !refresh {
            return;
        }

        let Some(xs) = self.xover else {
            return;
        };
        let gains: [f32; BANDS_MAX] = std::array::from_fn(|j| self.bands[j].meters().gain);
        let gains = &gains[..bands];
        let (crossover, filters, fft) = (&self.crossover, &self.filters, &self.fft);

        self.amp_mesh.fill(|x, y| {
            let n = freqs.len().min(x.len());
            for (i, &f) in freqs[..n].iter().enumerate() {
                x[i] = f;
                y[i] = match xs.mode {
                    CrossoverMode::Classic => crossover.freq_response(f, gains).norm(),
                    CrossoverMode::Modern => gains
                        .iter()
                        .enumerate()
                        .map(|(j, &g)| filters.freq_response(j, f, g).norm())
                        .product(),
                    CrossoverMode::LinearPhase => fft.freq_response(f, gains),
                };
            }
            n
        });
    }
}
