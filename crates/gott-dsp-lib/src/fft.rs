// SPDX-License-Identifier: LGPL-3.0-or-later

//! FFT operations using `rustfft` as the backend.
//!
//! `rank` means log2 of the FFT size (rank 10 is a 1024-point FFT).
//! Transforms run in place on interleaved [`Complex`] buffers with a
//! scratch area owned by [`FftState`], so repeated calls never allocate.

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Cached FFT plans and scratch memory for one transform size.
///
/// # Examples
/// ```
/// use gott_dsp_lib::fft::FftState;
/// use num_complex::Complex;
///
/// let mut state = FftState::new(10); // 1024-point FFT
/// let mut buf = vec![Complex::new(0.0f32, 0.0); state.size()];
/// state.direct(&mut buf);
/// state.inverse(&mut buf);
/// ```
#[derive(Clone)]
pub struct FftState {
    rank: usize,
    n: usize,
    fwd: Arc<dyn Fft<f32>>,
    inv: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl std::fmt::Debug for FftState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftState")
            .field("rank", &self.rank)
            .field("n", &self.n)
            .finish_non_exhaustive()
    }
}

impl FftState {
    /// Plan forward and inverse transforms of size `2^rank`.
    pub fn new(rank: usize) -> Self {
        let n = 1 << rank;
        let mut planner = FftPlanner::new();
        let fwd = planner.plan_fft_forward(n);
        let inv = planner.plan_fft_inverse(n);
        let scratch_len = fwd
            .get_inplace_scratch_len()
            .max(inv.get_inplace_scratch_len());
        Self {
            rank,
            n,
            fwd,
            inv,
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    /// Rank (log2 of the FFT size).
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// FFT size in points.
    pub fn size(&self) -> usize {
        self.n
    }

    /// Forward transform of the first `2^rank` points of `buf`, in place.
    ///
    /// # Panics
    /// Panics if `buf` is shorter than the FFT size.
    pub fn direct(&mut self, buf: &mut [Complex<f32>]) {
        let n = self.n;
        assert!(buf.len() >= n, "buffer shorter than FFT size");
        self.fwd.process_with_scratch(&mut buf[..n], &mut self.scratch);
    }

    /// Inverse transform of the first `2^rank` points of `buf`, in place.
    ///
    /// The output is **not** normalized (it is scaled by N).
    ///
    /// # Panics
    /// Panics if `buf` is shorter than the FFT size.
    pub fn inverse(&mut self, buf: &mut [Complex<f32>]) {
        let n = self.n;
        assert!(buf.len() >= n, "buffer shorter than FFT size");
        self.inv.process_with_scratch(&mut buf[..n], &mut self.scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_fft_roundtrip() {
        let rank = 6;
        let mut state = FftState::new(rank);
        let input: Vec<Complex<f32>> = (0..64)
            .map(|i| Complex::new((i as f32 * 0.3).sin(), (i as f32 * 0.1).cos()))
            .collect();

        let mut buf = input.clone();
        state.direct(&mut buf);
        state.inverse(&mut buf);
        for (a, b) in buf.iter().zip(input.iter()) {
            assert_approx_eq!(f32, a.re / 64.0, b.re, epsilon = 1e-5);
            assert_approx_eq!(f32, a.im / 64.0, b.im, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_fft_dc_signal() {
        let mut state = FftState::new(4);
        let mut buf = vec![Complex::new(1.0f32, 0.0); 16];
        state.direct(&mut buf);

        assert_approx_eq!(f32, buf[0].re, 16.0, epsilon = 1e-5);
        for c in &buf[1..] {
            assert!(c.norm() < 1e-5, "non-DC bins must be empty, got {c}");
        }
    }

    #[test]
    fn test_fft_state_reports_size() {
        let state = FftState::new(12);
        assert_eq!(state.rank(), 12);
        assert_eq!(state.size(), 4096);
    }
}
