// SPDX-License-Identifier: LGPL-3.0-or-later

//! Core data types shared by the kernels.
//!
//! Filter cascades and dynamics curves are plain `Copy` data: the units
//! crate computes them once per settings change and the kernels in
//! [`crate::filters`] and [`crate::dynamics`] evaluate them per sample.

/// Amplification threshold below which signals are considered silent.
pub const AMPLIFICATION_THRESH: f32 = 1e-8;

// ─── Biquad filter types ───────────────────────────────────────────────────

/// Maximum number of second-order sections in one [`Biquad`] cascade.
pub const BIQUAD_SECTIONS_MAX: usize = 8;

/// Number of delay (memory) elements of a full cascade.
pub const BIQUAD_D_ITEMS: usize = BIQUAD_SECTIONS_MAX * 2;

/// Coefficients for a single biquad filter section.
///
/// `a1` and `a2` are stored pre-negated, so the recurrence only adds:
/// ```text
///   y[n] = b0*x[n] + d0
///   d0   = b1*x[n] + a1*y[n] + d1
///   d1   = b2*x[n] + a2*y[n]
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadX1 {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl BiquadX1 {
    /// Identity section: `y[n] = x[n]`.
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Returns `true` if the section passes its input through unchanged.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for BiquadX1 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A cascade of up to [`BIQUAD_SECTIONS_MAX`] biquad sections with its
/// delay memory.
///
/// Sections `0..count` are processed in series; an empty cascade is a
/// pass-through.
#[derive(Debug, Clone)]
pub struct Biquad {
    /// Delay memory, two elements per section.
    pub d: [f32; BIQUAD_D_ITEMS],
    /// Section coefficients.
    pub sections: [BiquadX1; BIQUAD_SECTIONS_MAX],
    /// Number of active sections.
    pub count: usize,
}

impl Default for Biquad {
    fn default() -> Self {
        Self {
            d: [0.0; BIQUAD_D_ITEMS],
            sections: [BiquadX1::IDENTITY; BIQUAD_SECTIONS_MAX],
            count: 0,
        }
    }
}

impl Biquad {
    /// Reset the delay memory to zero (clear filter state).
    pub fn reset(&mut self) {
        self.d = [0.0; BIQUAD_D_ITEMS];
    }

    /// Replace the active sections. Extra sections beyond
    /// [`BIQUAD_SECTIONS_MAX`] are dropped. The delay memory is kept so a
    /// running filter can be retuned without clicks.
    pub fn set_sections(&mut self, sections: &[BiquadX1]) {
        let n = sections.len().min(BIQUAD_SECTIONS_MAX);
        self.sections[..n].copy_from_slice(&sections[..n]);
        self.count = n;
    }

    /// Active sections.
    pub fn active(&self) -> &[BiquadX1] {
        &self.sections[..self.count]
    }
}

// ─── Dynamics curve types ──────────────────────────────────────────────────

/// Maximum number of dots on a [`DynamicsCurve`].
pub const DYNAMICS_DOTS_MAX: usize = 4;

/// One dot of a dynamics curve with its soft knee.
///
/// Levels are linear amplitudes; the polynomial coefficients work on
/// natural logarithms of the input level and produce the natural
/// logarithm of the output level.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DynamicsKnee {
    /// Knee start point (linear).
    pub start: f32,
    /// Knee end point (linear).
    pub end: f32,
    /// Quadratic inside the knee: `ly = (herm[0]*lx + herm[1])*lx + herm[2]`.
    pub herm: [f32; 3],
    /// Straight line after the knee: `ly = tilt[0]*lx + tilt[1]`.
    pub tilt: [f32; 2],
}

/// Piecewise log-log transfer curve made of sorted knees.
///
/// Below the first knee the curve follows `base`; above the end of knee
/// `i` it follows `knees[i].tilt` until the start of knee `i + 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicsCurve {
    /// Straight line below the first knee: `ly = base[0]*lx + base[1]`.
    pub base: [f32; 2],
    /// Knees sorted by ascending level.
    pub knees: [DynamicsKnee; DYNAMICS_DOTS_MAX],
    /// Number of active knees.
    pub count: usize,
}

impl Default for DynamicsCurve {
    /// Unity curve: output level equals input level.
    fn default() -> Self {
        Self {
            base: [1.0, 0.0],
            knees: [DynamicsKnee::default(); DYNAMICS_DOTS_MAX],
            count: 0,
        }
    }
}

// ─── DSP Context ───────────────────────────────────────────────────────────

/// DSP processing context for storing/restoring machine state.
///
/// Manages floating-point control registers to enable flush-to-zero (FTZ)
/// and denormals-are-zero (DAZ) modes during audio processing. Without
/// these modes, denormalized floats in recursive filters can cause
/// 10-100x slowdowns.
///
/// # Platform support
///
/// - **x86/x86_64**: Sets FTZ and DAZ bits in the MXCSR register.
/// - **aarch64**: Sets the FZ bit in the FPCR register.
/// - **Other**: No-op.
///
/// # Examples
/// ```
/// use gott_dsp_lib::types::DspContext;
///
/// let mut ctx = DspContext::default();
/// ctx.start();
/// // ... DSP processing with denormals flushed to zero ...
/// ctx.finish();
/// ```
#[derive(Debug, Clone, Default)]
pub struct DspContext {
    saved_fpcr: u64,
    active: bool,
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
const MXCSR_FTZ: u32 = 0x8000;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
const MXCSR_DAZ: u32 = 0x0040;

impl DspContext {
    /// Begin DSP processing. Enables flush-to-zero mode for denormals.
    pub fn start(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        self.enable_ftz();
    }

    /// End DSP processing. Restores the floating-point control state
    /// that was saved by [`start`](Self::start).
    pub fn finish(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.restore_fpcr();
    }

    /// Returns `true` between `start()` and `finish()`.
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    #[allow(deprecated)]
    fn enable_ftz(&mut self) {
        // SAFETY: reading and writing MXCSR only changes float rounding
        // behaviour of the current thread.
        unsafe {
            #[cfg(target_arch = "x86")]
            use core::arch::x86::{_mm_getcsr, _mm_setcsr};
            #[cfg(target_arch = "x86_64")]
            use core::arch::x86_64::{_mm_getcsr, _mm_setcsr};

            let csr = _mm_getcsr();
            self.saved_fpcr = csr as u64;
            _mm_setcsr(csr | MXCSR_FTZ | MXCSR_DAZ);
        }
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    #[allow(deprecated)]
    fn restore_fpcr(&self) {
        // SAFETY: restores the value saved by `enable_ftz`.
        unsafe {
            #[cfg(target_arch = "x86")]
            use core::arch::x86::_mm_setcsr;
            #[cfg(target_arch = "x86_64")]
            use core::arch::x86_64::_mm_setcsr;

            _mm_setcsr(self.saved_fpcr as u32);
        }
    }

    #[cfg(target_arch = "aarch64")]
    fn enable_ftz(&mut self) {
        // SAFETY: FPCR only controls float behaviour of the current thread.
        unsafe {
            let fpcr: u64;
            core::arch::asm!("mrs {}, fpcr", out(reg) fpcr);
            self.saved_fpcr = fpcr;
            // FZ is bit 24
            core::arch::asm!("msr fpcr, {}", in(reg) fpcr | (1u64 << 24));
        }
    }

    #[cfg(target_arch = "aarch64")]
    fn restore_fpcr(&self) {
        // SAFETY: restores the value saved by `enable_ftz`.
        unsafe {
            core::arch::asm!("msr fpcr, {}", in(reg) self.saved_fpcr);
        }
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
    fn enable_ftz(&mut self) {}

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
    fn restore_fpcr(&self) {}
}

impl Drop for DspContext {
    fn drop(&mut self) {
        if self.active {
            self.restore_fpcr();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_biquad_default_is_passthrough() {
        let bq = Biquad::default();
        assert_eq!(bq.count, 0);
        assert!(bq.active().is_empty());
        assert!(bq.d.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_biquad_set_sections_keeps_memory() {
        let mut bq = Biquad::default();
        bq.d[0] = 0.25;
        let s = BiquadX1 {
            b0: 0.5,
            ..BiquadX1::IDENTITY
        };
        bq.set_sections(&[s, s, s]);
        assert_eq!(bq.count, 3);
        assert_eq!(bq.active()[2].b0, 0.5);
        assert_eq!(bq.d[0], 0.25, "retuning must not clear the state");

        bq.reset();
        assert!(bq.d.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_biquad_set_sections_truncates() {
        let mut bq = Biquad::default();
        bq.set_sections(&[BiquadX1::IDENTITY; BIQUAD_SECTIONS_MAX + 3]);
        assert_eq!(bq.count, BIQUAD_SECTIONS_MAX);
    }

    #[test]
    fn test_identity_section() {
        assert!(BiquadX1::default().is_identity());
        let s = BiquadX1 {
            a1: 0.1,
            ..BiquadX1::IDENTITY
        };
        assert!(!s.is_identity());
    }

    #[test]
    fn test_dynamics_curve_default_is_unity() {
        let c = DynamicsCurve::default();
        assert_eq!(c.count, 0);
        assert_eq!(c.base, [1.0, 0.0]);
    }

    #[test]
    fn test_dsp_context_start_finish() {
        let mut ctx = DspContext::default();
        assert!(!ctx.is_active());
        ctx.start();
        ctx.start();
        assert!(ctx.is_active());
        ctx.finish();
        ctx.finish();
        assert!(!ctx.is_active());
    }
}
