// SPDX-License-Identifier: LGPL-3.0-or-later

//! Circular buffer delay line.
//!
//! Used for lookahead compensation, for aligning the dry path with the
//! processed path and for delaying a sidechain behind a crossover's
//! latency. The buffer is allocated once by [`Delay::init`]; changing the
//! delay afterwards never allocates.

/// Alignment gap for buffer allocation (512 samples).
const DELAY_GAP: usize = 0x200;

/// Circular buffer delay line.
///
/// # Examples
/// ```
/// use gott_dsp_units::util::delay::Delay;
///
/// let mut delay = Delay::new();
/// delay.init(1024);
/// delay.set_delay(2);
///
/// let input = [1.0, 2.0, 3.0, 4.0];
/// let mut output = [0.0; 4];
/// delay.process(&mut output, &input);
/// assert_eq!(output, [0.0, 0.0, 1.0, 2.0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Delay {
    buffer: Vec<f32>,
    head: usize,
    tail: usize,
    delay: usize,
}

impl Delay {
    /// Create an empty delay line (no buffer allocated).
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the buffer for delays up to `max_delay` samples.
    ///
    /// The state is cleared and the delay reset to zero.
    pub fn init(&mut self, max_delay: usize) {
        let size = (max_delay + DELAY_GAP).div_ceil(DELAY_GAP) * DELAY_GAP;
        self.buffer = vec![0.0; size];
        self.head = 0;
        self.tail = 0;
        self.delay = 0;
    }

    /// Largest delay the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.buffer.len().saturating_sub(1)
    }

    /// Set the delay in samples, limited to [`capacity`](Self::capacity).
    pub fn set_delay(&mut self, delay: usize) {
        let size = self.buffer.len();
        if size == 0 {
            return;
        }
        let delay = delay.min(size - 1);
        self.delay = delay;
        self.tail = (self.head + size - delay) % size;
    }

    /// Current delay in samples.
    pub fn delay(&self) -> usize {
        self.delay
    }

    /// Zero the stored samples.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
    }

    /// Delay `src` into `dst`.
    ///
    /// Without an allocated buffer the output is silence.
    pub fn process(&mut self, dst: &mut [f32], src: &[f32]) {
        let n = dst.len().min(src.len());
        if self.buffer.is_empty() {
            dst[..n].fill(0.0);
            return;
        }
        for (d, s) in dst[..n].iter_mut().zip(src.iter()) {
            *d = self.tick(*s);
        }
    }

    /// Delay `buf` in place.
    pub fn process_inplace(&mut self, buf: &mut [f32]) {
        if self.buffer.is_empty() {
            buf.fill(0.0);
            return;
        }
        for s in buf.iter_mut() {
            *s = self.tick(*s);
        }
    }

    /// Push one sample and return the delayed one.
    pub fn process_sample(&mut self, src: f32) -> f32 {
        if self.buffer.is_empty() {
            return 0.0;
        }
        self.tick(src)
    }

    #[inline]
    fn tick(&mut self, src: f32) -> f32 {
        let size = self.buffer.len();
        self.buffer[self.head] = src;
        let out = self.buffer[self.tail];
        self.head += 1;
        if self.head >= size {
            self.head = 0;
        }
        self.tail += 1;
        if self.tail >= size {
            self.tail = 0;
        }
        out
    }
}
