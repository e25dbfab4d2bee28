//! Parameter smoothing for zipper-free changes.
//!
//! [`SmoothedParam`] is a one-pole lowpass on a control value. The audio path
//! calls [`advance()`](SmoothedParam::advance) once per sample; the control
//! side only moves the target.
//!
//! ```rust
//! use rack_core::SmoothedParam;
//!
//! let mut gain = SmoothedParam::standard(1.0, 48000.0);
//! gain.set_target(0.5);
//! for _ in 0..4800 {
//!     gain.advance();
//! }
//! assert!((gain.get() - 0.5).abs() < 0.001);
//! ```

use libm::expf;

/// A control value that glides exponentially towards its target.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    /// 1.0 = instant
    coeff: f32,
    sample_rate: f32,
    smoothing_time_ms: f32,
}

impl SmoothedParam {
    /// Unsmoothed parameter (changes apply on the next sample).
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate: 44100.0,
            smoothing_time_ms: 0.0,
        }
    }

    /// Parameter with the given sample rate and time constant.
    pub fn with_config(initial: f32, sample_rate: f32, smoothing_time_ms: f32) -> Self {
        let mut param = Self::new(initial);
        param.sample_rate = sample_rate;
        param.smoothing_time_ms = smoothing_time_ms;
        param.recalculate_coeff();
        param
    }

    /// 5 ms smoothing, for bypass and crossfade envelopes.
    pub fn fast(initial: f32, sample_rate: f32) -> Self {
        Self::with_config(initial, sample_rate, 5.0)
    }

    /// 10 ms smoothing, for gain and pan.
    pub fn standard(initial: f32, sample_rate: f32) -> Self {
        Self::with_config(initial, sample_rate, 10.0)
    }

    /// Set the value to glide towards.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Set target and current value together.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Update the sample rate, keeping the time constant.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeff();
    }

    /// Advance one sample and return the smoothed value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Current smoothed value.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Whether the value has reached its target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        (self.current - self.target).abs() < 1e-6
    }

    /// Jump to the target.
    #[inline]
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }

    // coeff = 1 - exp(-1 / (tau * sample_rate)), tau in seconds
    fn recalculate_coeff(&mut self) {
        if self.smoothing_time_ms <= 0.0 || self.sample_rate <= 0.0 {
            self.coeff = 1.0;
        } else {
            let samples = self.smoothing_time_ms / 1000.0 * self.sample_rate;
            self.coeff = 1.0 - expf(-1.0 / samples);
        }
    }
}

impl Default for SmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsmoothed_changes_immediately() {
        let mut p = SmoothedParam::new(0.0);
        p.set_target(1.0);
        assert_eq!(p.advance(), 1.0);
        assert!(p.is_settled());
    }

    #[test]
    fn standard_settles_within_fifty_ms() {
        let mut p = SmoothedParam::standard(0.0, 48000.0);
        p.set_target(1.0);
        let first = p.advance();
        assert!(first > 0.0 && first < 0.01);
        for _ in 0..2400 {
            p.advance();
        }
        assert!((p.get() - 1.0).abs() < 0.01);
    }

    #[test]
    fn snap_and_immediate() {
        let mut p = SmoothedParam::fast(0.25, 48000.0);
        p.set_target(0.75);
        p.snap_to_target();
        assert_eq!(p.get(), 0.75);
        p.set_immediate(0.1);
        assert_eq!(p.get(), 0.1);
        assert_eq!(p.target(), 0.1);
    }

    #[test]
    fn sample_rate_change_keeps_time_constant() {
        let mut a = SmoothedParam::standard(0.0, 48000.0);
        let mut b = SmoothedParam::standard(0.0, 96000.0);
        a.set_target(1.0);
        b.set_target(1.0);
        for _ in 0..480 {
            a.advance();
        }
        for _ in 0..960 {
            b.advance();
        }
        assert!((a.get() - b.get()).abs() < 0.001);
    }
}
