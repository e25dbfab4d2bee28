//! The master gain stage.
//!
//! [`MasterGain`] is the control-side handle: it owns the stage's node and a
//! shared atomic holding the target level in dB. The node reads the target at
//! the start of every block and ramps towards it over 10 ms, multiplying both
//! channels per sample.
//!
//! Levels are clamped to [`MASTER_MIN_DB`]..=[`MASTER_MAX_DB`]. The floor is
//! silence: at [`MASTER_MIN_DB`] the linear gain is exactly zero.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::math::{SILENCE_DB, db_to_gain, gain_to_db};
use crate::node::{AudioNode, NodeHandle};
use crate::param::SmoothedParam;

/// Lowest master level in dB (silence).
pub const MASTER_MIN_DB: f32 = SILENCE_DB;

/// Highest master level in dB.
pub const MASTER_MAX_DB: f32 = 24.0;

/// Clamp a requested level. `None` for NaN.
fn clamp_db(db: f32) -> Option<f32> {
    (!db.is_nan()).then(|| db.clamp(MASTER_MIN_DB, MASTER_MAX_DB))
}

#[derive(Debug)]
struct GainTarget(AtomicU32);

impl GainTarget {
    fn new(db: f32) -> Self {
        Self(AtomicU32::new(db.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, db: f32) {
        self.0.store(db.to_bits(), Ordering::Relaxed);
    }
}

/// The processing half of the master gain stage.
struct MasterGainNode {
    target: Arc<GainTarget>,
    applied_db: f32,
    gain: SmoothedParam,
}

impl AudioNode for MasterGainNode {
    fn name(&self) -> &str {
        "Master Gain"
    }

    fn prepare(&mut self, sample_rate: f32, _block_size: usize) {
        self.gain.set_sample_rate(sample_rate);
        self.applied_db = self.target.load();
        self.gain.set_immediate(db_to_gain(self.applied_db));
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let db = self.target.load();
        if db != self.applied_db {
            self.applied_db = db;
            self.gain.set_target(db_to_gain(db));
        }
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let g = self.gain.advance();
            *l *= g;
            *r *= g;
        }
    }

    fn reset(&mut self) {
        self.gain.snap_to_target();
    }

    fn has_editor(&self) -> bool {
        false
    }
}

/// Typed handle to the always-present master gain stage.
pub struct MasterGain {
    node: NodeHandle,
    target: Arc<GainTarget>,
}

impl MasterGain {
    /// Stage at `initial_db` (clamped; NaN means unity), prepared for `sample_rate`.
    pub fn new(initial_db: f32, sample_rate: f32, block_size: usize) -> Self {
        let initial = clamp_db(initial_db).unwrap_or(0.0);
        let target = Arc::new(GainTarget::new(initial));
        let mut node = MasterGainNode {
            target: Arc::clone(&target),
            applied_db: initial,
            gain: SmoothedParam::standard(db_to_gain(initial), sample_rate),
        };
        node.prepare(sample_rate, block_size);
        Self {
            node: NodeHandle::new(Box::new(node)),
            target,
        }
    }

    /// The owned node, for registration with the routing engine.
    pub fn node(&self) -> &NodeHandle {
        &self.node
    }

    /// Set the level in dB. Returns the level actually applied.
    ///
    /// Out-of-range values clamp; NaN is ignored and the current level kept.
    pub fn set_gain_db(&self, db: f32) -> f32 {
        match clamp_db(db) {
            Some(clamped) => {
                self.target.store(clamped);
                clamped
            }
            None => self.gain_db(),
        }
    }

    /// Set the level from a linear factor, converting with `20 * log10`.
    pub fn set_gain_linear(&self, linear: f32) -> f32 {
        if linear.is_nan() {
            return self.gain_db();
        }
        self.set_gain_db(gain_to_db(linear))
    }

    /// Target level in dB.
    pub fn gain_db(&self) -> f32 {
        self.target.load()
    }

    /// Target level as a linear factor.
    pub fn gain_linear(&self) -> f32 {
        db_to_gain(self.gain_db())
    }
}

impl core::fmt::Debug for MasterGain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MasterGain")
            .field("gain_db", &self.gain_db())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(stage: &MasterGain, frames: usize) -> (Vec<f32>, Vec<f32>) {
        let mut l = vec![1.0; frames];
        let mut r = vec![-1.0; frames];
        stage.node().lock().process(&mut l, &mut r);
        (l, r)
    }

    #[test]
    fn test_unity_passes_signal() {
        let stage = MasterGain::new(0.0, 48000.0, 256);
        let (l, r) = render(&stage, 64);
        assert!(l.iter().all(|&s| (s - 1.0).abs() < 1e-6));
        assert!(r.iter().all(|&s| (s + 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_initial_level_applies_without_ramp() {
        let stage = MasterGain::new(-6.0, 48000.0, 256);
        let (l, _) = render(&stage, 1);
        assert!((l[0] - db_to_gain(-6.0)).abs() < 1e-5);
    }

    #[test]
    fn test_level_change_ramps_to_target() {
        let stage = MasterGain::new(0.0, 48000.0, 256);
        stage.set_gain_db(-6.0);
        let (l, r) = render(&stage, 4800);
        assert!(l[0] > 0.9, "first sample should still be near unity");
        let expected = db_to_gain(-6.0);
        assert!((l[4799] - expected).abs() < 1e-3);
        assert!((r[4799] + expected).abs() < 1e-3);
    }

    #[test]
    fn test_clamping() {
        let stage = MasterGain::new(0.0, 48000.0, 256);
        assert_eq!(stage.set_gain_db(100.0), MASTER_MAX_DB);
        assert_eq!(stage.set_gain_db(-500.0), MASTER_MIN_DB);
        assert_eq!(stage.gain_linear(), 0.0);
        assert_eq!(stage.set_gain_db(f32::INFINITY), MASTER_MAX_DB);
        assert_eq!(stage.set_gain_db(f32::NEG_INFINITY), MASTER_MIN_DB);
        stage.set_gain_db(-3.0);
        assert_eq!(stage.set_gain_db(f32::NAN), -3.0);
        assert_eq!(stage.gain_db(), -3.0);
    }

    #[test]
    fn test_linear_boundary_conversion() {
        let stage = MasterGain::new(0.0, 48000.0, 256);
        let db = stage.set_gain_linear(2.0);
        assert!((db - 6.0206).abs() < 1e-3);
        assert!((stage.gain_linear() - 2.0).abs() < 1e-3);
        assert_eq!(stage.set_gain_linear(0.0), MASTER_MIN_DB);
        assert_eq!(stage.set_gain_linear(f32::NAN), MASTER_MIN_DB);
    }

    #[test]
    fn test_floor_is_silence() {
        let stage = MasterGain::new(MASTER_MIN_DB, 48000.0, 256);
        let (l, r) = render(&stage, 16);
        assert!(l.iter().chain(r.iter()).all(|&s| s == 0.0));
    }
}
