//! Level conversion helpers.
//!
//! The host works in linear gain inside the audio path and in decibels at its
//! control surface. [`gain_to_db`] is the boundary conversion used when a
//! linear control value (slider, CLI flag) is handed to the master gain stage.

use libm::{expf, log10f, logf};

/// Level treated as silence. Any gain at or below this maps to exactly zero.
pub const SILENCE_DB: f32 = -100.0;

/// Convert decibels to linear gain.
///
/// ```rust
/// use rack_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels without a floor.
///
/// Non-positive input is treated as 1e-10 (-200 dB).
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Convert a linear gain factor to decibels as `20 * log10(linear)`,
/// floored at [`SILENCE_DB`].
///
/// ```rust
/// use rack_core::math::{SILENCE_DB, gain_to_db};
///
/// assert!((gain_to_db(2.0) - 6.0206).abs() < 0.001);
/// assert_eq!(gain_to_db(0.0), SILENCE_DB);
/// ```
#[inline]
pub fn gain_to_db(linear: f32) -> f32 {
    if linear > 0.0 {
        (20.0 * log10f(linear)).max(SILENCE_DB)
    } else {
        SILENCE_DB
    }
}

/// Convert decibels to linear gain, mapping anything at or below
/// [`SILENCE_DB`] to exactly `0.0`.
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    if db > SILENCE_DB {
        db_to_linear(db)
    } else {
        0.0
    }
}

/// One-pole lowpass coefficient for a cutoff frequency.
///
/// Returns `a` for `y[n] = y[n-1] + a * (x[n] - y[n-1])`.
#[inline]
pub fn one_pole_coeff(cutoff_hz: f32, sample_rate: f32) -> f32 {
    if sample_rate <= 0.0 {
        return 1.0;
    }
    let cutoff = cutoff_hz.clamp(1.0, sample_rate * 0.49);
    1.0 - expf(-core::f32::consts::TAU * cutoff / sample_rate)
}
