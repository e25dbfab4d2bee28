//! Parameter metadata for node editor surfaces.
//!
//! A node that exposes parameters describes each one with a
//! [`ParamDescriptor`]: display name, a lookup key used by text commands and
//! manifests, unit, and range. The host never interprets parameter meaning; it
//! only clamps, formats, and forwards values.

use serde::Serialize;

/// Display unit of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamUnit {
    /// Decibels.
    Decibels,
    /// Hertz.
    Hertz,
    /// Percentage (0-100).
    Percent,
    /// Dimensionless.
    None,
}

impl ParamUnit {
    /// Unit suffix for display.
    ///
    /// ```rust
    /// use rack_core::ParamUnit;
    ///
    /// assert_eq!(ParamUnit::Decibels.suffix(), " dB");
    /// assert_eq!(ParamUnit::None.suffix(), "");
    /// ```
    pub const fn suffix(&self) -> &'static str {
        match self {
            ParamUnit::Decibels => " dB",
            ParamUnit::Hertz => " Hz",
            ParamUnit::Percent => "%",
            ParamUnit::None => "",
        }
    }
}

/// Describes one parameter of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamDescriptor {
    /// Full display name, e.g. "Cutoff".
    pub name: &'static str,
    /// Lookup key, lowercase, e.g. `"cutoff"`.
    pub key: &'static str,
    /// Display unit.
    pub unit: ParamUnit,
    /// Minimum value.
    pub min: f32,
    /// Maximum value.
    pub max: f32,
    /// Value after construction or reset.
    pub default: f32,
}

impl ParamDescriptor {
    /// Gain parameter in dB.
    pub const fn gain_db(
        name: &'static str,
        key: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            key,
            unit: ParamUnit::Decibels,
            min,
            max,
            default,
        }
    }

    /// Frequency parameter in Hz.
    pub const fn frequency(
        name: &'static str,
        key: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            key,
            unit: ParamUnit::Hertz,
            min,
            max,
            default,
        }
    }

    /// Percentage parameter.
    pub const fn percent(name: &'static str, key: &'static str, default: f32) -> Self {
        Self {
            name,
            key,
            unit: ParamUnit::Percent,
            min: 0.0,
            max: 100.0,
            default,
        }
    }

    /// Dimensionless parameter.
    pub const fn plain(
        name: &'static str,
        key: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            key,
            unit: ParamUnit::None,
            min,
            max,
            default,
        }
    }

    /// Clamp a value to this parameter's range.
    ///
    /// ```rust
    /// use rack_core::ParamDescriptor;
    ///
    /// let desc = ParamDescriptor::gain_db("Gain", "gain_db", -24.0, 24.0, 0.0);
    /// assert_eq!(desc.clamp(-100.0), -24.0);
    /// assert_eq!(desc.clamp(3.0), 3.0);
    /// ```
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    /// Format a value with its unit suffix.
    pub fn format_value(&self, value: f32) -> String {
        match self.unit {
            ParamUnit::Hertz if value >= 1000.0 => format!("{:.2} kHz", value / 1000.0),
            ParamUnit::Hertz => format!("{value:.0} Hz"),
            ParamUnit::Percent => format!("{value:.0}%"),
            unit => format!("{value:.1}{}", unit.suffix()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_respects_range() {
        let desc = ParamDescriptor::frequency("Cutoff", "cutoff", 20.0, 20000.0, 1000.0);
        assert_eq!(desc.clamp(5.0), 20.0);
        assert_eq!(desc.clamp(50000.0), 20000.0);
        assert_eq!(desc.clamp(440.0), 440.0);
    }

    #[test]
    fn format_value_per_unit() {
        let hz = ParamDescriptor::frequency("Cutoff", "cutoff", 20.0, 20000.0, 1000.0);
        assert_eq!(hz.format_value(440.0), "440 Hz");
        assert_eq!(hz.format_value(2500.0), "2.50 kHz");

        let db = ParamDescriptor::gain_db("Gain", "gain_db", -24.0, 24.0, 0.0);
        assert_eq!(db.format_value(-3.0), "-3.0 dB");

        let pct = ParamDescriptor::percent("Width", "width", 100.0);
        assert_eq!(pct.format_value(50.0), "50%");
    }
}
