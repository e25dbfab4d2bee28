//! WAV file reading and writing.
//!
//! The host always works in stereo: files are read into [`StereoSamples`]
//! (mono is duplicated, extra channels dropped) and written back as
//! two-channel WAV at 16-bit, 24-bit or 32-bit float.

use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavWriter};
use std::fmt;
use std::path::Path;

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// Output sample depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BitDepth {
    /// 16-bit integer PCM.
    Int16,
    /// 24-bit integer PCM.
    Int24,
    /// 32-bit IEEE float.
    #[default]
    Float32,
}

impl BitDepth {
    /// Parse a bit count (16, 24 or 32).
    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            16 => Ok(Self::Int16),
            24 => Ok(Self::Int24),
            32 => Ok(Self::Float32),
            other => Err(Error::UnsupportedFormat(format!(
                "{other}-bit output (use 16, 24 or 32)"
            ))),
        }
    }

    /// Bits per sample.
    pub fn bits(self) -> u16 {
        match self {
            Self::Int16 => 16,
            Self::Int24 => 24,
            Self::Float32 => 32,
        }
    }

    fn sample_format(self) -> SampleFormat {
        match self {
            Self::Float32 => SampleFormat::Float,
            Self::Int16 | Self::Int24 => SampleFormat::Int,
        }
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float32 => f.write_str("32-bit float"),
            int => write!(f, "{}-bit", int.bits()),
        }
    }
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let num_frames = u64::from(reader.duration());
    let duration_secs = num_frames as f64 / f64::from(spec.sample_rate);

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs,
        format,
    })
}

/// Stream parameters of a stereo file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Sample rate in Hz (e.g., 44100, 48000).
    pub sample_rate: u32,
    /// Sample depth.
    pub bit_depth: BitDepth,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bit_depth: BitDepth::Float32,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: 2,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bit_depth.bits(),
            sample_format: spec.bit_depth.sample_format(),
        }
    }
}

/// Owned stereo audio, one `Vec` per channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoSamples {
    /// Left channel.
    pub left: Vec<f32>,
    /// Right channel.
    pub right: Vec<f32>,
}

impl StereoSamples {
    /// Pair two channels. The longer one is truncated to the shorter.
    pub fn new(mut left: Vec<f32>, mut right: Vec<f32>) -> Self {
        let n = left.len().min(right.len());
        left.truncate(n);
        right.truncate(n);
        Self { left, right }
    }

    /// Silent buffer of `frames` frames.
    pub fn silence(frames: usize) -> Self {
        Self::new(vec![0.0; frames], vec![0.0; frames])
    }

    /// Duplicate a mono signal to both channels.
    pub fn from_mono(samples: Vec<f32>) -> Self {
        Self {
            right: samples.clone(),
            left: samples,
        }
    }

    /// Split interleaved frames of `channels` channels, keeping the first two.
    /// Mono input is duplicated.
    pub fn from_interleaved(samples: &[f32], channels: usize) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels;
        let mut left = Vec::with_capacity(frames);
        let mut right = Vec::with_capacity(frames);
        for frame in samples.chunks_exact(channels) {
            left.push(frame[0]);
            right.push(frame.get(1).copied().unwrap_or(frame[0]));
        }
        Self { left, right }
    }

    /// Frames per channel.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Whether there are no frames.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Largest absolute sample across both channels.
    pub fn peak(&self) -> f32 {
        self.left
            .iter()
            .chain(self.right.iter())
            .fold(0.0_f32, |peak, s| peak.max(s.abs()))
    }
}

/// Read a WAV file as stereo samples.
///
/// Mono files are expanded to stereo by duplicating to both channels.
/// Files with more than 2 channels use only the first two channels.
/// Returns the samples and the file's sample rate.
pub fn read_wav_stereo<P: AsRef<Path>>(path: P) -> Result<(StereoSamples, u32)> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let samples = StereoSamples::from_interleaved(&interleaved, usize::from(spec.channels));
    Ok((samples, spec.sample_rate))
}

/// Write stereo samples to a WAV file.
///
/// Integer depths clamp to full scale.
pub fn write_wav_stereo<P: AsRef<Path>>(
    path: P,
    samples: &StereoSamples,
    spec: WavSpec,
) -> Result<()> {
    let mut writer = WavWriter::create(path, hound::WavSpec::from(spec))?;

    if spec.bit_depth == BitDepth::Float32 {
        for (l, r) in samples.left.iter().zip(samples.right.iter()) {
            writer.write_sample(*l)?;
            writer.write_sample(*r)?;
        }
    } else {
        let max_val = (1i32 << (spec.bit_depth.bits() - 1)) as f32;
        let quantize = |s: f32| (s * max_val).clamp(-max_val, max_val - 1.0) as i32;
        for (l, r) in samples.left.iter().zip(samples.right.iter()) {
            writer.write_sample(quantize(*l))?;
            writer.write_sample(quantize(*r))?;
        }
    }

    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn ramp(n: usize) -> StereoSamples {
        let left = (0..n).map(|i| (i as f32 / n as f32).sin()).collect();
        let right = (0..n).map(|i| -(i as f32 / n as f32).cos() * 0.5).collect();
        StereoSamples::new(left, right)
    }

    #[test]
    fn test_stereo_roundtrip_f32() {
        let samples = ramp(1000);
        let file = NamedTempFile::new().unwrap();
        write_wav_stereo(file.path(), &samples, WavSpec::default()).unwrap();

        let (loaded, rate) = read_wav_stereo(file.path()).unwrap();
        assert_eq!(rate, 44100);
        assert_eq!(loaded, samples);
    }

    #[test]
    fn test_integer_depths_are_close() {
        for (depth, tolerance) in [(BitDepth::Int16, 1e-4), (BitDepth::Int24, 1e-6)] {
            let samples = ramp(500);
            let file = NamedTempFile::new().unwrap();
            let spec = WavSpec {
                sample_rate: 48000,
                bit_depth: depth,
            };
            write_wav_stereo(file.path(), &samples, spec).unwrap();

            let info = read_wav_info(file.path()).unwrap();
            assert_eq!(info.bits_per_sample, depth.bits());
            assert_eq!(info.format, WavFormat::Pcm);
            assert_eq!(info.num_frames, 500);

            let (loaded, _) = read_wav_stereo(file.path()).unwrap();
            for (a, b) in samples.left.iter().zip(loaded.left.iter()) {
                assert!((a - b).abs() < tolerance, "{depth}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn test_integer_output_clamps() {
        let samples = StereoSamples::new(vec![2.0, -2.0], vec![0.0, 0.0]);
        let file = NamedTempFile::new().unwrap();
        let spec = WavSpec {
            sample_rate: 44100,
            bit_depth: BitDepth::Int16,
        };
        write_wav_stereo(file.path(), &samples, spec).unwrap();
        let (loaded, _) = read_wav_stereo(file.path()).unwrap();
        assert!(loaded.left[0] < 1.0 && loaded.left[0] > 0.999);
        assert_eq!(loaded.left[1], -1.0);
    }

    #[test]
    fn test_mono_file_is_duplicated() {
        let file = NamedTempFile::new().unwrap();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(file.path(), spec).unwrap();
        for i in 0..10 {
            writer.write_sample(i as f32 / 10.0).unwrap();
        }
        writer.finalize().unwrap();

        let (stereo, rate) = read_wav_stereo(file.path()).unwrap();
        assert_eq!(rate, 22050);
        assert_eq!(stereo.len(), 10);
        assert_eq!(stereo.left, stereo.right);
    }

    #[test]
    fn test_from_interleaved_drops_extra_channels() {
        let stereo = StereoSamples::from_interleaved(&[1.0, 2.0, 9.0, 3.0, 4.0, 9.0], 3);
        assert_eq!(stereo.left, [1.0, 3.0]);
        assert_eq!(stereo.right, [2.0, 4.0]);
        assert_eq!(stereo.peak(), 4.0);
    }

    #[test]
    fn test_bit_depth_parsing() {
        assert_eq!(BitDepth::from_bits(24).unwrap(), BitDepth::Int24);
        assert!(matches!(
            BitDepth::from_bits(8),
            Err(Error::UnsupportedFormat(_))
        ));
        assert_eq!(BitDepth::Float32.to_string(), "32-bit float");
        assert_eq!(BitDepth::Int16.to_string(), "16-bit");
    }
}
