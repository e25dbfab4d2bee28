//! Audio I/O for the rack host.
//!
//! Provides WAV file reading/writing, offline rendering of whole files
//! through a [`RouteProcessor`](rack_core::RouteProcessor), and real-time
//! duplex streaming on top of a pluggable [`AudioBackend`](backend::AudioBackend)
//! (cpal by default).

pub mod backend;
pub mod cpal_backend;
mod render;
mod stream;
mod wav;

pub use backend::{AudioBackend, BackendStreamConfig, StreamHandle};
pub use cpal_backend::CpalBackend;
pub use render::render_offline;
pub use stream::{
    AudioDevice, DuplexStream, StreamConfig, StreamStats, default_device, find_device_by_index,
    find_device_fuzzy, list_devices,
};
pub use wav::{
    BitDepth, StereoSamples, WavFormat, WavInfo, WavSpec, read_wav_info, read_wav_stereo,
    write_wav_stereo,
};

use thiserror::Error;

/// Errors that can occur during audio I/O.
#[derive(Error, Debug)]
pub enum Error {
    /// WAV file error.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream error.
    #[error("Stream error: {0}")]
    Stream(String),

    /// No audio device available.
    #[error("No audio device available")]
    NoDevice,

    /// Unsupported audio format.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Device not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
