//! Pluggable audio backend abstraction.
//!
//! [`AudioBackend`] decouples the host's streaming from any specific platform
//! audio API. [`CpalBackend`](crate::CpalBackend) is the default
//! implementation; tests drive [`DuplexStream`](crate::DuplexStream) through a
//! mock backend that invokes the callbacks by hand.
//!
//! ```text
//! ┌────────────────────────┐
//! │   rack realtime (CLI)  │
//! └───────────┬────────────┘
//!             │ DuplexStream::start
//!             ▼
//! ┌────────────────────────┐
//! │  AudioBackend trait    │
//! │  build_*_stream        │
//! └───────────┬────────────┘
//!       ┌─────┴──────┐
//!       ▼            ▼
//!  CpalBackend   test mocks
//! ```
//!
//! Callbacks are boxed closures so the trait stays object-safe. Stream handles
//! are type-erased and stop the stream when dropped.

use crate::{AudioDevice, Result};

/// Configuration for building one direction of an audio stream.
#[derive(Debug, Clone)]
pub struct BackendStreamConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Preferred buffer size in frames.
    pub buffer_size: u32,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Device name filter (uses the system default if `None`).
    pub device_name: Option<String>,
}

impl Default for BackendStreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_size: 512,
            channels: 2,
            device_name: None,
        }
    }
}

/// Type-erased audio stream handle.
///
/// The stream is active while this handle exists; dropping it stops
/// playback or capture.
pub struct StreamHandle {
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Wrap a backend-specific stream object, kept alive until drop.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Fills an interleaved output buffer (`[L0, R0, L1, R1, ...]`).
///
/// Runs on the audio thread: no blocking locks, no I/O.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Receives captured interleaved input samples.
pub type InputCallback = Box<dyn FnMut(&[f32]) + Send>;

/// Receives a human-readable streaming error.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// Platform audio API used for device enumeration and stream construction.
pub trait AudioBackend: Send {
    /// Short backend name (e.g. "cpal").
    fn name(&self) -> &str;

    /// List all available audio devices.
    fn list_devices(&self) -> Result<Vec<AudioDevice>>;

    /// Default output device, if any.
    fn default_output_device(&self) -> Result<Option<AudioDevice>>;

    /// Default input device, if any.
    fn default_input_device(&self) -> Result<Option<AudioDevice>>;

    /// Native channel count of the named (or default) device.
    ///
    /// The default reports stereo.
    fn channel_count(&self, _device_name: Option<&str>, _is_input: bool) -> Result<u16> {
        Ok(2)
    }

    /// Build and start an output stream. Dropping the handle stops it.
    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;

    /// Build and start an input stream. Dropping the handle stops it.
    fn build_input_stream(
        &self,
        config: &BackendStreamConfig,
        callback: InputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;
}
