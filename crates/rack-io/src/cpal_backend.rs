//! cpal-based audio backend.
//!
//! Covers ALSA (Linux), CoreAudio (macOS) and WASAPI (Windows) through the
//! platform's default cpal host.

use crate::backend::{
    AudioBackend, BackendStreamConfig, ErrorCallback, InputCallback, OutputCallback, StreamHandle,
};
use crate::stream::{device_name, find_device_from_list};
use crate::{AudioDevice, Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host};

/// Default [`AudioBackend`], wrapping the platform's default cpal [`Host`].
pub struct CpalBackend {
    host: Host,
}

impl CpalBackend {
    /// Create a backend on the platform's default audio host.
    pub fn new() -> Self {
        let host = cpal::default_host();
        tracing::info!(host = host.id().name(), "cpal backend initialized");
        Self { host }
    }

    fn output_device(&self, name: Option<&str>) -> Result<Device> {
        match name {
            Some(search) => {
                let devices: Vec<_> = self
                    .host
                    .output_devices()
                    .map_err(|e| Error::Stream(e.to_string()))?
                    .collect();
                find_device_from_list(&devices, search, "output")
            }
            None => self.host.default_output_device().ok_or(Error::NoDevice),
        }
    }

    fn input_device(&self, name: Option<&str>) -> Result<Device> {
        match name {
            Some(search) => {
                let devices: Vec<_> = self
                    .host
                    .input_devices()
                    .map_err(|e| Error::Stream(e.to_string()))?
                    .collect();
                find_device_from_list(&devices, search, "input")
            }
            None => self.host.default_input_device().ok_or(Error::NoDevice),
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn stream_config(config: &BackendStreamConfig) -> cpal::StreamConfig {
    cpal::StreamConfig {
        channels: config.channels,
        sample_rate: config.sample_rate,
        buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
    }
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn list_devices(&self) -> Result<Vec<AudioDevice>> {
        crate::stream::list_devices()
    }

    fn default_output_device(&self) -> Result<Option<AudioDevice>> {
        let (_, output) = crate::stream::default_device()?;
        Ok(output)
    }

    fn default_input_device(&self) -> Result<Option<AudioDevice>> {
        let (input, _) = crate::stream::default_device()?;
        Ok(input)
    }

    fn channel_count(&self, device_name: Option<&str>, is_input: bool) -> Result<u16> {
        let config = if is_input {
            self.input_device(device_name)?.default_input_config()
        } else {
            self.output_device(device_name)?.default_output_config()
        };
        config
            .map(|c| c.channels())
            .map_err(|e| Error::Stream(e.to_string()))
    }

    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        mut callback: OutputCallback,
        mut error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        let device = self.output_device(config.device_name.as_deref())?;

        let stream = device
            .build_output_stream(
                &stream_config(config),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| callback(data),
                move |err| error_callback(&err.to_string()),
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        tracing::info!(
            device = %device_name(&device).unwrap_or_default(),
            channels = config.channels,
            sample_rate = config.sample_rate,
            "output stream started"
        );

        Ok(StreamHandle::new(stream))
    }

    fn build_input_stream(
        &self,
        config: &BackendStreamConfig,
        mut callback: InputCallback,
        mut error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        let device = self.input_device(config.device_name.as_deref())?;

        let stream = device
            .build_input_stream(
                &stream_config(config),
                move |data: &[f32], _: &cpal::InputCallbackInfo| callback(data),
                move |err| error_callback(&err.to_string()),
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        tracing::info!(
            device = %device_name(&device).unwrap_or_default(),
            channels = config.channels,
            sample_rate = config.sample_rate,
            "input stream started"
        );

        Ok(StreamHandle::new(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpal_backend_name() {
        assert_eq!(CpalBackend::new().name(), "cpal");
    }

    #[test]
    fn test_cpal_backend_list_devices() {
        // Availability depends on the machine; only check it does not fail.
        assert!(CpalBackend::new().list_devices().is_ok());
    }

    #[test]
    fn test_stream_handle_debug() {
        let handle = StreamHandle::new(42u32);
        assert!(format!("{handle:?}").contains("StreamHandle"));
    }
}
