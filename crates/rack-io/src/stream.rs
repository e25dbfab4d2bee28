//! Device discovery and real-time duplex streaming.

use crate::backend::{AudioBackend, BackendStreamConfig, StreamHandle};
use crate::{Error, Result};
use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};
use crossbeam_channel::{Receiver, Sender};
use rack_core::RouteProcessor;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Capture blocks in flight between the input and output callbacks.
const IN_FLIGHT_BLOCKS: usize = 4;

/// Device name via `description()` (cpal 0.17+).
pub(crate) fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Audio device information.
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Whether the device supports audio input.
    pub is_input: bool,
    /// Whether the device supports audio output.
    pub is_output: bool,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
}

/// List all available audio devices.
///
/// Devices that are both input and output appear once.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(inputs) = host.input_devices() {
        for device in inputs {
            if let Ok(name) = device_name(&device) {
                let sample_rate = device
                    .default_input_config()
                    .map(|c| c.sample_rate())
                    .unwrap_or(44100);
                let is_output = device.default_output_config().is_ok();
                devices.push(AudioDevice {
                    name,
                    is_input: true,
                    is_output,
                    default_sample_rate: sample_rate,
                });
            }
        }
    }

    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            if let Ok(name) = device_name(&device) {
                if devices.iter().any(|d| d.name == name) {
                    continue;
                }
                let sample_rate = device
                    .default_output_config()
                    .map(|c| c.sample_rate())
                    .unwrap_or(44100);
                devices.push(AudioDevice {
                    name,
                    is_input: false,
                    is_output: true,
                    default_sample_rate: sample_rate,
                });
            }
        }
    }

    Ok(devices)
}

/// Default input and output devices.
pub fn default_device() -> Result<(Option<AudioDevice>, Option<AudioDevice>)> {
    let host = cpal::default_host();

    let input = host.default_input_device().and_then(|d| {
        device_name(&d).ok().map(|name| AudioDevice {
            name,
            is_input: true,
            is_output: false,
            default_sample_rate: d
                .default_input_config()
                .map(|c| c.sample_rate())
                .unwrap_or(44100),
        })
    });

    let output = host.default_output_device().and_then(|d| {
        device_name(&d).ok().map(|name| AudioDevice {
            name,
            is_input: false,
            is_output: true,
            default_sample_rate: d
                .default_output_config()
                .map(|c| c.sample_rate())
                .unwrap_or(44100),
        })
    });

    Ok((input, output))
}

/// Pick a device by index, exact name, or case-insensitive substring.
pub(crate) fn find_device_from_list(
    devices: &[Device],
    name_or_index: &str,
    kind: &str,
) -> Result<Device> {
    if let Ok(index) = name_or_index.parse::<usize>() {
        return devices.get(index).cloned().ok_or_else(|| {
            Error::DeviceNotFound(format!(
                "{kind} device index {index} (only {} devices available)",
                devices.len()
            ))
        });
    }

    let named: Vec<_> = devices
        .iter()
        .filter_map(|d| device_name(d).ok().map(|name| (d, name)))
        .collect();

    if let Some((device, _)) = named.iter().find(|(_, n)| n == name_or_index) {
        return Ok((*device).clone());
    }

    let search = name_or_index.to_lowercase();
    let matches: Vec<_> = named
        .iter()
        .filter(|(_, n)| n.to_lowercase().contains(&search))
        .collect();

    match matches.as_slice() {
        [] => Err(Error::DeviceNotFound(format!(
            "no {kind} device matching '{name_or_index}'"
        ))),
        [(device, _)] => Ok((*device).clone()),
        [(device, first), ..] => {
            let names: Vec<_> = matches.iter().map(|(_, n)| n.as_str()).collect();
            tracing::warn!(
                search = name_or_index,
                kind,
                candidates = ?names,
                "ambiguous device name, using {first}"
            );
            Ok((*device).clone())
        }
    }
}

/// First device of the given direction whose name contains `search`
/// (case-insensitive).
pub fn find_device_fuzzy(search: &str, is_input: bool) -> Result<AudioDevice> {
    let search_lower = search.to_lowercase();
    list_devices()?
        .into_iter()
        .find(|d| {
            let matches_type = if is_input { d.is_input } else { d.is_output };
            matches_type && d.name.to_lowercase().contains(&search_lower)
        })
        .ok_or_else(|| {
            Error::DeviceNotFound(format!(
                "no {} device matching '{search}'",
                if is_input { "input" } else { "output" }
            ))
        })
}

/// Device by zero-based index among devices of one direction.
pub fn find_device_by_index(index: usize, is_input: bool) -> Result<AudioDevice> {
    let filtered: Vec<_> = list_devices()?
        .into_iter()
        .filter(|d| if is_input { d.is_input } else { d.is_output })
        .collect();
    let available = filtered.len();

    filtered.into_iter().nth(index).ok_or_else(|| {
        Error::DeviceNotFound(format!(
            "{} device index {index} (only {available} devices available)",
            if is_input { "input" } else { "output" }
        ))
    })
}

/// Duplex stream configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Buffer size in frames.
    pub buffer_size: u32,
    /// Input device name or index (uses default if `None`).
    pub input_device: Option<String>,
    /// Output device name or index (uses default if `None`).
    pub output_device: Option<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_size: 512,
            input_device: None,
            output_device: None,
        }
    }
}

/// Counters updated by the audio callbacks.
#[derive(Debug, Default)]
pub struct StreamStats {
    blocks: AtomicU64,
    underruns: AtomicU64,
    dropped_inputs: AtomicU64,
    errors: AtomicU64,
}

impl StreamStats {
    /// Output blocks rendered through the route.
    pub fn blocks(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    /// Output blocks silenced for lack of captured input.
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Captured blocks discarded, in whole or in part, because the output
    /// side fell behind.
    pub fn dropped_inputs(&self) -> u64 {
        self.dropped_inputs.load(Ordering::Relaxed)
    }

    /// Errors reported by the backend.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// A running input → route → output stream.
///
/// Captured blocks travel from the input callback to the output callback over
/// a bounded channel; emptied buffers are sent back for reuse so the steady
/// state does not allocate. At most [`IN_FLIGHT_BLOCKS`] blocks of capture
/// wait for output; when the input clock runs faster, the oldest frames are
/// dropped. The output callback renders through the
/// [`RouteProcessor`], which picks up newly committed routes on its own.
/// Dropping the stream stops both directions.
pub struct DuplexStream {
    _input: StreamHandle,
    _output: StreamHandle,
    stats: Arc<StreamStats>,
    input_channels: u16,
    output_channels: u16,
}

impl DuplexStream {
    /// Open both directions on `backend` and start rendering.
    pub fn start(
        backend: &dyn AudioBackend,
        config: &StreamConfig,
        processor: RouteProcessor,
    ) -> Result<Self> {
        let input_channels = backend.channel_count(config.input_device.as_deref(), true)?;
        let output_channels = backend.channel_count(config.output_device.as_deref(), false)?;
        if input_channels == 0 || output_channels == 0 {
            return Err(Error::UnsupportedFormat(
                "device reports zero channels".into(),
            ));
        }

        let stats = Arc::new(StreamStats::default());
        let (filled_tx, filled_rx) = crossbeam_channel::bounded::<Vec<f32>>(IN_FLIGHT_BLOCKS);
        let (free_tx, free_rx) = crossbeam_channel::bounded::<Vec<f32>>(IN_FLIGHT_BLOCKS);

        let mut renderer = DuplexRenderer::new(
            processor,
            usize::from(input_channels),
            usize::from(output_channels),
            config.buffer_size as usize,
            filled_rx,
            free_tx,
            Arc::clone(&stats),
        );
        let output = backend.build_output_stream(
            &BackendStreamConfig {
                sample_rate: config.sample_rate,
                buffer_size: config.buffer_size,
                channels: output_channels,
                device_name: config.output_device.clone(),
            },
            Box::new(move |data: &mut [f32]| renderer.render(data)),
            error_reporter("output", &stats),
        )?;

        let capture_stats = Arc::clone(&stats);
        let input = backend.build_input_stream(
            &BackendStreamConfig {
                sample_rate: config.sample_rate,
                buffer_size: config.buffer_size,
                channels: input_channels,
                device_name: config.input_device.clone(),
            },
            Box::new(move |data: &[f32]| capture(data, &free_rx, &filled_tx, &capture_stats)),
            error_reporter("input", &stats),
        )?;

        tracing::info!(
            backend = backend.name(),
            input_channels,
            output_channels,
            sample_rate = config.sample_rate,
            buffer_size = config.buffer_size,
            "duplex stream running"
        );

        Ok(Self {
            _input: input,
            _output: output,
            stats,
            input_channels,
            output_channels,
        })
    }

    /// Live callback counters.
    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Interleaved channels captured per frame.
    pub fn input_channels(&self) -> u16 {
        self.input_channels
    }

    /// Interleaved channels rendered per frame.
    pub fn output_channels(&self) -> u16 {
        self.output_channels
    }
}

fn error_reporter(direction: &'static str, stats: &Arc<StreamStats>) -> Box<dyn FnMut(&str) + Send> {
    let stats = Arc::clone(stats);
    Box::new(move |message: &str| {
        stats.errors.fetch_add(1, Ordering::Relaxed);
        tracing::error!(direction, "audio stream error: {message}");
    })
}

fn capture(data: &[f32], free: &Receiver<Vec<f32>>, filled: &Sender<Vec<f32>>, stats: &StreamStats) {
    let mut block = free.try_recv().unwrap_or_default();
    block.clear();
    block.extend_from_slice(data);
    if filled.try_send(block).is_err() {
        stats.dropped_inputs.fetch_add(1, Ordering::Relaxed);
    }
}

/// Output-side state: pending capture, stereo scratch, and the processor.
struct DuplexRenderer {
    processor: RouteProcessor,
    input_channels: usize,
    output_channels: usize,
    pending: Vec<f32>,
    left_in: Vec<f32>,
    right_in: Vec<f32>,
    left_out: Vec<f32>,
    right_out: Vec<f32>,
    filled: Receiver<Vec<f32>>,
    free: Sender<Vec<f32>>,
    stats: Arc<StreamStats>,
}

impl DuplexRenderer {
    fn new(
        processor: RouteProcessor,
        input_channels: usize,
        output_channels: usize,
        frames: usize,
        filled: Receiver<Vec<f32>>,
        free: Sender<Vec<f32>>,
        stats: Arc<StreamStats>,
    ) -> Self {
        let frames = frames.max(1);
        Self {
            processor,
            input_channels,
            output_channels,
            pending: Vec::with_capacity(frames * input_channels * IN_FLIGHT_BLOCKS),
            left_in: vec![0.0; frames],
            right_in: vec![0.0; frames],
            left_out: vec![0.0; frames],
            right_out: vec![0.0; frames],
            filled,
            free,
            stats,
        }
    }

    fn render(&mut self, data: &mut [f32]) {
        let frames = data.len() / self.output_channels;
        if self.left_in.len() < frames {
            for buf in [
                &mut self.left_in,
                &mut self.right_in,
                &mut self.left_out,
                &mut self.right_out,
            ] {
                buf.resize(frames, 0.0);
            }
            let limit = self.pending_limit();
            self.pending.reserve(limit.saturating_sub(self.pending.len()));
        }

        let limit = self.pending_limit();
        while let Ok(block) = self.filled.try_recv() {
            self.queue_capture(&block, limit);
            // A full pool just means the block is dropped here.
            let _ = self.free.try_send(block);
        }

        let needed = frames * self.input_channels;
        if self.pending.len() < needed {
            data.fill(0.0);
            self.stats.underruns.fetch_add(1, Ordering::Relaxed);
            return;
        }

        deinterleave(
            &self.pending[..needed],
            self.input_channels,
            &mut self.left_in[..frames],
            &mut self.right_in[..frames],
        );
        self.pending.drain(..needed);

        self.processor.process_block(
            &self.left_in[..frames],
            &self.right_in[..frames],
            &mut self.left_out[..frames],
            &mut self.right_out[..frames],
        );
        interleave_into(
            &self.left_out[..frames],
            &self.right_out[..frames],
            data,
            self.output_channels,
        );
        self.stats.blocks.fetch_add(1, Ordering::Relaxed);
    }

    /// Most interleaved samples kept waiting for output.
    fn pending_limit(&self) -> usize {
        self.left_in.len() * self.input_channels * IN_FLIGHT_BLOCKS
    }

    /// Append a captured block, dropping the oldest whole frames past `limit`.
    fn queue_capture(&mut self, block: &[f32], limit: usize) {
        let keep = limit.min(block.len()) / self.input_channels * self.input_channels;
        let trimmed = keep < block.len();
        let block = &block[block.len() - keep..];
        let excess = (self.pending.len() + block.len()).saturating_sub(limit);
        if excess > 0 {
            let excess = excess
                .div_ceil(self.input_channels)
                .saturating_mul(self.input_channels)
                .min(self.pending.len());
            self.pending.drain(..excess);
        }
        if excess > 0 || trimmed {
            self.stats.dropped_inputs.fetch_add(1, Ordering::Relaxed);
        }
        self.pending.extend_from_slice(block);
    }
}

/// Split interleaved frames into left/right. Mono input feeds both sides;
/// channels past the second are ignored.
fn deinterleave(interleaved: &[f32], channels: usize, left: &mut [f32], right: &mut [f32]) {
    for ((frame, l), r) in interleaved
        .chunks_exact(channels)
        .zip(left.iter_mut())
        .zip(right.iter_mut())
    {
        *l = frame[0];
        *r = frame.get(1).copied().unwrap_or(frame[0]);
    }
}

/// Write left/right into an interleaved buffer. Mono output gets the average;
/// channels past the second are silenced.
fn interleave_into(left: &[f32], right: &[f32], output: &mut [f32], channels: usize) {
    for ((frame, l), r) in output
        .chunks_exact_mut(channels)
        .zip(left.iter())
        .zip(right.iter())
    {
        match frame {
            [mono] => *mono = (l + r) * 0.5,
            [fl, fr, rest @ ..] => {
                *fl = *l;
                *fr = *r;
                rest.fill(0.0);
            }
            [] => {}
        }
    }
    let written = left.len().min(right.len()) * channels;
    if written < output.len() {
        output[written..].fill(0.0);
    }
}
