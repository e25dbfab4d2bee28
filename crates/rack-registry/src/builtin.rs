//! Built-in processors.
//!
//! Small stereo utilities that are always available, with or without plugin
//! manifests on disk. Manifests name one of these as their `processor` and
//! preset its parameters.

use libm::tanhf;
use rack_core::{AudioNode, ParamDescriptor, SmoothedParam, db_to_linear, one_pole_coeff};

/// Category of a processor for organization and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorCategory {
    /// Gain stages and channel utilities
    Utility,
    /// Filters
    Filter,
    /// Saturation and waveshaping
    Distortion,
    /// Stereo image processing
    Spatial,
}

impl ProcessorCategory {
    /// Returns a human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            ProcessorCategory::Utility => "Utility",
            ProcessorCategory::Filter => "Filter",
            ProcessorCategory::Distortion => "Distortion",
            ProcessorCategory::Spatial => "Spatial",
        }
    }
}

/// The built-in processor kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorKind {
    /// Trim in dB
    Gain,
    /// Balance between channels
    Pan,
    /// One-pole lowpass
    Lowpass,
    /// One-pole highpass
    Highpass,
    /// tanh soft clipper
    Drive,
    /// Mid/side stereo width
    Width,
    /// Per-channel polarity inversion
    Invert,
    /// Left/right swap
    Swap,
}

impl ProcessorKind {
    /// Every kind, in listing order.
    pub const ALL: [ProcessorKind; 8] = [
        ProcessorKind::Gain,
        ProcessorKind::Pan,
        ProcessorKind::Lowpass,
        ProcessorKind::Highpass,
        ProcessorKind::Drive,
        ProcessorKind::Width,
        ProcessorKind::Invert,
        ProcessorKind::Swap,
    ];

    /// Identifier used by manifests and the command line.
    pub const fn id(&self) -> &'static str {
        match self {
            ProcessorKind::Gain => "gain",
            ProcessorKind::Pan => "pan",
            ProcessorKind::Lowpass => "lowpass",
            ProcessorKind::Highpass => "highpass",
            ProcessorKind::Drive => "drive",
            ProcessorKind::Width => "width",
            ProcessorKind::Invert => "invert",
            ProcessorKind::Swap => "swap",
        }
    }

    /// Display name.
    pub const fn name(&self) -> &'static str {
        match self {
            ProcessorKind::Gain => "Gain",
            ProcessorKind::Pan => "Pan",
            ProcessorKind::Lowpass => "Lowpass",
            ProcessorKind::Highpass => "Highpass",
            ProcessorKind::Drive => "Drive",
            ProcessorKind::Width => "Stereo Width",
            ProcessorKind::Invert => "Polarity Invert",
            ProcessorKind::Swap => "Channel Swap",
        }
    }

    /// One-line description.
    pub const fn description(&self) -> &'static str {
        match self {
            ProcessorKind::Gain => "Level trim in decibels",
            ProcessorKind::Pan => "Stereo balance",
            ProcessorKind::Lowpass => "6 dB/oct lowpass filter",
            ProcessorKind::Highpass => "6 dB/oct highpass filter",
            ProcessorKind::Drive => "tanh soft clipping with input drive",
            ProcessorKind::Width => "Mid/side stereo width",
            ProcessorKind::Invert => "Polarity inversion per channel",
            ProcessorKind::Swap => "Swaps left and right",
        }
    }

    /// Category for listing.
    pub const fn category(&self) -> ProcessorCategory {
        match self {
            ProcessorKind::Gain | ProcessorKind::Invert | ProcessorKind::Swap => {
                ProcessorCategory::Utility
            }
            ProcessorKind::Lowpass | ProcessorKind::Highpass => ProcessorCategory::Filter,
            ProcessorKind::Drive => ProcessorCategory::Distortion,
            ProcessorKind::Pan | ProcessorKind::Width => ProcessorCategory::Spatial,
        }
    }

    /// Look up a kind by [`id()`](Self::id).
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    /// Create an unprepared instance.
    pub fn create(&self, sample_rate: f32) -> Box<dyn AudioNode> {
        match self {
            ProcessorKind::Gain => Box::new(Gain::new(sample_rate)),
            ProcessorKind::Pan => Box::new(Pan::new(sample_rate)),
            ProcessorKind::Lowpass => Box::new(OnePole::lowpass(sample_rate)),
            ProcessorKind::Highpass => Box::new(OnePole::highpass(sample_rate)),
            ProcessorKind::Drive => Box::new(Drive::new()),
            ProcessorKind::Width => Box::new(Width::new(sample_rate)),
            ProcessorKind::Invert => Box::new(Invert::new()),
            ProcessorKind::Swap => Box::new(Swap),
        }
    }
}

impl core::fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.id())
    }
}

// ---------------------------------------------------------------------------
// Gain
// ---------------------------------------------------------------------------

const GAIN_PARAMS: [ParamDescriptor; 1] =
    [ParamDescriptor::gain_db("Gain", "gain_db", -60.0, 24.0, 0.0)];

/// Smoothed level trim.
pub struct Gain {
    gain_db: f32,
    gain: SmoothedParam,
}

impl Gain {
    /// Unity gain.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            gain_db: 0.0,
            gain: SmoothedParam::standard(1.0, sample_rate),
        }
    }
}

impl AudioNode for Gain {
    fn name(&self) -> &str {
        "Gain"
    }

    fn prepare(&mut self, sample_rate: f32, _block_size: usize) {
        self.gain.set_sample_rate(sample_rate);
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let g = self.gain.advance();
            *l *= g;
            *r *= g;
        }
    }

    fn reset(&mut self) {
        self.gain.snap_to_target();
    }

    fn param_count(&self) -> usize {
        GAIN_PARAMS.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        GAIN_PARAMS.get(index).copied()
    }

    fn get_param(&self, index: usize) -> Option<f32> {
        (index == 0).then_some(self.gain_db)
    }

    fn set_param(&mut self, index: usize, value: f32) -> bool {
        if index != 0 {
            return false;
        }
        self.gain_db = GAIN_PARAMS[0].clamp(value);
        self.gain.set_target(db_to_linear(self.gain_db));
        true
    }
}

// ---------------------------------------------------------------------------
// Pan
// ---------------------------------------------------------------------------

const PAN_PARAMS: [ParamDescriptor; 1] = [ParamDescriptor::plain("Pan", "pan", -1.0, 1.0, 0.0)];

/// Balance control: attenuates the channel opposite the pan direction.
pub struct Pan {
    pan: SmoothedParam,
}

impl Pan {
    /// Centered.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            pan: SmoothedParam::standard(0.0, sample_rate),
        }
    }
}

impl AudioNode for Pan {
    fn name(&self) -> &str {
        "Pan"
    }

    fn prepare(&mut self, sample_rate: f32, _block_size: usize) {
        self.pan.set_sample_rate(sample_rate);
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let p = self.pan.advance();
            *l *= (1.0 - p).min(1.0);
            *r *= (1.0 + p).min(1.0);
        }
    }

    fn reset(&mut self) {
        self.pan.snap_to_target();
    }

    fn param_count(&self) -> usize {
        PAN_PARAMS.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        PAN_PARAMS.get(index).copied()
    }

    fn get_param(&self, index: usize) -> Option<f32> {
        (index == 0).then(|| self.pan.target())
    }

    fn set_param(&mut self, index: usize, value: f32) -> bool {
        if index != 0 {
            return false;
        }
        self.pan.set_target(PAN_PARAMS[0].clamp(value));
        true
    }
}

// ---------------------------------------------------------------------------
// One-pole filters
// ---------------------------------------------------------------------------

const LOWPASS_PARAMS: [ParamDescriptor; 1] =
    [ParamDescriptor::frequency("Cutoff", "cutoff", 20.0, 20000.0, 1000.0)];
const HIGHPASS_PARAMS: [ParamDescriptor; 1] =
    [ParamDescriptor::frequency("Cutoff", "cutoff", 20.0, 20000.0, 100.0)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterMode {
    Lowpass,
    Highpass,
}

/// First-order filter, one state per channel.
pub struct OnePole {
    mode: FilterMode,
    cutoff: f32,
    coeff: f32,
    sample_rate: f32,
    state: [f32; 2],
}

impl OnePole {
    /// Lowpass at 1 kHz.
    pub fn lowpass(sample_rate: f32) -> Self {
        Self::with_mode(FilterMode::Lowpass, sample_rate)
    }

    /// Highpass at 100 Hz.
    pub fn highpass(sample_rate: f32) -> Self {
        Self::with_mode(FilterMode::Highpass, sample_rate)
    }

    fn with_mode(mode: FilterMode, sample_rate: f32) -> Self {
        let cutoff = Self::params_for(mode)[0].default;
        Self {
            mode,
            cutoff,
            coeff: one_pole_coeff(cutoff, sample_rate),
            sample_rate,
            state: [0.0; 2],
        }
    }

    fn params_for(mode: FilterMode) -> &'static [ParamDescriptor; 1] {
        match mode {
            FilterMode::Lowpass => &LOWPASS_PARAMS,
            FilterMode::Highpass => &HIGHPASS_PARAMS,
        }
    }

    fn run(&mut self, channel: usize, samples: &mut [f32]) {
        let mut s = self.state[channel];
        for x in samples.iter_mut() {
            s += self.coeff * (*x - s);
            *x = match self.mode {
                FilterMode::Lowpass => s,
                FilterMode::Highpass => *x - s,
            };
        }
        self.state[channel] = s;
    }
}

impl AudioNode for OnePole {
    fn name(&self) -> &str {
        match self.mode {
            FilterMode::Lowpass => "Lowpass",
            FilterMode::Highpass => "Highpass",
        }
    }

    fn prepare(&mut self, sample_rate: f32, _block_size: usize) {
        self.sample_rate = sample_rate;
        self.coeff = one_pole_coeff(self.cutoff, sample_rate);
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.run(0, left);
        self.run(1, right);
    }

    fn reset(&mut self) {
        self.state = [0.0; 2];
    }

    fn param_count(&self) -> usize {
        1
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        Self::params_for(self.mode).get(index).copied()
    }

    fn get_param(&self, index: usize) -> Option<f32> {
        (index == 0).then_some(self.cutoff)
    }

    fn set_param(&mut self, index: usize, value: f32) -> bool {
        if index != 0 {
            return false;
        }
        self.cutoff = Self::params_for(self.mode)[0].clamp(value);
        self.coeff = one_pole_coeff(self.cutoff, self.sample_rate);
        true
    }
}

// ---------------------------------------------------------------------------
// Drive
// ---------------------------------------------------------------------------

const DRIVE_PARAMS: [ParamDescriptor; 1] =
    [ParamDescriptor::gain_db("Drive", "drive_db", 0.0, 40.0, 12.0)];

/// `tanh(x * drive)` soft clipper. Output stays within (-1, 1).
pub struct Drive {
    drive_db: f32,
    drive: f32,
}

impl Drive {
    /// Default drive of 12 dB.
    pub fn new() -> Self {
        let drive_db = DRIVE_PARAMS[0].default;
        Self {
            drive_db,
            drive: db_to_linear(drive_db),
        }
    }
}

impl Default for Drive {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioNode for Drive {
    fn name(&self) -> &str {
        "Drive"
    }

    fn prepare(&mut self, _sample_rate: f32, _block_size: usize) {}

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for x in left.iter_mut().chain(right.iter_mut()) {
            *x = tanhf(*x * self.drive);
        }
    }

    fn reset(&mut self) {}

    fn param_count(&self) -> usize {
        DRIVE_PARAMS.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        DRIVE_PARAMS.get(index).copied()
    }

    fn get_param(&self, index: usize) -> Option<f32> {
        (index == 0).then_some(self.drive_db)
    }

    fn set_param(&mut self, index: usize, value: f32) -> bool {
        if index != 0 {
            return false;
        }
        self.drive_db = DRIVE_PARAMS[0].clamp(value);
        self.drive = db_to_linear(self.drive_db);
        true
    }
}

// ---------------------------------------------------------------------------
// Width
// ---------------------------------------------------------------------------

const WIDTH_PARAMS: [ParamDescriptor; 1] =
    [ParamDescriptor::plain("Width", "width", 0.0, 2.0, 1.0)];

/// Scales the side signal: 0 collapses to mono, 1 is neutral, 2 doubles.
pub struct Width {
    width: SmoothedParam,
}

impl Width {
    /// Neutral width.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            width: SmoothedParam::standard(1.0, sample_rate),
        }
    }
}

impl AudioNode for Width {
    fn name(&self) -> &str {
        "Stereo Width"
    }

    fn prepare(&mut self, sample_rate: f32, _block_size: usize) {
        self.width.set_sample_rate(sample_rate);
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let w = self.width.advance();
            let mid = (*l + *r) * 0.5;
            let side = (*l - *r) * 0.5 * w;
            *l = mid + side;
            *r = mid - side;
        }
    }

    fn reset(&mut self) {
        self.width.snap_to_target();
    }

    fn param_count(&self) -> usize {
        WIDTH_PARAMS.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        WIDTH_PARAMS.get(index).copied()
    }

    fn get_param(&self, index: usize) -> Option<f32> {
        (index == 0).then(|| self.width.target())
    }

    fn set_param(&mut self, index: usize, value: f32) -> bool {
        if index != 0 {
            return false;
        }
        self.width.set_target(WIDTH_PARAMS[0].clamp(value));
        true
    }
}

// ---------------------------------------------------------------------------
// Invert
// ---------------------------------------------------------------------------

const INVERT_PARAMS: [ParamDescriptor; 2] = [
    ParamDescriptor::plain("Invert Left", "left", 0.0, 1.0, 1.0),
    ParamDescriptor::plain("Invert Right", "right", 0.0, 1.0, 1.0),
];

/// Polarity inversion; a channel flips when its switch is at or above 0.5.
pub struct Invert {
    switches: [f32; 2],
}

impl Invert {
    /// Both channels inverted.
    pub fn new() -> Self {
        Self {
            switches: [INVERT_PARAMS[0].default, INVERT_PARAMS[1].default],
        }
    }
}

impl Default for Invert {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioNode for Invert {
    fn name(&self) -> &str {
        "Polarity Invert"
    }

    fn prepare(&mut self, _sample_rate: f32, _block_size: usize) {}

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (switch, channel) in self.switches.iter().zip([left, right]) {
            if *switch >= 0.5 {
                channel.iter_mut().for_each(|s| *s = -*s);
            }
        }
    }

    fn reset(&mut self) {}

    fn param_count(&self) -> usize {
        INVERT_PARAMS.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        INVERT_PARAMS.get(index).copied()
    }

    fn get_param(&self, index: usize) -> Option<f32> {
        self.switches.get(index).copied()
    }

    fn set_param(&mut self, index: usize, value: f32) -> bool {
        match (self.switches.get_mut(index), INVERT_PARAMS.get(index)) {
            (Some(slot), Some(desc)) => {
                *slot = desc.clamp(value);
                true
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Swap
// ---------------------------------------------------------------------------

/// Exchanges the left and right channels.
pub struct Swap;

impl AudioNode for Swap {
    fn name(&self) -> &str {
        "Channel Swap"
    }

    fn prepare(&mut self, _sample_rate: f32, _block_size: usize) {}

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        left.swap_with_slice(right);
    }

    fn reset(&mut self) {}
}
