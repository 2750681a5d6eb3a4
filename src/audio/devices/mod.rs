use crate::audio::errors::DeviceError;
use crate::audio::pcm::SharedPcm;
use crate::audio::types::PlayDirection;

// Deterministic clock-driven voice, used headless and in tests
pub mod simulated;

// Play position handed between control thread and audio callback
pub mod read_head;

// Real output through the system default device
#[cfg(feature = "device")]
pub mod cpal_output;

pub use read_head::ReadHead;
pub use simulated::{SimulatedOutput, SimulatedVoice};

#[cfg(feature = "device")]
pub use cpal_output::CpalOutput;

/// Playback of one PCM buffer on an output device.
///
/// Positions are sample indices into the buffer. Frequency is the playback
/// rate in samples per second, so doubling it doubles the speed.
pub trait Voice {
    fn start(&mut self) -> Result<(), DeviceError>;
    fn stop(&mut self) -> Result<(), DeviceError>;

    /// Current sample index, or a negative value once playback ran off
    /// either end of the buffer.
    fn position(&self) -> i64;
    fn set_position(&mut self, position: usize);

    fn frequency(&self) -> f32;
    fn set_frequency(&mut self, frequency: f32);

    fn direction(&self) -> PlayDirection;
    fn set_direction(&mut self, direction: PlayDirection);

    /// Device volume, 0..=255.
    fn volume(&self) -> u8;
    fn set_volume(&mut self, volume: u8);

    fn is_playing(&self) -> bool;
}

/// Something that can hand out voices.
pub trait AudioOutput {
    fn allocate(&mut self, pcm: SharedPcm, sample_rate: u32) -> Result<Box<dyn Voice>, DeviceError>;

    fn name(&self) -> &str;
}
