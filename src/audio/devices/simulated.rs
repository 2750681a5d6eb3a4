use std::sync::Arc;
use std::time::Duration;

use super::{AudioOutput, Voice};
use crate::audio::errors::DeviceError;
use crate::audio::pcm::{PcmSource, SharedPcm};
use crate::audio::scheduling::Clock;
use crate::audio::types::PlayDirection;

/// Output whose voices advance with a `Clock` instead of a sound card.
pub struct SimulatedOutput {
    clock: Arc<dyn Clock>,
    max_voices: Option<usize>,
    allocated: usize,
}

impl SimulatedOutput {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        SimulatedOutput {
            clock,
            max_voices: None,
            allocated: 0,
        }
    }

    /// Limits how many voices can be allocated, to exercise allocation
    /// failures.
    pub fn with_voice_limit(mut self, max_voices: usize) -> Self {
        self.max_voices = Some(max_voices);
        self
    }
}

impl AudioOutput for SimulatedOutput {
    fn allocate(&mut self, pcm: SharedPcm, sample_rate: u32) -> Result<Box<dyn Voice>, DeviceError> {
        if self.max_voices.is_some_and(|max| self.allocated >= max) {
            return Err(DeviceError::VoiceAllocation(format!(
                "all {} simulated voices in use",
                self.allocated
            )));
        }
        if sample_rate == 0 {
            return Err(DeviceError::VoiceAllocation(
                "sample rate must be non-zero".to_string(),
            ));
        }
        self.allocated += 1;
        log::info!(
            "Simulated Output: Allocated voice #{} for {} samples at {} Hz",
            self.allocated,
            pcm.len(),
            sample_rate
        );
        Ok(Box::new(SimulatedVoice::new(
            self.clock.clone(),
            pcm.len(),
            sample_rate,
        )))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

/// A voice with no audio behind it. Its position is derived lazily from the
/// clock: every control call re-anchors (position, time), and `position()`
/// extrapolates from the last anchor.
pub struct SimulatedVoice {
    clock: Arc<dyn Clock>,
    len: usize,
    frequency: f32,
    direction: PlayDirection,
    volume: u8,
    running: bool,
    anchor_position: f64,
    anchor_time: Duration,
}

impl SimulatedVoice {
    pub fn new(clock: Arc<dyn Clock>, len: usize, sample_rate: u32) -> Self {
        let anchor_time = clock.now();
        SimulatedVoice {
            clock,
            len,
            frequency: sample_rate as f32,
            direction: PlayDirection::Forward,
            volume: 255,
            running: false,
            anchor_position: 0.0,
            anchor_time,
        }
    }

    /// Unclamped position, may lie outside the buffer.
    fn raw_position(&self) -> f64 {
        if !self.running {
            return self.anchor_position;
        }
        let elapsed = self
            .clock
            .now()
            .saturating_sub(self.anchor_time)
            .as_secs_f64();
        let travelled = elapsed * self.frequency as f64;
        match self.direction {
            PlayDirection::Forward => self.anchor_position + travelled,
            PlayDirection::Backward => self.anchor_position - travelled,
        }
    }

    fn finished(&self, raw: f64) -> bool {
        match self.direction {
            PlayDirection::Forward => raw >= self.len as f64,
            PlayDirection::Backward => raw < 0.0,
        }
    }

    fn rebase(&mut self) {
        let raw = self.raw_position();
        self.anchor_position = raw.clamp(0.0, self.len as f64);
        self.anchor_time = self.clock.now();
    }
}

impl Voice for SimulatedVoice {
    fn start(&mut self) -> Result<(), DeviceError> {
        self.rebase();
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.rebase();
        self.running = false;
        Ok(())
    }

    fn position(&self) -> i64 {
        let raw = self.raw_position();
        if self.running && self.finished(raw) {
            return -1;
        }
        raw.clamp(0.0, self.len as f64) as i64
    }

    fn set_position(&mut self, position: usize) {
        self.anchor_position = position.min(self.len) as f64;
        self.anchor_time = self.clock.now();
    }

    fn frequency(&self) -> f32 {
        self.frequency
    }

    fn set_frequency(&mut self, frequency: f32) {
        self.rebase();
        self.frequency = frequency.max(0.0);
    }

    fn direction(&self) -> PlayDirection {
        self.direction
    }

    fn set_direction(&mut self, direction: PlayDirection) {
        self.rebase();
        self.direction = direction;
    }

    fn volume(&self) -> u8 {
        self.volume
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume;
    }

    fn is_playing(&self) -> bool {
        self.running && !self.finished(self.raw_position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::scheduling::ManualClock;

    fn voice(clock: &Arc<ManualClock>, len: usize) -> SimulatedVoice {
        let shared: Arc<dyn Clock> = clock.clone();
        SimulatedVoice::new(shared, len, 1000)
    }

    #[test]
    fn advances_only_while_running() {
        let clock = Arc::new(ManualClock::new());
        let mut v = voice(&clock, 10_000);
        clock.advance(Duration::from_millis(500));
        assert_eq!(v.position(), 0);

        v.start().unwrap();
        clock.advance(Duration::from_millis(250));
        assert_eq!(v.position(), 250);

        v.stop().unwrap();
        clock.advance(Duration::from_secs(1));
        assert_eq!(v.position(), 250);
    }

    #[test]
    fn frequency_and_direction_change_speed() {
        let clock = Arc::new(ManualClock::new());
        let mut v = voice(&clock, 10_000);
        v.set_position(4000);
        v.start().unwrap();
        v.set_frequency(2000.0);
        clock.advance(Duration::from_secs(1));
        assert_eq!(v.position(), 6000);

        v.set_direction(PlayDirection::Backward);
        clock.advance(Duration::from_millis(500));
        assert_eq!(v.position(), 5000);
    }

    #[test]
    fn running_off_either_end_reports_finished() {
        let clock = Arc::new(ManualClock::new());
        let mut v = voice(&clock, 1000);
        v.start().unwrap();
        clock.advance(Duration::from_secs(2));
        assert_eq!(v.position(), -1);
        assert!(!v.is_playing());

        v.set_position(100);
        v.set_direction(PlayDirection::Backward);
        clock.advance(Duration::from_millis(200));
        assert_eq!(v.position(), -1);
    }

    #[test]
    fn voice_limit_is_enforced() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new());
        let mut output = SimulatedOutput::new(clock).with_voice_limit(1);
        let pcm = SharedPcm::from_samples(&[0; 16], 16);
        assert!(output.allocate(pcm.clone(), 8000).is_ok());
        assert!(matches!(
            output.allocate(pcm, 8000),
            Err(DeviceError::VoiceAllocation(_))
        ));
    }
}
