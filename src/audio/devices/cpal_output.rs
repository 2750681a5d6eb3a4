use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};

use super::{AudioOutput, ReadHead, Voice};
use crate::audio::errors::DeviceError;
use crate::audio::pcm::{PcmSource, SharedPcm};
use crate::audio::types::PlayDirection;

/// Voices on the host's default output device.
#[derive(Debug, Default)]
pub struct CpalOutput;

impl CpalOutput {
    pub fn new() -> Self {
        CpalOutput
    }
}

/// State shared between the player thread and the audio callback. Float
/// values are stored as raw bits.
struct VoiceShared {
    running: AtomicBool,
    finished: AtomicBool,
    read_head: ReadHead,
    frequency: AtomicU32,
    backward: AtomicBool,
    volume: AtomicU8,
}

impl VoiceShared {

    fn frequency(&self) -> f32 {
        f32::from_bits(self.frequency.load(Ordering::Relaxed))
    }
}

impl AudioOutput for CpalOutput {
    fn allocate(&mut self, pcm: SharedPcm, sample_rate: u32) -> Result<Box<dyn Voice>, DeviceError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(DeviceError::NoDefaultOutputDevice)?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        let supported = device
            .default_output_config()
            .map_err(|e| DeviceError::OutputConfig(e.to_string()))?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            log::warn!(
                "[cpal] Default format of '{}' is {:?}, requesting F32 anyway",
                device_name,
                supported.sample_format()
            );
        }

        let stream_config = StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };
        let device_rate = stream_config.sample_rate.0 as f64;
        let out_channels = stream_config.channels.max(1) as usize;
        log::info!(
            "[cpal] Opening '{}': {} ch @ {} Hz for a {} Hz track",
            device_name,
            out_channels,
            device_rate,
            sample_rate
        );

        let shared = Arc::new(VoiceShared {
            running: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            read_head: ReadHead::new(0.0),
            frequency: AtomicU32::new((sample_rate as f32).to_bits()),
            backward: AtomicBool::new(false),
            volume: AtomicU8::new(255),
        });

        let full_scale = if pcm.bits() <= 8 { 128.0 } else { 32768.0 };
        let track_len = pcm.len();
        let callback_shared = shared.clone();
        let callback_pcm = pcm.clone();
        let data_callback = move |output: &mut [f32], _info: &cpal::OutputCallbackInfo| {
            let shared = &callback_shared;
            if !shared.running.load(Ordering::Relaxed) {
                output.fill(0.0);
                return;
            }
            let mut step = shared.frequency() as f64 / device_rate;
            if shared.backward.load(Ordering::Relaxed) {
                step = -step;
            }
            let gain = shared.volume.load(Ordering::Relaxed) as f32 / 255.0 / full_scale;
            let mut head = shared.read_head.begin();

            let mut frames = output.chunks_mut(out_channels);
            for frame in frames.by_ref() {
                let sample = if head < 0.0 {
                    None
                } else {
                    callback_pcm.get(head as usize)
                };
                let Some(sample) = sample else {
                    frame.fill(0.0);
                    // A seek that arrived meanwhile brings the voice back
                    // inside the track.
                    if !shared.read_head.has_pending_seek() {
                        shared.running.store(false, Ordering::Relaxed);
                        shared.finished.store(true, Ordering::Relaxed);
                    }
                    break;
                };
                frame.fill(sample as f32 * gain);
                head += step;
            }
            for frame in frames {
                frame.fill(0.0);
            }
            shared.read_head.commit(head.clamp(0.0, track_len as f64));
        };
        let error_callback = |err: cpal::StreamError| {
            log::error!("[cpal] Stream error: {}", err);
        };

        let stream = device
            .build_output_stream(&stream_config, data_callback, error_callback, None)
            .map_err(|e| DeviceError::Stream(e.to_string()))?;
        stream
            .pause()
            .map_err(|e| DeviceError::Stream(e.to_string()))?;

        Ok(Box::new(CpalVoice { stream, shared }))
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

struct CpalVoice {
    stream: Stream,
    shared: Arc<VoiceShared>,
}

impl Voice for CpalVoice {
    fn start(&mut self) -> Result<(), DeviceError> {
        self.shared.finished.store(false, Ordering::Relaxed);
        self.shared.running.store(true, Ordering::Relaxed);
        self.stream
            .play()
            .map_err(|e| DeviceError::Stream(e.to_string()))
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.shared.running.store(false, Ordering::Relaxed);
        self.stream
            .pause()
            .map_err(|e| DeviceError::Stream(e.to_string()))
    }

    fn position(&self) -> i64 {
        if self.shared.finished.load(Ordering::Relaxed) {
            return -1;
        }
        self.shared.read_head.position() as i64
    }

    fn set_position(&mut self, position: usize) {
        self.shared.read_head.request_seek(position as f64);
        self.shared.finished.store(false, Ordering::Relaxed);
    }

    fn frequency(&self) -> f32 {
        self.shared.frequency()
    }

    fn set_frequency(&mut self, frequency: f32) {
        self.shared
            .frequency
            .store(frequency.max(0.0).to_bits(), Ordering::Relaxed);
    }

    fn direction(&self) -> PlayDirection {
        if self.shared.backward.load(Ordering::Relaxed) {
            PlayDirection::Backward
        } else {
            PlayDirection::Forward
        }
    }

    fn set_direction(&mut self, direction: PlayDirection) {
        self.shared
            .backward
            .store(direction == PlayDirection::Backward, Ordering::Relaxed);
    }

    fn volume(&self) -> u8 {
        self.shared.volume.load(Ordering::Relaxed)
    }

    fn set_volume(&mut self, volume: u8) {
        self.shared.volume.store(volume, Ordering::Relaxed);
    }

    fn is_playing(&self) -> bool {
        self.shared.running.load(Ordering::Relaxed)
    }
}
