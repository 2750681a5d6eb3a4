use crate::audio::analysis::{SpectrumAnalyzer, frequency_spacing};
use crate::audio::config::{EQ_BANDS, EngineConfig, INITIAL_VOLUME};
use crate::audio::devices::{AudioOutput, Voice};
use crate::audio::effects::Equalizer;
use crate::audio::errors::EngineError;
use crate::audio::pcm::{PcmBuffer, PcmSource, SharedPcm};
use crate::audio::types::{PlayerEvent, PlayerState, PlayerStateKind};

use super::handlers;
use super::time;

/// One loaded track and everything needed to play, filter and analyse it.
///
/// Owned by the player worker; other threads only see published
/// `PlayerState` snapshots.
pub struct Player {
    pub(crate) config: EngineConfig,
    pub(crate) track_name: String,
    pub(crate) original: PcmBuffer,
    pub(crate) filtered: SharedPcm,
    pub(crate) voice: Box<dyn Voice>,
    pub(crate) equalizer: Equalizer,
    pub(crate) analyzer: SpectrumAnalyzer,
    pub(crate) state: PlayerStateKind,
    /// Playback cursor, in samples.
    pub(crate) pos: usize,
    /// First sample not yet equalized into `filtered`.
    pub(crate) filt_pos: usize,
    pub(crate) time: f64,
    pub(crate) time_data: i16,
    pub(crate) orig_spect: Vec<f32>,
    pub(crate) filt_spect: Vec<f32>,
    pub(crate) volume: u32,
    pub(crate) eq_gain: [f32; EQ_BANDS],
    pub(crate) deadline_misses: u64,
    pub(crate) chunk: Vec<f32>,
}

impl Player {
    /// Validates the track, sets up the equalizer and allocates a voice.
    /// Any failure here is fatal for the session.
    pub fn load(
        track_name: impl Into<String>,
        pcm: PcmBuffer,
        output: &mut dyn AudioOutput,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        let track_name = track_name.into();
        handlers::validate_track(&track_name, &pcm, config)?;

        let mut equalizer = Equalizer::new(config.equalizer.clone());
        equalizer.init(pcm.sample_rate() as f32)?;

        let filtered = pcm.to_shared();
        let mut voice = output.allocate(filtered.clone(), pcm.sample_rate())?;
        voice.set_volume(handlers::device_volume(INITIAL_VOLUME as f32));

        let analyzer = SpectrumAnalyzer::new(config.window_size, pcm.bits());
        let bins = analyzer.spectrum_len();
        log::info!(
            "Player: Loaded '{}' ({:.2} s, {} bit, {} Hz) on {} output",
            track_name,
            pcm.duration_secs(),
            pcm.bits(),
            pcm.sample_rate(),
            output.name()
        );

        Ok(Player {
            config: config.clone(),
            track_name,
            original: pcm,
            filtered,
            voice,
            equalizer,
            analyzer,
            state: PlayerStateKind::Stop,
            pos: 0,
            filt_pos: 0,
            time: 0.0,
            time_data: 0,
            orig_spect: vec![0.0; bins],
            filt_spect: vec![0.0; bins],
            volume: INITIAL_VOLUME,
            eq_gain: [0.0; EQ_BANDS],
            deadline_misses: 0,
            chunk: Vec::with_capacity(config.filter_chunk_samples),
        })
    }

    /// One player period: refresh from the voice, then apply `event`.
    pub fn run_period(&mut self, event: Option<PlayerEvent>) {
        time::process_period(self);
        if let Some(event) = event {
            self.dispatch(event);
        }
    }

    pub fn dispatch(&mut self, event: PlayerEvent) {
        handlers::handle_event(self, event);
    }

    /// Stops output. The player must not be used afterwards.
    pub fn teardown(&mut self) {
        if let Err(e) = self.voice.stop() {
            log::warn!("Player: Failed to stop voice during teardown: {}", e);
        }
        log::info!("Player: Released '{}'", self.track_name);
    }

    pub fn snapshot(&self) -> PlayerState {
        PlayerState {
            state: self.state,
            track_name: self.track_name.clone(),
            time: self.time,
            duration: self.duration(),
            time_data: self.time_data,
            bits: self.original.bits(),
            orig_spect: self.orig_spect.clone(),
            filt_spect: self.filt_spect.clone(),
            dynamic_range: self.analyzer.dynamic_range(),
            freq_spacing: frequency_spacing(self.original.sample_rate(), self.config.window_size),
            volume: self.volume,
            eq_gain: self.eq_gain,
            deadline_misses: self.deadline_misses,
        }
    }

    // --- Accessors ---

    pub fn state(&self) -> PlayerStateKind {
        self.state
    }

    pub fn track_name(&self) -> &str {
        &self.track_name
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn duration(&self) -> f64 {
        self.original.duration_secs()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn filter_position(&self) -> usize {
        self.filt_pos
    }

    pub fn volume(&self) -> u32 {
        self.volume
    }

    pub fn eq_gains(&self) -> [f32; EQ_BANDS] {
        self.eq_gain
    }

    pub fn original(&self) -> &PcmBuffer {
        &self.original
    }

    pub fn filtered(&self) -> &SharedPcm {
        &self.filtered
    }

    pub fn voice(&self) -> &dyn Voice {
        self.voice.as_ref()
    }

    pub fn set_deadline_misses(&mut self, misses: u64) {
        self.deadline_misses = misses;
    }

    pub(crate) fn base_frequency(&self) -> f32 {
        self.original.sample_rate() as f32
    }

    pub(crate) fn track_len(&self) -> usize {
        self.original.len()
    }
}
