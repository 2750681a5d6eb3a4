use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::errors::ConfigError;

// --- Player Worker Constants ---
pub const PLAYER_PERIOD_MS: u64 = 80;
pub const PLAYER_DEADLINE_MS: u64 = 80;
pub const PLAYER_PRIORITY: u8 = 20;

// --- Input / Render Worker Constants ---
pub const INPUT_PERIOD_MS: u64 = 50;
pub const INPUT_DEADLINE_MS: u64 = 50;
pub const INPUT_PRIORITY: u8 = 99;
pub const RENDER_PERIOD_MS: u64 = 40;
pub const RENDER_DEADLINE_MS: u64 = 40;
pub const RENDER_PRIORITY: u8 = 10;

// --- Track Format Limits ---
pub const MAX_SAMPLE_RATE: u32 = 44_100;
pub const MAX_BITS_PER_SAMPLE: u16 = 16;
pub const MAX_CHANNELS: u16 = 1;

// --- Spectrogram Constants ---
pub const WINDOW_SIZE: usize = 8192;

// --- Online Filtering Constants ---
/// Samples equalized per period: half a second at the highest accepted rate.
pub const FILTER_CHUNK_SAMPLES: usize = MAX_SAMPLE_RATE as usize / 2;
/// How many chunks the filtering cursor may lead the playback cursor.
pub const FILTER_LOOKAHEAD_CHUNKS: usize = 2;

// --- EQ Filter Constants ---
pub const EQ_BANDS: usize = 4;
pub const EQ_CENTER_FREQUENCIES_HZ: [f32; EQ_BANDS] = [250.0, 2000.0, 5000.0, 10000.0];
/// Bandwidth of each peaking band, in octaves.
pub const EQ_BANDWIDTH_OCTAVES: f32 = 1.0;
pub const EQ_MAX_GAIN_DB: f32 = 20.0;

// --- Transport Constants ---
/// Speed multiplier applied on each fast-forward / rewind press.
pub const SPEED_STEP: f32 = 1.25;
pub const MAX_VOLUME: f32 = 100.0;
/// Device volume range is 0..=255, the player exposes 0..=100.
pub const DEVICE_VOLUME_SCALE: f32 = 2.55;
pub const INITIAL_VOLUME: u32 = 100;

/// Period / deadline / priority of one periodic worker, as read from config.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerTiming {
    pub period_ms: u64,
    pub deadline_ms: u64,
    pub priority: u8,
}

impl WorkerTiming {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

/// Upper bounds on the track format the player accepts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormatLimits {
    pub max_sample_rate: u32,
    pub max_bits_per_sample: u16,
    pub max_channels: u16,
}

impl Default for FormatLimits {
    fn default() -> Self {
        FormatLimits {
            max_sample_rate: MAX_SAMPLE_RATE,
            max_bits_per_sample: MAX_BITS_PER_SAMPLE,
            max_channels: MAX_CHANNELS,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EqualizerConfig {
    pub center_frequencies_hz: [f32; EQ_BANDS],
    pub bandwidth_octaves: f32,
    pub max_gain_db: f32,
    /// Low shelf on the first band and high shelf on the last instead of
    /// peaking filters.
    pub shelve_outer_bands: bool,
}

impl Default for EqualizerConfig {
    fn default() -> Self {
        EqualizerConfig {
            center_frequencies_hz: EQ_CENTER_FREQUENCIES_HZ,
            bandwidth_octaves: EQ_BANDWIDTH_OCTAVES,
            max_gain_db: EQ_MAX_GAIN_DB,
            shelve_outer_bands: false,
        }
    }
}

/// Everything the engine reads at startup. Missing keys fall back to the
/// constants above.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub player: WorkerTiming,
    pub input: WorkerTiming,
    pub render: WorkerTiming,
    pub limits: FormatLimits,
    pub equalizer: EqualizerConfig,
    pub window_size: usize,
    pub filter_chunk_samples: usize,
    pub filter_lookahead_chunks: usize,
    pub speed_step: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            player: WorkerTiming {
                period_ms: PLAYER_PERIOD_MS,
                deadline_ms: PLAYER_DEADLINE_MS,
                priority: PLAYER_PRIORITY,
            },
            input: WorkerTiming {
                period_ms: INPUT_PERIOD_MS,
                deadline_ms: INPUT_DEADLINE_MS,
                priority: INPUT_PRIORITY,
            },
            render: WorkerTiming {
                period_ms: RENDER_PERIOD_MS,
                deadline_ms: RENDER_DEADLINE_MS,
                priority: RENDER_PRIORITY,
            },
            limits: FormatLimits::default(),
            equalizer: EqualizerConfig::default(),
            window_size: WINDOW_SIZE,
            filter_chunk_samples: FILTER_CHUNK_SAMPLES,
            filter_lookahead_chunks: FILTER_LOOKAHEAD_CHUNKS,
            speed_step: SPEED_STEP,
        }
    }
}

impl EngineConfig {
    /// Reads a JSON config file and validates it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: EngineConfig =
            serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                source: e,
            })?;
        config.validate()?;
        log::info!("Config: Loaded engine configuration from '{}'", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, timing) in [
            ("player", &self.player),
            ("input", &self.input),
            ("render", &self.render),
        ] {
            if timing.period_ms == 0 || timing.deadline_ms == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{} worker period and deadline must be non-zero",
                    name
                )));
            }
        }
        if self.window_size < 4 {
            return Err(ConfigError::Invalid(format!(
                "window size {} is too small",
                self.window_size
            )));
        }
        if self.filter_chunk_samples == 0 || self.filter_lookahead_chunks == 0 {
            return Err(ConfigError::Invalid(
                "filter chunk size and look-ahead must be non-zero".to_string(),
            ));
        }
        if self.equalizer.bandwidth_octaves <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "EQ bandwidth must be positive, got {}",
                self.equalizer.bandwidth_octaves
            )));
        }
        if self.equalizer.max_gain_db <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "EQ max gain must be positive, got {}",
                self.equalizer.max_gain_db
            )));
        }
        if self.speed_step <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "speed step must be greater than 1, got {}",
                self.speed_step
            )));
        }
        Ok(())
    }

    /// Bins in each spectrogram.
    pub fn spectrum_len(&self) -> usize {
        self.window_size / 2 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.spectrum_len(), 4097);
        assert_eq!(config.player.period(), Duration::from_millis(80));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "windowSize": 1024, "speedStep": 1.5 }"#).unwrap();
        assert_eq!(config.window_size, 1024);
        assert_eq!(config.speed_step, 1.5);
        assert_eq!(config.equalizer, EqualizerConfig::default());
        assert_eq!(config.limits.max_sample_rate, 44_100);

        let shelved: EngineConfig =
            serde_json::from_str(r#"{ "equalizer": { "shelveOuterBands": true } }"#).unwrap();
        assert!(shelved.equalizer.shelve_outer_bands);
        assert_eq!(shelved.equalizer.max_gain_db, EQ_MAX_GAIN_DB);
    }

    #[test]
    fn zero_period_is_rejected() {
        let mut config = EngineConfig::default();
        config.render.period_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
