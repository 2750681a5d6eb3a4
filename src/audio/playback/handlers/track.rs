use super::Player;
use crate::audio::config::EngineConfig;
use crate::audio::errors::LoadError;
use crate::audio::pcm::{PcmBuffer, PcmSource};

/// Rejects tracks outside the configured format limits.
pub(crate) fn validate_track(
    name: &str,
    pcm: &PcmBuffer,
    config: &EngineConfig,
) -> Result<(), LoadError> {
    let limits = &config.limits;
    if pcm.bits() == 0 || pcm.bits() > limits.max_bits_per_sample {
        return Err(LoadError::UnsupportedBitDepth {
            bits: pcm.bits(),
            max: limits.max_bits_per_sample,
        });
    }
    if pcm.channels() > limits.max_channels {
        return Err(LoadError::TooManyChannels {
            channels: pcm.channels(),
            max: limits.max_channels,
        });
    }
    if pcm.sample_rate() == 0 {
        return Err(LoadError::InvalidSampleRate(pcm.sample_rate()));
    }
    if pcm.sample_rate() > limits.max_sample_rate {
        return Err(LoadError::SampleRateTooHigh {
            rate: pcm.sample_rate(),
            max: limits.max_sample_rate,
        });
    }
    if pcm.is_empty() {
        return Err(LoadError::EmptyTrack {
            name: name.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn handle_seek(player: &mut Player, seconds: f32) {
    let duration = player.duration();
    let target = if seconds.is_nan() {
        0.0
    } else {
        (seconds as f64).clamp(0.0, duration)
    };
    let position = (target * player.original.sample_rate() as f64).round() as usize;
    player.pos = position.min(player.track_len());
    player.time = target;
    player.voice.set_position(player.pos);
    // Re-equalize from the new cursor with the current gains.
    player.filt_pos = player.pos;
    log::info!("Player: Seek to {:.2} s (sample {})", target, player.pos);
}
