use super::Player;
use crate::audio::config::{DEVICE_VOLUME_SCALE, MAX_VOLUME};
use crate::audio::errors::EqualizerError;

/// Maps a 0..=100 player volume onto the device's 0..=255 range.
pub(crate) fn device_volume(volume: f32) -> u8 {
    (volume.clamp(0.0, MAX_VOLUME) * DEVICE_VOLUME_SCALE)
        .round()
        .clamp(0.0, u8::MAX as f32) as u8
}

pub(crate) fn handle_volume(player: &mut Player, volume: f32) {
    let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, MAX_VOLUME) };
    player.voice.set_volume(device_volume(volume));
    player.volume = volume as u32;
    log::debug!("Player: Volume set to {}", player.volume);
}

/// Changes one band's gain and makes the filtering cursor re-equalize from
/// the playback cursor on, so the change is heard within one chunk.
pub(crate) fn handle_band_gain(
    player: &mut Player,
    band: usize,
    gain_db: f32,
) -> Result<f32, EqualizerError> {
    let gain_db = if gain_db.is_nan() { 0.0 } else { gain_db };
    let applied = player.equalizer.set_gain(band, gain_db)?;
    player.eq_gain[band] = applied;
    player.filt_pos = player.pos;
    log::info!("Player: Band {} gain {:+.1} dB", band, applied);
    Ok(applied)
}
