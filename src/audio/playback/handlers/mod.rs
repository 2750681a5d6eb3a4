pub mod audio_effects;
pub mod playback;
pub mod track;

pub(crate) use audio_effects::*;
pub(crate) use playback::*;
pub(crate) use track::*;

use super::state::Player;
use crate::audio::types::{PlayerEvent, Signal};

/// Applies one control event to the player.
pub(crate) fn handle_event(player: &mut Player, event: PlayerEvent) {
    log::debug!("Player: Handling {:?} in {}", event, player.state);
    match event.signal {
        Signal::Stop => handle_stop(player),
        Signal::Play => handle_play(player),
        Signal::Pause => handle_pause(player),
        Signal::Rewind => handle_rewind(player),
        Signal::Forward => handle_forward(player),
        Signal::Volume => handle_volume(player, event.value),
        Signal::Seek => handle_seek(player, event.value),
        Signal::BandGain(band) => {
            if let Err(e) = handle_band_gain(player, band, event.value) {
                log::warn!("Player: Ignoring gain change: {}", e);
            }
        }
    }
}
