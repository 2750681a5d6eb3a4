use crate::audio::pcm::PcmSource;

use super::handlers;
use super::state::Player;

/// Per-period work that does not depend on the pending event.
pub(crate) fn process_period(player: &mut Player) {
    if !player.state.is_running() {
        return;
    }

    let raw = player.voice.position();
    if raw < 0 {
        log::info!("Player: '{}' reached the end of the track", player.track_name);
        handlers::handle_stop(player);
        return;
    }
    player.pos = (raw as usize).min(player.track_len());
    player.time = player.pos as f64 / player.original.sample_rate() as f64;

    filter_ahead(player);

    player.time_data = player.filtered.get(player.pos).unwrap_or(0);
    player.orig_spect = player.analyzer.compute(&player.original, player.pos);
    player.filt_spect = player.analyzer.compute(&player.filtered, player.pos);
    log::trace!(
        "Player: t={:.3}s pos={} filt_pos={}",
        player.time,
        player.pos,
        player.filt_pos
    );
}

/// Equalizes the next chunk of the original track into the filtered one,
/// unless the filtering cursor is already far enough ahead of playback.
///
/// The filtering cursor is kept within `[pos, pos + horizon]`. Playback that
/// moves backward (rewind) leaves it behind the horizon; it then restarts
/// from the playback cursor.
pub(crate) fn filter_ahead(player: &mut Player) -> usize {
    let len = player.track_len();
    let chunk_len = player.config.filter_chunk_samples;
    let horizon = player
        .pos
        .saturating_add(chunk_len.saturating_mul(player.config.filter_lookahead_chunks));

    if player.filt_pos < player.pos {
        log::debug!(
            "Player: Filtering fell behind playback ({} < {}), skipping ahead",
            player.filt_pos,
            player.pos
        );
        player.filt_pos = player.pos;
    } else if player.filt_pos > horizon {
        log::debug!(
            "Player: Filtering too far ahead of playback ({} > {}), restarting at {}",
            player.filt_pos,
            horizon,
            player.pos
        );
        player.filt_pos = player.pos;
    }
    if player.filt_pos >= horizon || player.filt_pos >= len {
        return 0;
    }

    let count = chunk_len.min(len - player.filt_pos).min(horizon - player.filt_pos);
    player.chunk.clear();
    player.chunk.resize(count, 0.0);
    let read = player.original.read_into(player.filt_pos, &mut player.chunk);
    if let Err(e) = player.equalizer.equalize(&mut player.chunk[..read]) {
        log::error!("Player: Equalizer failed at sample {}: {}", player.filt_pos, e);
        return 0;
    }
    let written = player.filtered.write_from(player.filt_pos, &player.chunk[..read]);
    player.filt_pos += written;
    written
}
