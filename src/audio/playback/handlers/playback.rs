use super::Player;
use crate::audio::errors::DeviceError;
use crate::audio::types::{PlayDirection, PlayerStateKind};

fn report(action: &str, result: Result<(), DeviceError>) {
    if let Err(e) = result {
        log::error!("Player: Failed to {} voice: {}", action, e);
    }
}

fn transition(player: &mut Player, next: PlayerStateKind) {
    if player.state != next {
        log::info!("Player: {} -> {}", player.state, next);
    }
    player.state = next;
}

/// Leaves fast-forward / rewind: normal direction at the cursor, base speed.
fn restore_normal_speed(player: &mut Player) {
    if player.state == PlayerStateKind::Rewind {
        player.voice.set_direction(PlayDirection::Forward);
        player.voice.set_position(player.pos);
    }
    let base = player.base_frequency();
    player.voice.set_frequency(base);
}

pub(crate) fn handle_stop(player: &mut Player) {
    if player.state != PlayerStateKind::Pause {
        report("stop", player.voice.stop());
    }
    if matches!(player.state, PlayerStateKind::Rewind | PlayerStateKind::Forward) {
        player.voice.set_direction(PlayDirection::Forward);
        let base = player.base_frequency();
        player.voice.set_frequency(base);
    }
    player.voice.set_position(0);
    player.orig_spect.fill(0.0);
    player.filt_spect.fill(0.0);
    player.time = 0.0;
    player.time_data = 0;
    player.pos = 0;
    player.filt_pos = 0;
    transition(player, PlayerStateKind::Stop);
}

pub(crate) fn handle_play(player: &mut Player) {
    match player.state {
        PlayerStateKind::Stop | PlayerStateKind::Pause => report("start", player.voice.start()),
        PlayerStateKind::Rewind | PlayerStateKind::Forward => restore_normal_speed(player),
        PlayerStateKind::Play => {}
    }
    transition(player, PlayerStateKind::Play);
}

pub(crate) fn handle_pause(player: &mut Player) {
    if player.state.is_running() {
        report("stop", player.voice.stop());
    }
    if matches!(player.state, PlayerStateKind::Rewind | PlayerStateKind::Forward) {
        restore_normal_speed(player);
    }
    transition(player, PlayerStateKind::Pause);
}

pub(crate) fn handle_rewind(player: &mut Player) {
    let step = player.config.speed_step;
    match player.state {
        PlayerStateKind::Rewind => {
            let faster = player.voice.frequency() * step;
            player.voice.set_frequency(faster);
        }
        PlayerStateKind::Stop => {
            // Nothing before sample 0: the voice reports finished on the next
            // period and the player settles back in STOP.
            player.voice.set_direction(PlayDirection::Backward);
            let faster = player.voice.frequency() * step;
            player.voice.set_frequency(faster);
        }
        PlayerStateKind::Play | PlayerStateKind::Pause | PlayerStateKind::Forward => {
            player.voice.set_direction(PlayDirection::Backward);
            player.voice.set_position(player.pos);
            let faster = player.base_frequency() * step;
            player.voice.set_frequency(faster);
        }
    }
    if !player.state.is_running() {
        report("start", player.voice.start());
    }
    transition(player, PlayerStateKind::Rewind);
}

pub(crate) fn handle_forward(player: &mut Player) {
    let step = player.config.speed_step;
    if player.state == PlayerStateKind::Rewind {
        player.voice.set_direction(PlayDirection::Forward);
        player.voice.set_position(player.pos);
        let faster = player.base_frequency() * step;
        player.voice.set_frequency(faster);
    } else {
        let faster = player.voice.frequency() * step;
        player.voice.set_frequency(faster);
    }
    if !player.state.is_running() {
        report("start", player.voice.start());
    }
    transition(player, PlayerStateKind::Forward);
}
