pub mod commands;
pub(crate) mod events;
mod handlers;
pub mod state;
mod time;

pub use commands::{EventSlot, PlayerHandle, ShutdownToken};
pub use state::Player;

use crate::audio::scheduling::PeriodicTask;
use events::SnapshotPublisher;

// --- Player Worker ---

/// Player worker loop. Each period: refresh from the voice, apply the pending
/// event, publish a snapshot, check for shutdown, account for deadline misses
/// and sleep until the next activation.
pub(crate) fn run_player_worker(
    mut player: Player,
    mut task: PeriodicTask,
    slot: EventSlot,
    shutdown: ShutdownToken,
    mut publisher: SnapshotPublisher,
) {
    log::info!("Player Worker: Entering main loop for '{}'", player.track_name());
    task.set_period();
    loop {
        player.run_period(slot.take());
        close_period(&mut player, &mut task);
        publisher.publish(player.snapshot());

        if shutdown.is_requested() {
            log::info!("Player Worker: Shutdown received, releasing player");
            break;
        }
        task.wait_for_period();
    }
    player.teardown();
    log::info!(
        "Player Worker: Stopped after {} deadline misses",
        task.misses()
    );
}

/// Checks this period's deadline and records the miss count, so the snapshot
/// published right after already includes an overrun of this period.
pub(crate) fn close_period(player: &mut Player, task: &mut PeriodicTask) {
    task.deadline_miss();
    player.set_deadline_misses(task.misses());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::config::EngineConfig;
    use crate::audio::devices::SimulatedOutput;
    use crate::audio::errors::{EngineError, LoadError};
    use crate::audio::pcm::PcmBuffer;
    use crate::audio::scheduling::{Clock, ManualClock};
    use crate::audio::types::{PlayDirection, PlayerEvent, PlayerStateKind};
    use std::sync::Arc;
    use std::time::Duration;

    const RATE: u32 = 32_000;

    fn test_config() -> EngineConfig {
        EngineConfig {
            window_size: 1024,
            filter_chunk_samples: 4000,
            ..EngineConfig::default()
        }
    }

    fn tone(seconds: f32) -> PcmBuffer {
        let len = (seconds * RATE as f32) as usize;
        let samples = (0..len)
            .map(|n| (6000.0 * (n as f32 * 0.2).sin()) as i16)
            .collect();
        PcmBuffer::new(samples, 16, 1, RATE)
    }

    fn player(clock: &Arc<ManualClock>) -> Player {
        let shared: Arc<dyn Clock> = clock.clone();
        let mut output = SimulatedOutput::new(shared);
        Player::load("tone.wav", tone(2.0), &mut output, &test_config()).unwrap()
    }

    fn tick(player: &mut Player, clock: &ManualClock, ms: u64) {
        clock.advance(Duration::from_millis(ms));
        player.run_period(None);
    }

    fn drive_to(player: &mut Player, clock: &ManualClock, target: PlayerStateKind) {
        player.dispatch(PlayerEvent::play());
        tick(player, clock, 250);
        match target {
            PlayerStateKind::Stop => player.dispatch(PlayerEvent::stop()),
            PlayerStateKind::Play => {}
            PlayerStateKind::Pause => player.dispatch(PlayerEvent::pause()),
            PlayerStateKind::Rewind => player.dispatch(PlayerEvent::rewind()),
            PlayerStateKind::Forward => player.dispatch(PlayerEvent::forward()),
        }
        tick(player, clock, 80);
    }

    #[test]
    fn stop_twice_equals_stop_once() {
        for target in [
            PlayerStateKind::Stop,
            PlayerStateKind::Play,
            PlayerStateKind::Pause,
            PlayerStateKind::Rewind,
            PlayerStateKind::Forward,
        ] {
            let clock = Arc::new(ManualClock::new());
            let mut p = player(&clock);
            drive_to(&mut p, &clock, target);

            p.dispatch(PlayerEvent::stop());
            let once = (p.state(), p.time(), p.position(), p.voice().frequency());
            p.dispatch(PlayerEvent::stop());
            let twice = (p.state(), p.time(), p.position(), p.voice().frequency());

            assert_eq!(once, twice, "from {}", target);
            assert_eq!(once.0, PlayerStateKind::Stop);
            assert_eq!(once.1, 0.0);
            assert!(p.snapshot().orig_spect.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn pause_holds_cursor_and_play_resumes() {
        let clock = Arc::new(ManualClock::new());
        let mut p = player(&clock);
        p.dispatch(PlayerEvent::play());
        tick(&mut p, &clock, 500);
        assert_eq!(p.position(), 16_000);

        p.dispatch(PlayerEvent::pause());
        tick(&mut p, &clock, 1000);
        assert_eq!(p.state(), PlayerStateKind::Pause);
        assert_eq!(p.voice().position(), 16_000);

        p.dispatch(PlayerEvent::play());
        tick(&mut p, &clock, 250);
        assert_eq!(p.position(), 24_000);
        assert!((p.time() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn forward_accelerates_and_play_restores_speed() {
        let clock = Arc::new(ManualClock::new());
        let mut p = player(&clock);
        p.dispatch(PlayerEvent::play());
        p.dispatch(PlayerEvent::forward());
        assert_eq!(p.voice().frequency(), 40_000.0);
        p.dispatch(PlayerEvent::forward());
        assert_eq!(p.voice().frequency(), 50_000.0);
        assert_eq!(p.state(), PlayerStateKind::Forward);

        p.dispatch(PlayerEvent::play());
        assert_eq!(p.voice().frequency(), RATE as f32);
        assert_eq!(p.voice().direction(), PlayDirection::Forward);
    }

    #[test]
    fn rewind_plays_backward_from_cursor() {
        let clock = Arc::new(ManualClock::new());
        let mut p = player(&clock);
        p.dispatch(PlayerEvent::play());
        tick(&mut p, &clock, 1000);
        assert_eq!(p.position(), 32_000);

        p.dispatch(PlayerEvent::rewind());
        assert_eq!(p.voice().direction(), PlayDirection::Backward);
        assert_eq!(p.voice().frequency(), 40_000.0);
        tick(&mut p, &clock, 500);
        assert_eq!(p.position(), 12_000);

        p.dispatch(PlayerEvent::rewind());
        assert_eq!(p.voice().frequency(), 50_000.0);

        p.dispatch(PlayerEvent::pause());
        assert_eq!(p.voice().direction(), PlayDirection::Forward);
        assert_eq!(p.voice().frequency(), RATE as f32);
        assert_eq!(p.voice().position(), 12_000);
        assert!(!p.voice().is_playing());
    }

    #[test]
    fn rewind_from_stop_settles_back_in_stop() {
        let clock = Arc::new(ManualClock::new());
        let mut p = player(&clock);
        p.dispatch(PlayerEvent::rewind());
        assert_eq!(p.state(), PlayerStateKind::Rewind);
        tick(&mut p, &clock, 80);
        assert_eq!(p.state(), PlayerStateKind::Stop);
        assert_eq!(p.voice().direction(), PlayDirection::Forward);
        assert_eq!(p.voice().frequency(), RATE as f32);
    }

    #[test]
    fn end_of_track_stops_player() {
        let clock = Arc::new(ManualClock::new());
        let mut p = player(&clock);
        p.dispatch(PlayerEvent::play());
        tick(&mut p, &clock, 3000);
        assert_eq!(p.state(), PlayerStateKind::Stop);
        assert_eq!(p.time(), 0.0);
        assert_eq!(p.position(), 0);
    }

    #[test]
    fn volume_and_seek_are_clamped() {
        let clock = Arc::new(ManualClock::new());
        let mut p = player(&clock);
        p.dispatch(PlayerEvent::volume(150.0));
        assert_eq!(p.volume(), 100);
        assert_eq!(p.voice().volume(), 255);
        p.dispatch(PlayerEvent::volume(-5.0));
        assert_eq!(p.volume(), 0);
        assert_eq!(p.voice().volume(), 0);
        p.dispatch(PlayerEvent::volume(40.0));
        assert_eq!(p.voice().volume(), 102);

        p.dispatch(PlayerEvent::seek(10.0));
        assert_eq!(p.time(), 2.0);
        p.dispatch(PlayerEvent::seek(-1.0));
        assert_eq!(p.time(), 0.0);
        p.dispatch(PlayerEvent::seek(1.0));
        assert_eq!(p.position(), 32_000);
        assert_eq!(p.voice().position(), 32_000);
        assert_eq!(p.state(), PlayerStateKind::Stop);
    }

    #[test]
    fn band_gain_clamps_and_rewinds_filter_cursor() {
        let clock = Arc::new(ManualClock::new());
        let mut p = player(&clock);
        p.dispatch(PlayerEvent::play());
        tick(&mut p, &clock, 500);
        assert!(p.filter_position() > p.position());

        p.dispatch(PlayerEvent::band_gain(1, 30.0));
        assert_eq!(p.eq_gains(), [0.0, 20.0, 0.0, 0.0]);
        assert_eq!(p.filter_position(), p.position());

        p.dispatch(PlayerEvent::band_gain(7, 3.0));
        assert_eq!(p.eq_gains(), [0.0, 20.0, 0.0, 0.0]);
    }

    #[test]
    fn filtering_stays_within_lookahead() {
        let clock = Arc::new(ManualClock::new());
        let mut p = player(&clock);
        let config = test_config();
        let horizon = config.filter_chunk_samples * config.filter_lookahead_chunks;
        p.dispatch(PlayerEvent::play());
        for _ in 0..20 {
            tick(&mut p, &clock, 80);
            if p.state() != PlayerStateKind::Play {
                break;
            }
            assert!(p.filter_position() >= p.position());
            assert!(p.filter_position() <= p.position() + horizon);
        }
    }

    #[test]
    fn seeking_back_keeps_filtering_within_lookahead() {
        let clock = Arc::new(ManualClock::new());
        let mut p = player(&clock);
        let config = test_config();
        let horizon = config.filter_chunk_samples * config.filter_lookahead_chunks;
        p.dispatch(PlayerEvent::play());
        for _ in 0..10 {
            tick(&mut p, &clock, 80);
        }
        assert!(p.filter_position() > 20_000);

        p.dispatch(PlayerEvent::seek(0.0));
        assert_eq!(p.filter_position(), 0);
        tick(&mut p, &clock, 80);
        assert_eq!(p.position(), 2560);
        assert!(p.filter_position() >= p.position());
        assert!(p.filter_position() <= p.position() + horizon);
    }

    #[test]
    fn rewinding_keeps_filtering_within_lookahead() {
        let clock = Arc::new(ManualClock::new());
        let mut p = player(&clock);
        let config = test_config();
        let horizon = config.filter_chunk_samples * config.filter_lookahead_chunks;
        p.dispatch(PlayerEvent::play());
        for _ in 0..15 {
            tick(&mut p, &clock, 80);
        }
        p.dispatch(PlayerEvent::rewind());
        for _ in 0..8 {
            tick(&mut p, &clock, 80);
            if p.state() != PlayerStateKind::Rewind {
                break;
            }
            assert!(p.filter_position() >= p.position());
            assert!(p.filter_position() <= p.position() + horizon);
        }
    }

    #[test]
    fn low_rate_track_loads_and_filters() {
        let clock = Arc::new(ManualClock::new());
        let shared: Arc<dyn Clock> = clock.clone();
        let mut output = SimulatedOutput::new(shared);
        let samples = (0..16_000)
            .map(|n| (6000.0 * (n as f32 * 0.1).sin()) as i16)
            .collect();
        let pcm = PcmBuffer::new(samples, 16, 1, 16_000);
        let mut p = Player::load("speech.wav", pcm, &mut output, &EngineConfig::default()).unwrap();

        p.dispatch(PlayerEvent::band_gain(3, 6.0));
        assert_eq!(p.eq_gains(), [0.0, 0.0, 0.0, 6.0]);
        p.dispatch(PlayerEvent::play());
        tick(&mut p, &clock, 80);
        assert_eq!(p.position(), 1280);
        assert!(p.filter_position() > p.position());
    }

    #[test]
    fn overrun_is_counted_in_the_same_period() {
        let clock = Arc::new(ManualClock::new());
        let mut p = player(&clock);
        let shared: Arc<dyn Clock> = clock.clone();
        let mut task = PeriodicTask::new("Player", test_config().player.into(), shared);
        task.set_period();

        p.run_period(None);
        close_period(&mut p, &mut task);
        assert_eq!(p.snapshot().deadline_misses, 0);

        task.wait_for_period();
        clock.advance(Duration::from_millis(200));
        p.run_period(None);
        close_period(&mut p, &mut task);
        assert_eq!(p.snapshot().deadline_misses, 1);
    }

    #[test]
    fn load_rejects_unsupported_formats() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new());
        let config = test_config();
        let cases = [
            PcmBuffer::new(vec![0; 100], 24, 1, RATE),
            PcmBuffer::new(vec![0; 100], 16, 2, RATE),
            PcmBuffer::new(vec![0; 100], 16, 1, 48_000),
            PcmBuffer::new(vec![0; 100], 16, 1, 0),
            PcmBuffer::new(Vec::new(), 16, 1, RATE),
        ];
        for pcm in cases {
            let mut output = SimulatedOutput::new(clock.clone());
            let result = Player::load("bad", pcm, &mut output, &config);
            assert!(matches!(result, Err(EngineError::Load(_))));
        }

        let mut exhausted = SimulatedOutput::new(clock).with_voice_limit(0);
        let result = Player::load("ok", tone(0.5), &mut exhausted, &config);
        assert!(matches!(result, Err(EngineError::Device(_))));
    }

    #[test]
    fn eight_bit_track_loads_with_its_range() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new());
        let mut output = SimulatedOutput::new(clock);
        let pcm = PcmBuffer::new(vec![-128, 0, 127, 5], 8, 1, RATE);
        let p = Player::load("byte", pcm, &mut output, &test_config()).unwrap();
        assert!((p.snapshot().dynamic_range - 48.16).abs() < 0.01);
        assert_eq!(p.original().samples(), &[-128, 0, 127, 5]);

        let mut output = SimulatedOutput::new(Arc::new(ManualClock::new()));
        let wide = PcmBuffer::new(vec![0; 4], 32, 1, RATE);
        assert!(matches!(
            Player::load("wide", wide, &mut output, &test_config()),
            Err(EngineError::Load(LoadError::UnsupportedBitDepth { bits: 32, max: 16 }))
        ));
    }
}
