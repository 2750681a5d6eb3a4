use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use eqplayer_lib::audio::config::{EngineConfig, WorkerTiming};
use eqplayer_lib::audio::devices::{AudioOutput, SimulatedOutput, Voice};
use eqplayer_lib::audio::errors::{DeviceError, EngineError, LoadError};
use eqplayer_lib::audio::pcm::{PcmBuffer, SharedPcm};
use eqplayer_lib::audio::scheduling::{Clock, MonotonicClock};
use eqplayer_lib::audio::types::{PlayDirection, PlayerEvent, PlayerState, PlayerStateKind};
use eqplayer_lib::console::ScriptedInput;
use eqplayer_lib::engine::{InputPoll, InputSource, StateRenderer};
use eqplayer_lib::{Engine, PlayerHandle, Session};

const RATE: u32 = 22_050;

fn fast_timing() -> WorkerTiming {
    WorkerTiming {
        period_ms: 5,
        deadline_ms: 50,
        priority: 1,
    }
}

fn fast_config() -> EngineConfig {
    EngineConfig {
        player: fast_timing(),
        input: fast_timing(),
        render: fast_timing(),
        window_size: 512,
        filter_chunk_samples: 2048,
        ..EngineConfig::default()
    }
}

fn session(pcm: PcmBuffer) -> Session {
    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    Session {
        config: fast_config(),
        track_name: "ramp.wav".to_string(),
        pcm,
        output: Box::new(SimulatedOutput::new(clock.clone())),
        clock,
    }
}

fn ramp(seconds: usize) -> PcmBuffer {
    let samples = (0..RATE as usize * seconds)
        .map(|n| ((n % 200) as i16 - 100) * 50)
        .collect();
    PcmBuffer::new(samples, 16, 1, RATE)
}

fn wait_for(handle: &PlayerHandle, pred: impl Fn(&PlayerState) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if pred(&handle.snapshot()) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

struct CountingRenderer(Arc<AtomicUsize>);

impl StateRenderer for CountingRenderer {
    fn render(&mut self, _state: &PlayerState) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn engine_plays_and_shuts_down() {
    let mut engine = Engine::start(session(ramp(10))).unwrap();
    let renders = Arc::new(AtomicUsize::new(0));
    engine
        .spawn_renderer(Box::new(CountingRenderer(renders.clone())))
        .unwrap();

    let handle = engine.handle();
    assert_eq!(handle.state(), PlayerStateKind::Stop);
    assert_eq!(handle.track_name(), "ramp.wav");

    handle.dispatch(PlayerEvent::play());
    assert!(wait_for(&handle, |s| s.state == PlayerStateKind::Play));
    assert!(wait_for(&handle, |s| s.time > 0.0));

    handle.dispatch(PlayerEvent::volume(30.0));
    assert!(wait_for(&handle, |s| s.volume == 30));

    engine.shutdown();
    engine.join().unwrap();
    assert!(renders.load(Ordering::SeqCst) > 0);
}

#[test]
fn scripted_quit_ends_the_session() {
    let mut engine = Engine::start(session(ramp(10))).unwrap();
    let handle = engine.handle();
    let mut script = vec!["play"];
    script.extend(std::iter::repeat_n("", 40));
    script.push("quit");
    engine
        .spawn_input(Box::new(ScriptedInput::new(script)))
        .unwrap();

    engine.join().unwrap();
    // The last snapshot outlives the player worker.
    assert_eq!(handle.state(), PlayerStateKind::Play);
}

#[test]
fn unsupported_track_fails_at_start() {
    let stereo = PcmBuffer::new(vec![0; 64], 16, 2, RATE);
    let result = Engine::start(session(stereo));
    assert!(matches!(
        result,
        Err(EngineError::Load(LoadError::TooManyChannels { channels: 2, max: 1 }))
    ));
}

#[test]
fn invalid_config_fails_at_start() {
    let mut bad = session(ramp(1));
    bad.config.player.period_ms = 0;
    assert!(matches!(Engine::start(bad), Err(EngineError::Config(_))));
}

/// Voice whose device dies as soon as playback is polled.
struct BrokenVoice {
    running: bool,
}

impl Voice for BrokenVoice {
    fn start(&mut self) -> Result<(), DeviceError> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.running = false;
        Ok(())
    }

    fn position(&self) -> i64 {
        panic!("device vanished");
    }

    fn set_position(&mut self, _position: usize) {}

    fn frequency(&self) -> f32 {
        RATE as f32
    }

    fn set_frequency(&mut self, _frequency: f32) {}

    fn direction(&self) -> PlayDirection {
        PlayDirection::Forward
    }

    fn set_direction(&mut self, _direction: PlayDirection) {}

    fn volume(&self) -> u8 {
        255
    }

    fn set_volume(&mut self, _volume: u8) {}

    fn is_playing(&self) -> bool {
        self.running
    }
}

struct BrokenOutput;

impl AudioOutput for BrokenOutput {
    fn allocate(&mut self, _pcm: SharedPcm, _sample_rate: u32) -> Result<Box<dyn Voice>, DeviceError> {
        Ok(Box::new(BrokenVoice { running: false }))
    }

    fn name(&self) -> &str {
        "broken"
    }
}

struct SilentInput;

impl InputSource for SilentInput {
    fn poll(&mut self) -> InputPoll {
        InputPoll::Idle
    }
}

#[test]
fn player_panic_ends_every_worker() {
    let mut broken = session(ramp(10));
    broken.output = Box::new(BrokenOutput);
    let mut engine = Engine::start(broken).unwrap();
    engine.spawn_input(Box::new(SilentInput)).unwrap();
    engine
        .spawn_renderer(Box::new(CountingRenderer(Arc::new(AtomicUsize::new(0)))))
        .unwrap();
    let token = engine.shutdown_token();

    engine.handle().dispatch(PlayerEvent::play());
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(engine.join());
    });

    let joined = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("join should return once the player dies");
    assert!(matches!(joined, Err(EngineError::WorkerPanicked(name)) if name == "player"));
    assert!(token.is_requested());
}
