pub mod audio;
pub mod console;
pub mod engine;

use std::path::PathBuf;
use std::sync::Arc;

use audio::config::EngineConfig;
use audio::decoding::{SampleLoader, SymphoniaLoader, track_name};
use audio::devices::AudioOutput;
use audio::errors::{EngineError, LoadError};
use audio::scheduling::{Clock, MonotonicClock};
use audio::types::PlayerEvent;

pub use audio::playback::{Player, PlayerHandle};
pub use engine::{Engine, Session};

/// Options for one interactive session.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub track: PathBuf,
    /// JSON engine configuration; defaults are used when absent.
    pub config: Option<PathBuf>,
    /// Use the clock-driven simulated output even when a device is available.
    pub headless: bool,
    /// Initial volume, 0..=100.
    pub volume: Option<f32>,
}

fn select_output(headless: bool, clock: &Arc<dyn Clock>) -> Box<dyn AudioOutput + Send> {
    if !headless {
        #[cfg(feature = "device")]
        return Box::new(audio::devices::CpalOutput::new());
        #[cfg(not(feature = "device"))]
        log::warn!("Engine: Built without the 'device' feature, playing on the simulated output");
    }
    Box::new(audio::devices::SimulatedOutput::new(clock.clone()))
}

/// Decodes the track, starts the engine with stdin control and a log status
/// line, and blocks until the session ends.
pub fn run(options: RunOptions) -> Result<(), EngineError> {
    let config = match &options.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    let pcm = SymphoniaLoader::new()
        .load(&options.track)
        .map_err(LoadError::from)?;
    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    let output = select_output(options.headless, &clock);

    let mut engine = Engine::start(Session {
        config,
        track_name: track_name(&options.track),
        pcm,
        output,
        clock,
    })?;
    engine.spawn_renderer(Box::new(console::LogRenderer::new()))?;
    engine.spawn_input(Box::new(console::StdinInput::spawn()?))?;

    if let Some(volume) = options.volume {
        engine.handle().dispatch(PlayerEvent::volume(volume));
    }
    log::info!("Engine: Ready. Commands: play, pause, stop, rw, ff, vol N, seek S, eq B dB, quit");
    engine.join()
}
