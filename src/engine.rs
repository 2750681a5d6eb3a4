use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};

use tokio::sync::watch;

use crate::audio::config::EngineConfig;
use crate::audio::devices::AudioOutput;
use crate::audio::errors::EngineError;
use crate::audio::pcm::PcmBuffer;
use crate::audio::playback::events::SnapshotPublisher;
use crate::audio::playback::{
    EventSlot, Player, PlayerHandle, ShutdownToken, run_player_worker,
};
use crate::audio::scheduling::{Clock, PeriodicTask};
use crate::audio::types::{PlayerEvent, PlayerState};

// --- Collaborator Traits ---

/// Result of one non-blocking poll of an input source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputPoll {
    Event(PlayerEvent),
    Quit,
    Idle,
    /// The source will never produce anything again.
    Closed,
}

/// Producer of control events, polled once per input period.
pub trait InputSource {
    fn poll(&mut self) -> InputPoll;
}

/// Consumer of player snapshots, called once per render period.
pub trait StateRenderer {
    fn render(&mut self, state: &PlayerState);
}

// --- Engine ---

/// Everything needed to start a playback session.
pub struct Session {
    pub config: EngineConfig,
    pub track_name: String,
    pub pcm: PcmBuffer,
    pub output: Box<dyn AudioOutput + Send>,
    pub clock: Arc<dyn Clock>,
}

/// A running session: the player worker plus optional input and render
/// workers, all stopped through one shutdown token.
pub struct Engine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    handle: PlayerHandle,
    shutdown: ShutdownToken,
    workers: Vec<(&'static str, JoinHandle<()>)>,
}

/// Requests shutdown if the worker holding it unwinds, so the other workers
/// leave their loops instead of waiting on a dead peer.
struct PanicGuard {
    name: &'static str,
    shutdown: ShutdownToken,
}

impl Drop for PanicGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            log::error!("Engine: {} worker panicked, shutting down", self.name);
            self.shutdown.request();
        }
    }
}

fn spawn_worker<F>(
    name: &'static str,
    shutdown: &ShutdownToken,
    body: F,
) -> Result<JoinHandle<()>, EngineError>
where
    F: FnOnce() + Send + 'static,
{
    let guard = PanicGuard {
        name,
        shutdown: shutdown.clone(),
    };
    thread::Builder::new()
        .name(format!("{}-worker", name))
        .spawn(move || {
            let _guard = guard;
            body();
        })
        .map_err(|e| EngineError::WorkerSpawn {
            name: name.to_string(),
            source: e,
        })
}

impl Engine {
    /// Loads the track on a new player worker and returns once it is ready.
    /// Load failures are returned here rather than from `join`.
    pub fn start(session: Session) -> Result<Self, EngineError> {
        session.config.validate()?;
        let config = session.config.clone();
        let clock = session.clock.clone();
        let slot = EventSlot::new();
        let shutdown = ShutdownToken::new();

        type Ready = Result<watch::Receiver<PlayerState>, EngineError>;
        let (ready_tx, ready_rx) = mpsc::channel::<Ready>();
        let worker_slot = slot.clone();
        let worker_shutdown = shutdown.clone();

        let player_thread = spawn_worker("player", &shutdown, move || {
            let Session {
                config,
                track_name,
                pcm,
                mut output,
                clock,
            } = session;
            // The voice is created here: some output streams must stay on the
            // thread that opened them.
            let player = match Player::load(track_name, pcm, output.as_mut(), &config) {
                Ok(player) => player,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let (publisher, receiver) = SnapshotPublisher::new(player.snapshot());
            if ready_tx.send(Ok(receiver)).is_err() {
                log::warn!("Player Worker: Engine went away before startup finished");
                return;
            }
            let task = PeriodicTask::new("Player", config.player.into(), clock);
            run_player_worker(player, task, worker_slot, worker_shutdown, publisher);
        })?;

        let receiver = match ready_rx.recv() {
            Ok(Ok(receiver)) => receiver,
            Ok(Err(e)) => {
                let _ = player_thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = player_thread.join();
                return Err(EngineError::WorkerPanicked("player".to_string()));
            }
        };
        log::info!("Engine: Player worker ready");

        Ok(Engine {
            config,
            clock,
            handle: PlayerHandle::new(slot, receiver),
            shutdown,
            workers: vec![("player", player_thread)],
        })
    }

    pub fn handle(&self) -> PlayerHandle {
        self.handle.clone()
    }

    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.request();
    }

    /// Polls `source` every input period and forwards what it produces.
    /// `Quit` and a closed source both end the session.
    pub fn spawn_input(&mut self, mut source: Box<dyn InputSource + Send>) -> Result<(), EngineError> {
        let handle = self.handle.clone();
        let shutdown = self.shutdown.clone();
        let mut task = PeriodicTask::new("Input", self.config.input.into(), self.clock.clone());
        let thread = spawn_worker("input", &self.shutdown, move || {
            task.set_period();
            loop {
                match source.poll() {
                    InputPoll::Event(event) => {
                        if let Some(lost) = handle.dispatch(event) {
                            log::debug!("Input Worker: {:?} was never consumed", lost);
                        }
                    }
                    InputPoll::Quit => shutdown.request(),
                    InputPoll::Closed => {
                        log::info!("Input Worker: Input closed, ending session");
                        shutdown.request();
                    }
                    InputPoll::Idle => {}
                }
                if shutdown.is_requested() {
                    break;
                }
                task.deadline_miss();
                task.wait_for_period();
            }
            log::info!("Input Worker: Stopped");
        })?;
        self.workers.push(("input", thread));
        Ok(())
    }

    /// Hands the latest snapshot to `renderer` every render period.
    pub fn spawn_renderer(
        &mut self,
        mut renderer: Box<dyn StateRenderer + Send>,
    ) -> Result<(), EngineError> {
        let handle = self.handle.clone();
        let shutdown = self.shutdown.clone();
        let mut task = PeriodicTask::new("Render", self.config.render.into(), self.clock.clone());
        let thread = spawn_worker("render", &self.shutdown, move || {
            task.set_period();
            loop {
                renderer.render(&handle.snapshot());
                if shutdown.is_requested() {
                    break;
                }
                task.deadline_miss();
                task.wait_for_period();
            }
            log::info!("Render Worker: Stopped");
        })?;
        self.workers.push(("render", thread));
        Ok(())
    }

    /// Waits for every worker. Returns the first worker panic, if any.
    pub fn join(mut self) -> Result<(), EngineError> {
        let mut result = Ok(());
        for (name, worker) in std::mem::take(&mut self.workers) {
            if worker.join().is_err() {
                log::error!("Engine: {} worker panicked", name);
                self.shutdown.request();
                if result.is_ok() {
                    result = Err(EngineError::WorkerPanicked(name.to_string()));
                }
            }
        }
        log::info!("Engine: All workers joined");
        result
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.shutdown.request();
        }
    }
}
