use std::collections::VecDeque;
use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, TryRecvError};

use crate::audio::config::EQ_BANDS;
use crate::audio::errors::EngineError;
use crate::audio::types::{ControlCommand, PlayerState, PlayerStateKind};
use crate::engine::{InputPoll, InputSource, StateRenderer};

fn to_poll(line: &str) -> InputPoll {
    match line.parse::<ControlCommand>() {
        Ok(ControlCommand::Dispatch(event)) => InputPoll::Event(event),
        Ok(ControlCommand::Quit) => InputPoll::Quit,
        Err(e) => {
            log::warn!("Console: {} (try play, pause, stop, rw, ff, vol N, seek S, eq B dB, quit)", e);
            InputPoll::Idle
        }
    }
}

// --- Stdin Input ---

/// Operator commands typed on stdin, one per line.
///
/// A helper thread does the blocking reads so `poll` never blocks the input
/// worker.
pub struct StdinInput {
    lines: Receiver<String>,
}

impl StdinInput {
    pub fn spawn() -> Result<Self, EngineError> {
        let (tx, rx) = mpsc::channel();
        std::thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| EngineError::WorkerSpawn {
                name: "stdin-reader".to_string(),
                source: e,
            })?;
        Ok(StdinInput { lines: rx })
    }
}

impl InputSource for StdinInput {
    fn poll(&mut self) -> InputPoll {
        loop {
            match self.lines.try_recv() {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => return to_poll(&line),
                Err(TryRecvError::Empty) => return InputPoll::Idle,
                Err(TryRecvError::Disconnected) => return InputPoll::Closed,
            }
        }
    }
}

// --- Scripted Input ---

/// Replays a fixed list of command lines, one per poll, then reports the
/// source as closed. Blank lines are idle polls.
pub struct ScriptedInput {
    lines: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedInput {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> InputPoll {
        match self.lines.pop_front() {
            Some(line) if line.trim().is_empty() => InputPoll::Idle,
            Some(line) => to_poll(&line),
            None => InputPoll::Closed,
        }
    }
}

// --- Log Renderer ---

fn format_clock(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor();
    format!("{:02}:{:04.1}", minutes as u64, seconds - minutes * 60.0)
}

/// Frequency of the loudest filtered bin, if anything is audible.
fn peak_frequency(state: &PlayerState) -> Option<f32> {
    let (bin, &level) = state
        .filt_spect
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))?;
    (level > 0.0).then(|| bin as f32 * state.freq_spacing)
}

/// One-line text rendering of a snapshot.
pub fn format_status(state: &PlayerState) -> String {
    let gains = state
        .eq_gain
        .iter()
        .map(|g| format!("{:+.1}", g))
        .collect::<Vec<_>>()
        .join("/");
    let peak = peak_frequency(state)
        .map(|hz| format!("{:.0} Hz", hz))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "[{}] {} {} / {} | vol {} | eq {} dB | amp {} | peak {} | misses {}",
        state.state,
        state.track_name,
        format_clock(state.time),
        format_clock(state.duration),
        state.volume,
        gains,
        state.time_data,
        peak,
        state.deadline_misses
    )
}

#[derive(Debug, Clone, PartialEq)]
struct StatusKey {
    state: PlayerStateKind,
    second: u64,
    volume: u32,
    gains: [i32; EQ_BANDS],
}

impl StatusKey {
    fn of(state: &PlayerState) -> Self {
        let mut gains = [0; EQ_BANDS];
        for (slot, g) in gains.iter_mut().zip(state.eq_gain.iter()) {
            *slot = (g * 10.0).round() as i32;
        }
        StatusKey {
            state: state.state,
            second: state.time.max(0.0) as u64,
            volume: state.volume,
            gains,
        }
    }
}

/// Logs a status line whenever the state, the elapsed second, the volume or
/// a gain changes.
#[derive(Default)]
pub struct LogRenderer {
    last: Option<StatusKey>,
}

impl LogRenderer {
    pub fn new() -> Self {
        LogRenderer::default()
    }
}

impl StateRenderer for LogRenderer {
    fn render(&mut self, state: &PlayerState) {
        let key = StatusKey::of(state);
        if self.last.as_ref() == Some(&key) {
            return;
        }
        log::info!("{}", format_status(state));
        self.last = Some(key);
    }
}
