use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::audio::config::EQ_BANDS;
use crate::audio::errors::ParseCommandError;

// --- Control Events ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Signal {
    Stop,
    Play,
    Pause,
    Rewind,
    Forward,
    Volume,
    Seek,
    /// Gain change for the band with this index.
    BandGain(usize),
}

/// A control event with its float payload. Payload is ignored by the
/// transport signals.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEvent {
    pub signal: Signal,
    pub value: f32,
}

impl PlayerEvent {
    pub fn new(signal: Signal, value: f32) -> Self {
        PlayerEvent { signal, value }
    }

    pub fn stop() -> Self {
        PlayerEvent::new(Signal::Stop, 0.0)
    }

    pub fn play() -> Self {
        PlayerEvent::new(Signal::Play, 0.0)
    }

    pub fn pause() -> Self {
        PlayerEvent::new(Signal::Pause, 0.0)
    }

    pub fn rewind() -> Self {
        PlayerEvent::new(Signal::Rewind, 0.0)
    }

    pub fn forward() -> Self {
        PlayerEvent::new(Signal::Forward, 0.0)
    }

    pub fn volume(volume: f32) -> Self {
        PlayerEvent::new(Signal::Volume, volume)
    }

    pub fn seek(seconds: f32) -> Self {
        PlayerEvent::new(Signal::Seek, seconds)
    }

    pub fn band_gain(band: usize, gain_db: f32) -> Self {
        PlayerEvent::new(Signal::BandGain(band), gain_db)
    }
}

/// One line typed by the operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    Dispatch(PlayerEvent),
    Quit,
}

impl FromStr for ControlCommand {
    type Err = ParseCommandError;

    /// Accepts `play`, `pause`, `stop`, `rw`, `ff`, `vol <0-100>`,
    /// `seek <seconds>`, `eq <band> <dB>` and `quit`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            return Err(ParseCommandError::Empty);
        };
        let keyword = keyword.to_ascii_lowercase();

        let mut number = |what: &'static str| -> Result<f32, ParseCommandError> {
            let raw = words
                .next()
                .ok_or(ParseCommandError::MissingArgument { command: what })?;
            raw.parse::<f32>()
                .map_err(|_| ParseCommandError::InvalidNumber(raw.to_string()))
        };

        let event = match keyword.as_str() {
            "play" | "p" => PlayerEvent::play(),
            "pause" => PlayerEvent::pause(),
            "stop" | "s" => PlayerEvent::stop(),
            "rw" | "rewind" => PlayerEvent::rewind(),
            "ff" | "forward" => PlayerEvent::forward(),
            "vol" | "volume" => PlayerEvent::volume(number("vol")?),
            "seek" => PlayerEvent::seek(number("seek")?),
            "eq" => {
                let band = number("eq")?;
                let gain = number("eq")?;
                if band < 0.0 || band.fract() != 0.0 {
                    return Err(ParseCommandError::InvalidBand(band.to_string()));
                }
                PlayerEvent::band_gain(band as usize, gain)
            }
            "quit" | "q" | "exit" => return Ok(ControlCommand::Quit),
            _ => return Err(ParseCommandError::UnknownCommand(keyword.to_string())),
        };
        Ok(ControlCommand::Dispatch(event))
    }
}

// --- State Definitions ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PlayerStateKind {
    #[default]
    Stop,
    Play,
    Pause,
    Rewind,
    Forward,
}

impl PlayerStateKind {
    /// Whether the voice is expected to be advancing in this state.
    pub fn is_running(self) -> bool {
        !matches!(self, PlayerStateKind::Stop | PlayerStateKind::Pause)
    }
}

impl fmt::Display for PlayerStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlayerStateKind::Stop => "STOP",
            PlayerStateKind::Play => "PLAY",
            PlayerStateKind::Pause => "PAUSE",
            PlayerStateKind::Rewind => "REWIND",
            PlayerStateKind::Forward => "FORWARD",
        };
        f.write_str(label)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PlayDirection {
    #[default]
    Forward,
    Backward,
}

/// Everything a renderer needs, computed in one player period and published
/// as a whole.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub state: PlayerStateKind,
    pub track_name: String,
    pub time: f64,
    pub duration: f64,
    /// Filtered amplitude at the playback cursor.
    pub time_data: i16,
    pub bits: u16,
    pub orig_spect: Vec<f32>,
    pub filt_spect: Vec<f32>,
    pub dynamic_range: f32,
    pub freq_spacing: f32,
    pub volume: u32,
    pub eq_gain: [f32; EQ_BANDS],
    pub deadline_misses: u64,
}

impl Default for PlayerState {
    fn default() -> Self {
        PlayerState {
            state: PlayerStateKind::Stop,
            track_name: String::new(),
            time: 0.0,
            duration: 0.0,
            time_data: 0,
            bits: 0,
            orig_spect: Vec::new(),
            filt_spect: Vec::new(),
            dynamic_range: 0.0,
            freq_spacing: 0.0,
            volume: 0,
            eq_gain: [0.0; EQ_BANDS],
            deadline_misses: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<ControlCommand, ParseCommandError> {
        line.parse()
    }

    #[test]
    fn parses_transport_and_valued_commands() {
        assert_eq!(parse("play"), Ok(ControlCommand::Dispatch(PlayerEvent::play())));
        assert_eq!(parse("  FF "), Ok(ControlCommand::Dispatch(PlayerEvent::forward())));
        assert_eq!(
            parse("vol 40"),
            Ok(ControlCommand::Dispatch(PlayerEvent::volume(40.0)))
        );
        assert_eq!(
            parse("seek 2.5"),
            Ok(ControlCommand::Dispatch(PlayerEvent::seek(2.5)))
        );
        assert_eq!(
            parse("eq 3 -6"),
            Ok(ControlCommand::Dispatch(PlayerEvent::band_gain(3, -6.0)))
        );
        assert_eq!(parse("quit"), Ok(ControlCommand::Quit));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert_eq!(parse(""), Err(ParseCommandError::Empty));
        assert_eq!(
            parse("vol"),
            Err(ParseCommandError::MissingArgument { command: "vol" })
        );
        assert_eq!(
            parse("seek soon"),
            Err(ParseCommandError::InvalidNumber("soon".to_string()))
        );
        assert!(matches!(parse("eq -1 3"), Err(ParseCommandError::InvalidBand(_))));
        assert!(matches!(parse("eq 1.5 3"), Err(ParseCommandError::InvalidBand(_))));
        assert!(matches!(parse("dance"), Err(ParseCommandError::UnknownCommand(_))));
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let json = serde_json::to_value(PlayerState::default()).unwrap();
        assert_eq!(json["state"], "stop");
        assert!(json.get("origSpect").is_some());
        assert!(json.get("deadlineMisses").is_some());
    }
}
