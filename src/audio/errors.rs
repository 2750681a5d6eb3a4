use symphonia::core::errors::Error as SymphoniaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioDecodingError {
    #[error("Failed to open file '{path}': {source}")]
    FileOpenError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Symphonia probe/format error for '{path}': {source}")]
    FormatError {
        path: String,
        #[source]
        source: SymphoniaError,
    },
    #[error("No suitable audio track in '{path}'")]
    NoSuitableTrack { path: String },
    #[error("Sample rate missing in '{path}'")]
    MissingSampleRate { path: String },
    #[error("Channel info missing in '{path}'")]
    MissingChannelInfo { path: String },
    #[error("Failed to create decoder for '{path}': {source}")]
    DecoderCreationError {
        path: String,
        #[source]
        source: SymphoniaError,
    },
    #[error("Symphonia fatal decode error in '{path}': {source}")]
    FatalDecodeError {
        path: String,
        #[source]
        source: SymphoniaError,
    },
    #[error("Symphonia I/O error reading packet for '{path}': {source}")]
    PacketReadIoError {
        path: String,
        #[source]
        source: SymphoniaError,
    },
    #[error("No samples decoded from '{path}'")]
    NoSamplesDecoded { path: String },
}

/// Fatal problems with the track handed to the player.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Unsupported bit depth {bits} (max {max})")]
    UnsupportedBitDepth { bits: u16, max: u16 },
    #[error("Too many channels: {channels} (max {max})")]
    TooManyChannels { channels: u16, max: u16 },
    #[error("Sample rate {rate} Hz is above the supported maximum of {max} Hz")]
    SampleRateTooHigh { rate: u32, max: u32 },
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),
    #[error("Track '{name}' contains no samples")]
    EmptyTrack { name: String },
    #[error("Decoding failed: {0}")]
    Decoding(#[from] AudioDecodingError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EqualizerError {
    #[error("Invalid sample rate for equalizer: {0}")]
    InvalidSampleRate(f32),
    #[error("Band index {index} out of range (equalizer has {bands} bands)")]
    InvalidBand { index: usize, bands: usize },
    #[error("Equalizer used before init")]
    NotInitialized,
    #[error("Failed to calculate {filter_type} coefficients")]
    CoefficientCalculationError { filter_type: String },
}

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("No voice available: {0}")]
    VoiceAllocation(String),
    #[error("No default output device available")]
    NoDefaultOutputDevice,
    #[error("Output device configuration error: {0}")]
    OutputConfig(String),
    #[error("Output stream error: {0}")]
    Stream(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Rejected operator input line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseCommandError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),
    #[error("Command '{command}' needs a numeric argument")]
    MissingArgument { command: &'static str },
    #[error("'{0}' is not a number")]
    InvalidNumber(String),
    #[error("'{0}' is not a band index")]
    InvalidBand(String),
}

/// Top-level error for everything that aborts a session.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Track load failed: {0}")]
    Load(#[from] LoadError),
    #[error("Equalizer setup failed: {0}")]
    Equalizer(#[from] EqualizerError),
    #[error("Audio device error: {0}")]
    Device(#[from] DeviceError),
    #[error("Failed to spawn {name} worker: {source}")]
    WorkerSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} worker panicked")]
    WorkerPanicked(String),
}
