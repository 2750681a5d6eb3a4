pub mod analysis;
pub mod config;
pub mod decoding;
pub mod devices;
pub mod effects;
pub mod errors;
pub mod pcm;
pub mod playback;
pub mod scheduling;
pub mod types;
