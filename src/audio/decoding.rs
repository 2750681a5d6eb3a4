use std::fs::File;
use std::path::Path;

use symphonia::core::{
    audio::SampleBuffer,
    codecs::{CODEC_TYPE_NULL, DecoderOptions},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

use super::errors::AudioDecodingError;
use super::pcm::PcmBuffer;

/// Bit depth assumed for codecs that do not report one (lossy formats).
const DEFAULT_BITS_PER_SAMPLE: u16 = 16;

/// Turns a file on disk into an in-memory PCM track.
pub trait SampleLoader {
    fn load(&self, path: &Path) -> Result<PcmBuffer, AudioDecodingError>;
}

/// Decodes anything symphonia can probe. Samples stay interleaved and keep the
/// source's channel count and bit depth so the player can reject formats it
/// does not handle.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaLoader;

impl SymphoniaLoader {
    pub fn new() -> Self {
        SymphoniaLoader
    }
}

impl SampleLoader for SymphoniaLoader {
    fn load(&self, path: &Path) -> Result<PcmBuffer, AudioDecodingError> {
        decode_file(path)
    }
}

/// File name without its directories, used as the track title.
pub fn track_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn decode_file(path: &Path) -> Result<PcmBuffer, AudioDecodingError> {
    let path_str = path.display().to_string();
    let file = File::open(path).map_err(|e| AudioDecodingError::FileOpenError {
        path: path_str.clone(),
        source: e,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioDecodingError::FormatError {
            path: path_str.clone(),
            source: e,
        })?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
        .ok_or_else(|| AudioDecodingError::NoSuitableTrack {
            path: path_str.clone(),
        })?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AudioDecodingError::MissingSampleRate {
            path: path_str.clone(),
        })?;
    let channels = track
        .codec_params
        .channels
        .ok_or_else(|| AudioDecodingError::MissingChannelInfo {
            path: path_str.clone(),
        })?
        .count() as u16;
    let bits = track
        .codec_params
        .bits_per_sample
        .map(|b| b as u16)
        .unwrap_or(DEFAULT_BITS_PER_SAMPLE);
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AudioDecodingError::DecoderCreationError {
            path: path_str.clone(),
            source: e,
        })?;

    let mut samples: Vec<i16> = Vec::with_capacity(1024 * 256);
    let mut sample_buf: Option<SampleBuffer<i16>> = None;

    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() != track_id {
                    continue;
                }
                match decoder.decode(&packet) {
                    Ok(audio_buf) => {
                        let buf = sample_buf.get_or_insert_with(|| {
                            SampleBuffer::<i16>::new(audio_buf.capacity() as u64, *audio_buf.spec())
                        });
                        buf.copy_interleaved_ref(audio_buf);
                        samples.extend_from_slice(buf.samples());
                    }
                    Err(SymphoniaError::DecodeError(err_desc)) => {
                        log::warn!("Decoder: Ignoring decode error in '{}': {}", path_str, err_desc);
                    }
                    Err(e) => {
                        return Err(AudioDecodingError::FatalDecodeError {
                            path: path_str,
                            source: e,
                        });
                    }
                }
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                log::debug!("Decoder: Reached EOF for '{}'", path_str);
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                log::warn!("Decoder: Reset required unexpectedly for '{}'", path_str);
                break;
            }
            Err(e) => {
                return Err(AudioDecodingError::PacketReadIoError {
                    path: path_str,
                    source: e,
                });
            }
        }
    }

    decoder.finalize();
    if samples.is_empty() {
        return Err(AudioDecodingError::NoSamplesDecoded { path: path_str });
    }

    // Symphonia scales everything to full 16-bit range, 8-bit tracks are
    // brought back to their native [-128, 127].
    if bits <= 8 {
        for s in samples.iter_mut() {
            *s >>= 8;
        }
    }

    log::info!(
        "Decoder: Decoded {} samples ({} ch, {} bit, {} Hz) from '{}'",
        samples.len(),
        channels,
        bits,
        sample_rate,
        path_str
    );
    Ok(PcmBuffer::new(samples, bits, channels, sample_rate))
}
