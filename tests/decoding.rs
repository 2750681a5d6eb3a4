use std::io::Write;

use eqplayer_lib::audio::decoding::{SampleLoader, SymphoniaLoader, track_name};
use eqplayer_lib::audio::errors::AudioDecodingError;

fn write_wav(path: &std::path::Path, rate: u32, channels: u16, samples: &[i16]) {
    let data_len = (samples.len() * 2) as u32;
    let block_align = channels * 2;
    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&rate.to_le_bytes());
    bytes.extend_from_slice(&(rate * block_align as u32).to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(&bytes).unwrap();
}

#[test]
fn decodes_mono_pcm_wav() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("steps.wav");
    let samples: Vec<i16> = (0..4000).map(|n| ((n % 64) as i16 - 32) * 1000).collect();
    write_wav(&path, 22_050, 1, &samples);

    let pcm = SymphoniaLoader::new().load(&path).unwrap();
    assert_eq!(pcm.sample_rate(), 22_050);
    assert_eq!(pcm.channels(), 1);
    assert_eq!(pcm.bits(), 16);
    assert_eq!(pcm.samples(), samples.as_slice());
    assert_eq!(track_name(&path), "steps.wav");
}

#[test]
fn stereo_wav_keeps_its_channel_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.wav");
    write_wav(&path, 44_100, 2, &[100, -100, 200, -200, 300, -300]);

    let pcm = SymphoniaLoader::new().load(&path).unwrap();
    assert_eq!(pcm.channels(), 2);
    assert_eq!(pcm.samples().len(), 6);
}

#[test]
fn garbage_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noise.wav");
    std::fs::write(&path, b"definitely not audio").unwrap();

    let err = SymphoniaLoader::new().load(&path).unwrap_err();
    assert!(matches!(err, AudioDecodingError::FormatError { .. }));
}
