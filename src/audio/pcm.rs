use std::sync::Arc;
use std::sync::atomic::{AtomicI16, Ordering};

/// Read access to a mono PCM track as raw (unnormalized) float amplitudes.
pub trait PcmSource {
    fn len(&self) -> usize;

    /// Copies up to `dst.len()` samples starting at `offset`, returns how many
    /// were copied. Nothing is written past the end of the track.
    fn read_into(&self, offset: usize, dst: &mut [f32]) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An in-memory mono track. 8-bit tracks keep their values in [-128, 127].
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    samples: Vec<i16>,
    bits: u16,
    channels: u16,
    sample_rate: u32,
}

impl PcmBuffer {
    pub fn new(samples: Vec<i16>, bits: u16, channels: u16, sample_rate: u32) -> Self {
        PcmBuffer {
            samples,
            bits,
            channels,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Copy of this track that can be rewritten while a voice plays it.
    pub fn to_shared(&self) -> SharedPcm {
        SharedPcm::from_samples(&self.samples, self.bits)
    }
}

impl PcmSource for PcmBuffer {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn read_into(&self, offset: usize, dst: &mut [f32]) -> usize {
        let Some(available) = self.samples.get(offset..) else {
            return 0;
        };
        let count = available.len().min(dst.len());
        for (out, &sample) in dst.iter_mut().zip(&available[..count]) {
            *out = sample as f32;
        }
        count
    }
}

struct SharedPcmInner {
    samples: Box<[AtomicI16]>,
    bits: u16,
}

/// The filtered track. The player worker writes equalized chunks into it
/// while the output voice reads it from the audio callback, so every sample
/// is an independent atomic.
#[derive(Clone)]
pub struct SharedPcm {
    inner: Arc<SharedPcmInner>,
}

impl SharedPcm {
    pub fn from_samples(samples: &[i16], bits: u16) -> Self {
        let samples = samples.iter().map(|&s| AtomicI16::new(s)).collect();
        SharedPcm {
            inner: Arc::new(SharedPcmInner { samples, bits }),
        }
    }

    pub fn bits(&self) -> u16 {
        self.inner.bits
    }

    pub fn get(&self, index: usize) -> Option<i16> {
        self.inner
            .samples
            .get(index)
            .map(|s| s.load(Ordering::Relaxed))
    }

    /// Rounds `src` to the track's bit depth (saturating) and stores it from
    /// `offset` on. Returns how many samples were stored.
    pub fn write_from(&self, offset: usize, src: &[f32]) -> usize {
        let Some(target) = self.inner.samples.get(offset..) else {
            return 0;
        };
        let (lo, hi) = sample_range(self.inner.bits);
        let count = target.len().min(src.len());
        for (slot, &value) in target[..count].iter().zip(src) {
            slot.store(value.round().clamp(lo, hi) as i16, Ordering::Relaxed);
        }
        count
    }

    pub fn to_vec(&self) -> Vec<i16> {
        self.inner
            .samples
            .iter()
            .map(|s| s.load(Ordering::Relaxed))
            .collect()
    }
}

impl PcmSource for SharedPcm {
    fn len(&self) -> usize {
        self.inner.samples.len()
    }

    fn read_into(&self, offset: usize, dst: &mut [f32]) -> usize {
        let Some(available) = self.inner.samples.get(offset..) else {
            return 0;
        };
        let count = available.len().min(dst.len());
        for (out, sample) in dst.iter_mut().zip(&available[..count]) {
            *out = sample.load(Ordering::Relaxed) as f32;
        }
        count
    }
}

impl std::fmt::Debug for SharedPcm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedPcm")
            .field("len", &self.inner.samples.len())
            .field("bits", &self.inner.bits)
            .finish()
    }
}

fn sample_range(bits: u16) -> (f32, f32) {
    if bits <= 8 {
        (i8::MIN as f32, i8::MAX as f32)
    } else {
        (i16::MIN as f32, i16::MAX as f32)
    }
}
