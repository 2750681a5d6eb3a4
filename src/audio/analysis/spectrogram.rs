use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex, num_traits::Zero};

use crate::audio::pcm::PcmSource;

// --- Blackman-Harris Coefficients ---
const BH_A0: f32 = 0.35875;
const BH_A1: f32 = 0.48829;
const BH_A2: f32 = 0.14128;
const BH_A3: f32 = 0.01168;

/// Range in dB a track with `bits` per sample can represent.
pub fn dynamic_range_db(bits: u16) -> f32 {
    (20.0 * (1.0 / 2f64.powi(bits as i32)).log10()).abs() as f32
}

/// Hz covered by one spectrum bin.
pub fn frequency_spacing(sample_rate: u32, window_size: usize) -> f32 {
    if window_size == 0 {
        return 0.0;
    }
    sample_rate as f32 / window_size as f32
}

fn blackman_harris(window_size: usize) -> Vec<f32> {
    let denom = (window_size.max(2) - 1) as f32;
    (0..window_size)
        .map(|n| {
            let x = std::f32::consts::PI * n as f32 / denom;
            BH_A0 - BH_A1 * (2.0 * x).cos() + BH_A2 * (4.0 * x).cos() - BH_A3 * (6.0 * x).cos()
        })
        .collect()
}

/// Windowed FFT magnitudes scaled into integer values in [0, 100].
///
/// The normalizer is the largest magnitude seen over the analyzer's whole
/// lifetime, so quiet passages after loud ones render dimmer instead of
/// being stretched back to full scale.
pub struct SpectrumAnalyzer {
    window_size: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    frame: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    running_max: f32,
    dynamic_range: f32,
}

impl SpectrumAnalyzer {
    pub fn new(window_size: usize, bits: u16) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(window_size);
        SpectrumAnalyzer {
            window_size,
            window: blackman_harris(window_size),
            fft,
            frame: vec![0.0; window_size],
            buffer: vec![Complex::zero(); window_size],
            running_max: 0.0,
            dynamic_range: dynamic_range_db(bits),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn spectrum_len(&self) -> usize {
        self.window_size / 2 + 1
    }

    pub fn dynamic_range(&self) -> f32 {
        self.dynamic_range
    }

    pub fn running_max(&self) -> f32 {
        self.running_max
    }

    /// First sample of the window analysed around `center`: a quarter window
    /// before it, never before the start of the track.
    pub fn window_start(&self, center: usize) -> usize {
        let lead = self.window_size / 4;
        center.max(lead) - lead
    }

    pub fn compute<S: PcmSource + ?Sized>(&mut self, source: &S, center: usize) -> Vec<f32> {
        let start = self.window_start(center);
        let copied = source.read_into(start, &mut self.frame);
        self.frame[copied..].fill(0.0);

        for ((slot, &sample), &w) in self.buffer.iter_mut().zip(&self.frame).zip(&self.window) {
            *slot = Complex {
                re: sample * w,
                im: 0.0,
            };
        }
        self.fft.process(&mut self.buffer);

        let bins = self.spectrum_len();
        let magnitudes: Vec<f32> = self.buffer[..bins].iter().map(|c| c.norm()).collect();
        if let Some(peak) = magnitudes
            .iter()
            .copied()
            .filter(|m| m.is_finite())
            .reduce(f32::max)
        {
            self.running_max = self.running_max.max(peak);
        }

        if self.running_max <= 0.0 || self.dynamic_range <= 0.0 {
            return vec![0.0; bins];
        }
        let dr = self.dynamic_range;
        let max = self.running_max;
        magnitudes
            .into_iter()
            .map(|m| {
                let db = 20.0 * (m / max).log10();
                let scaled = ((db + dr) / dr).max(0.0);
                if scaled.is_finite() {
                    (scaled * 100.0).trunc().min(100.0)
                } else {
                    0.0
                }
            })
            .collect()
    }
}
