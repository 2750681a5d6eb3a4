pub mod spectrogram;

pub use spectrogram::{SpectrumAnalyzer, dynamic_range_db, frequency_spacing};
