use crate::audio::config::{EQ_BANDS, EqualizerConfig};
use crate::audio::errors::EqualizerError;
use biquad::{Biquad as _, Coefficients, DirectForm1, ToHertz, Type};

/// Shape of a single EQ band. The set is closed and chosen when the band is
/// built; only its gain changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Peaking,
    LowShelf,
    HighShelf,
}

impl FilterKind {
    fn coefficients(
        self,
        sample_rate: f32,
        center_hz: f32,
        q: f64,
        gain_db: f32,
    ) -> Result<Coefficients<f64>, EqualizerError> {
        let gain = gain_db as f64;
        let filter_type = match self {
            FilterKind::Peaking => Type::PeakingEQ(gain),
            FilterKind::LowShelf => Type::LowShelf(gain),
            FilterKind::HighShelf => Type::HighShelf(gain),
        };
        Coefficients::<f64>::from_params(
            filter_type,
            (sample_rate as f64).hz(),
            (center_hz as f64).hz(),
            q,
        )
        .map_err(|e| EqualizerError::CoefficientCalculationError {
            filter_type: format!("{:?} @ {} Hz: {:?}", self, center_hz, e),
        })
    }
}

/// Q of a cookbook band given its bandwidth in octaves, so that
/// `alpha = sin(w0) * sinh(ln(2)/2 * bw * w0 / sin(w0))`.
fn q_from_bandwidth(sample_rate: f32, center_hz: f32, bandwidth_octaves: f32) -> f64 {
    let w0 = 2.0 * std::f64::consts::PI * center_hz as f64 / sample_rate as f64;
    let sinh_term = (std::f64::consts::LN_2 / 2.0 * bandwidth_octaves as f64 * w0 / w0.sin()).sinh();
    1.0 / (2.0 * sinh_term)
}

fn unity() -> Coefficients<f64> {
    Coefficients {
        a1: 0.0,
        a2: 0.0,
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
    }
}

/// One band of the equalizer: a biquad with its own input/output memory.
///
/// A band centred at or above Nyquist cannot be realised at the track's rate.
/// It is kept as a bypass: its gain is still tracked but it never touches the
/// signal.
#[derive(Debug, Clone)]
pub struct BandFilter {
    kind: FilterKind,
    center_hz: f32,
    sample_rate: f32,
    q: f64,
    gain_db: f32,
    bypassed: bool,
    coeffs: Coefficients<f64>,
    stage: DirectForm1<f64>,
}

impl BandFilter {
    pub fn new(
        kind: FilterKind,
        sample_rate: f32,
        center_hz: f32,
        bandwidth_octaves: f32,
    ) -> Result<Self, EqualizerError> {
        let bypassed = center_hz >= sample_rate / 2.0;
        let (q, coeffs) = if bypassed {
            (0.0, unity())
        } else {
            let q = q_from_bandwidth(sample_rate, center_hz, bandwidth_octaves);
            (q, kind.coefficients(sample_rate, center_hz, q, 0.0)?)
        };
        Ok(BandFilter {
            kind,
            center_hz,
            sample_rate,
            q,
            gain_db: 0.0,
            bypassed,
            coeffs,
            stage: DirectForm1::<f64>::new(coeffs),
        })
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn center_hz(&self) -> f32 {
        self.center_hz
    }

    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    pub fn coefficients(&self) -> &Coefficients<f64> {
        &self.coeffs
    }

    /// Changes the gain and recomputes the coefficients right away. The
    /// recursive memory is left untouched so the stream continues smoothly.
    pub fn set_gain(&mut self, gain_db: f32) -> Result<(), EqualizerError> {
        let previous = self.gain_db;
        self.gain_db = gain_db;
        if let Err(e) = self.recompute_coefficients() {
            self.gain_db = previous;
            return Err(e);
        }
        Ok(())
    }

    pub fn recompute_coefficients(&mut self) -> Result<(), EqualizerError> {
        if self.bypassed {
            return Ok(());
        }
        let coeffs = self
            .kind
            .coefficients(self.sample_rate, self.center_hz, self.q, self.gain_db)?;
        self.coeffs = coeffs;
        self.stage.update_coefficients(coeffs);
        Ok(())
    }

    #[inline]
    pub fn process_sample(&mut self, x: f64) -> f64 {
        self.stage.run(x)
    }

    pub fn process_block(&mut self, buf: &mut [f32]) {
        if self.bypassed {
            return;
        }
        for sample in buf.iter_mut() {
            *sample = self.process_sample(*sample as f64) as f32;
        }
    }
}

/// Fixed bank of filters applied in series, chunk by chunk. Every band is a
/// peaking filter unless `shelve_outer_bands` turns the first band into a
/// low shelf and the last into a high shelf.
#[derive(Debug, Clone)]
pub struct Equalizer {
    config: EqualizerConfig,
    bands: Vec<BandFilter>,
}

impl Default for Equalizer {
    fn default() -> Self {
        Equalizer::new(EqualizerConfig::default())
    }
}

impl Equalizer {
    /// Builds an equalizer that still needs `init` before it filters anything.
    pub fn new(config: EqualizerConfig) -> Self {
        Equalizer {
            config,
            bands: Vec::new(),
        }
    }

    /// (Re)builds every band for `sample_rate` with all gains at 0 dB.
    pub fn init(&mut self, sample_rate: f32) -> Result<(), EqualizerError> {
        if !(sample_rate > 0.0) {
            return Err(EqualizerError::InvalidSampleRate(sample_rate));
        }
        let bands = self
            .config
            .center_frequencies_hz
            .iter()
            .enumerate()
            .map(|(index, &center_hz)| {
                BandFilter::new(
                    self.band_kind(index),
                    sample_rate,
                    center_hz,
                    self.config.bandwidth_octaves,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        for (index, band) in bands.iter().enumerate().filter(|(_, b)| b.is_bypassed()) {
            log::warn!(
                "Equalizer: Band {} ({} Hz) is at or above Nyquist for {} Hz audio, bypassing it",
                index,
                band.center_hz(),
                sample_rate
            );
        }
        self.bands = bands;
        log::info!(
            "Equalizer: Initialized {} bands at {:?} Hz for {} Hz audio",
            self.bands.len(),
            self.config.center_frequencies_hz,
            sample_rate
        );
        Ok(())
    }

    fn band_kind(&self, index: usize) -> FilterKind {
        if !self.config.shelve_outer_bands {
            return FilterKind::Peaking;
        }
        match index {
            0 => FilterKind::LowShelf,
            i if i + 1 == EQ_BANDS => FilterKind::HighShelf,
            _ => FilterKind::Peaking,
        }
    }

    pub fn is_initialized(&self) -> bool {
        !self.bands.is_empty()
    }

    pub fn band_count(&self) -> usize {
        EQ_BANDS
    }

    pub fn max_gain_db(&self) -> f32 {
        self.config.max_gain_db
    }

    pub fn center_frequencies(&self) -> [f32; EQ_BANDS] {
        self.config.center_frequencies_hz
    }

    pub fn band(&self, index: usize) -> Option<&BandFilter> {
        self.bands.get(index)
    }

    pub fn gains(&self) -> [f32; EQ_BANDS] {
        let mut gains = [0.0; EQ_BANDS];
        for (slot, band) in gains.iter_mut().zip(&self.bands) {
            *slot = band.gain_db();
        }
        gains
    }

    /// Sets one band's gain, clamped to the configured range. Returns the gain
    /// actually applied.
    pub fn set_gain(&mut self, band: usize, gain_db: f32) -> Result<f32, EqualizerError> {
        if !self.is_initialized() {
            return Err(EqualizerError::NotInitialized);
        }
        let bands = self.bands.len();
        let max_gain = self.config.max_gain_db;
        let filter = self
            .bands
            .get_mut(band)
            .ok_or(EqualizerError::InvalidBand { index: band, bands })?;
        let clamped = gain_db.clamp(-max_gain, max_gain);
        filter.set_gain(clamped)?;
        log::debug!("Equalizer: Band {} gain set to {:.1} dB", band, clamped);
        Ok(clamped)
    }

    /// Runs every band over `buf` in place. Filter memory carries over from
    /// the previous call, so consecutive chunks form one continuous stream.
    pub fn equalize(&mut self, buf: &mut [f32]) -> Result<usize, EqualizerError> {
        if !self.is_initialized() {
            return Err(EqualizerError::NotInitialized);
        }
        for band in self.bands.iter_mut() {
            band.process_block(buf);
        }
        if let Some(bad) = buf.iter().find(|s| !s.is_finite()) {
            log::error!(
                "Equalizer: Produced non-finite value {} with gains {:?}",
                bad,
                self.gains()
            );
        }
        Ok(buf.len())
    }
}
