//! Uniformly-sampled, real-valued time series.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::sided::{fourier_to_onesided, psd_density_from_transform, psd_to_onesided};
use super::welch::{welch, WelchParams};
use super::{
    channel_labels, uniform_grid, FftEncoding, FftProcessor, PowerSpectralDensity,
    ProcessingError, Sample, Sidedness, SpectralRepresentation,
};

/// Time history with one column per channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSignal")]
pub struct Signal {
    time: Array1<f64>,
    response: Array2<f64>,
    label: Vec<String>,
}

/// Wire form of [`Signal`]; deserialized values go through [`Signal::new`].
#[derive(Deserialize)]
struct RawSignal {
    time: Array1<f64>,
    response: Array2<f64>,
    #[serde(default)]
    label: Vec<String>,
}

impl TryFrom<RawSignal> for Signal {
    type Error = ProcessingError;

    fn try_from(raw: RawSignal) -> Result<Self, Self::Error> {
        Self::new(raw.time, raw.response, raw.label)
    }
}

/// Relative tolerance on each time step against the first one.
const UNIFORM_STEP_TOLERANCE: f64 = 1e-6;

impl Signal {
    /// Build a signal from a `[ntimes × nchannels]` response.
    ///
    /// Complex element types are rejected.
    pub fn new<T: Sample>(
        time: Array1<f64>,
        response: Array2<T>,
        label: Vec<String>,
    ) -> Result<Self, ProcessingError> {
        if T::IS_COMPLEX {
            return Err(ProcessingError::ComplexValued { entity: "Signal" });
        }
        if response.nrows() != time.len() {
            return Err(ProcessingError::ShapeMismatch {
                what: "Signal",
                rows: response.nrows(),
                expected: time.len(),
            });
        }
        if time.len() < 2 {
            return Err(ProcessingError::InsufficientData {
                needed: 2,
                available: time.len(),
            });
        }
        let dt = time[1] - time[0];
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ProcessingError::InvalidParameter {
                name: "dt",
                value: dt,
                reason: "time must be strictly increasing",
            });
        }
        if let Some(step) = time
            .windows(2)
            .into_iter()
            .map(|w| w[1] - w[0])
            .find(|step| !step.is_finite() || (step - dt).abs() > dt * UNIFORM_STEP_TOLERANCE)
        {
            return Err(ProcessingError::InvalidParameter {
                name: "dt",
                value: step,
                reason: "time must be uniformly sampled",
            });
        }
        let channels = response.ncols();
        Ok(Self {
            time,
            response: response.mapv(|v| v.real_part()),
            label: channel_labels(label, channels),
        })
    }

    /// Single-channel convenience constructor.
    pub fn from_samples(
        time: Array1<f64>,
        samples: Array1<f64>,
        label: impl Into<String>,
    ) -> Result<Self, ProcessingError> {
        Self::new(time, samples.insert_axis(Axis(1)), vec![label.into()])
    }

    pub const fn time(&self) -> &Array1<f64> {
        &self.time
    }

    pub const fn response(&self) -> &Array2<f64> {
        &self.response
    }

    pub fn label(&self) -> &[String] {
        &self.label
    }

    pub fn with_label(mut self, label: Vec<String>) -> Self {
        let channels = self.response.ncols();
        self.label = channel_labels(label, channels);
        self
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn channels(&self) -> usize {
        self.response.ncols()
    }

    /// Sample spacing `time[1] - time[0]`.
    pub fn dt(&self) -> f64 {
        self.time[1] - self.time[0]
    }

    /// Last sample time.
    pub fn tmax(&self) -> f64 {
        self.time[self.time.len() - 1]
    }

    pub fn sampling_rate(&self) -> f64 {
        1.0 / self.dt()
    }

    /// Frequency step of the record's DFT grid, `1/(n·dt)`.
    pub fn df(&self) -> f64 {
        1.0 / (self.len() as f64 * self.dt())
    }

    /// RMS of each channel.
    pub fn rms(&self) -> Array1<f64> {
        self.response.map_axis(Axis(0), |col| {
            (col.iter().map(|x| x * x).sum::<f64>() / col.len() as f64).sqrt()
        })
    }

    /// Forward transform of every channel, normalized by the sample count.
    ///
    /// With `sided = One` the array is truncated to `n/2 + 1` bins so the
    /// tag always describes the data.
    pub fn to_fourier(
        &self,
        sided: Sidedness,
        encoding: FftEncoding,
    ) -> Result<SpectralRepresentation, ProcessingError> {
        let n = self.len();
        let frequency = uniform_grid(n, self.df());
        let mut transform = Array2::<Complex64>::zeros((n, self.channels()));
        for (ich, column) in self.response.axis_iter(Axis(1)).enumerate() {
            let spectrum = self.normalized_transform(column)?;
            transform.column_mut(ich).assign(&spectrum);
        }
        if encoding == FftEncoding::MagPhase {
            transform.mapv_inplace(|z| Complex64::new(z.norm(), z.im.atan2(z.re)));
        }

        // a two-sided n-point grid has a Nyquist bin exactly when n is even
        let is_onesided_center = n % 2 == 0;
        let (frequency, transform, is_onesided_center) = match sided {
            Sidedness::Two => (frequency, transform, is_onesided_center),
            Sidedness::One => fourier_to_onesided(frequency.view(), &transform),
        };
        tracing::debug!(
            n,
            channels = self.channels(),
            sided = %sided,
            is_onesided_center,
            "Signal -> Fourier"
        );
        SpectralRepresentation::new(
            frequency,
            transform,
            self.label.clone(),
            encoding,
            sided,
            Some(is_onesided_center),
        )
    }

    /// Density of the normalized transform, without going through a
    /// [`SpectralRepresentation`].
    pub fn to_psd(&self, sided: Sidedness) -> Result<PowerSpectralDensity, ProcessingError> {
        let column = self.single_channel("Signal::to_psd")?;
        let n = self.len();
        let frequency = uniform_grid(n, self.df());
        let spectrum = self.normalized_transform(column)?;
        let density = psd_density_from_transform(frequency.view(), spectrum.view())?;
        let is_onesided_center = n % 2 == 0;

        let (frequency, density, is_onesided_center) = match sided {
            Sidedness::Two => (frequency, density, is_onesided_center),
            Sidedness::One => psd_to_onesided(frequency.view(), density.view())?,
        };
        tracing::debug!(n, sided = %sided, is_onesided_center, "Signal -> PSD");
        PowerSpectralDensity::from_values(
            frequency,
            density,
            self.label.clone(),
            sided,
            Some(is_onesided_center),
            0,
        )
    }

    /// Welch-averaged PSD.
    ///
    /// Segment and overlap lengths are `round(fs·seconds)`.
    pub fn to_psd_welch(
        &self,
        sided: Sidedness,
        params: &WelchParams,
    ) -> Result<PowerSpectralDensity, ProcessingError> {
        let column = self.single_channel("Signal::to_psd_welch")?;
        let fs = self.sampling_rate();
        let options = params.to_options(fs, sided)?;
        let samples = column.to_vec();
        let (frequency, density) = welch(&samples, fs, &options)?;

        let is_onesided_center = match sided {
            Sidedness::One => {
                let fmax = frequency.last().copied().unwrap_or(0.0);
                let df = if frequency.len() > 1 {
                    frequency[1] - frequency[0]
                } else {
                    fs
                };
                (fmax - fs / 2.0).abs() < df * 1e-6
            }
            Sidedness::Two => frequency.len() % 2 == 0,
        };
        tracing::debug!(
            nperseg = options.nperseg,
            noverlap = options.noverlap,
            nfreq = frequency.len(),
            is_onesided_center,
            "Signal -> Welch PSD"
        );
        PowerSpectralDensity::from_values(
            Array1::from(frequency),
            Array1::from(density),
            self.label.clone(),
            sided,
            Some(is_onesided_center),
            0,
        )
    }

    fn normalized_transform(
        &self,
        column: ArrayView1<'_, f64>,
    ) -> Result<Array1<Complex64>, ProcessingError> {
        let n = column.len();
        let processor = FftProcessor::new(n, self.sampling_rate())?;
        let samples = column.to_vec();
        let scale = 1.0 / n as f64;
        Ok(Array1::from_iter(
            processor.forward_real(&samples).into_iter().map(|z| z * scale),
        ))
    }

    fn single_channel(&self, entity: &'static str) -> Result<ArrayView1<'_, f64>, ProcessingError> {
        if self.channels() != 1 {
            return Err(ProcessingError::MultiChannel {
                entity,
                columns: self.channels(),
            });
        }
        Ok(self.response.column(0))
    }
}
