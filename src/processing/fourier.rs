//! Complex frequency-domain samples (the Fourier transform container).

use ndarray::{Array1, Array2, Axis};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::sided::{
    fold_density_onesided, fourier_to_onesided, grid_step, psd_density_from_transform,
    psd_to_onesided, psd_to_twosided, sampling_rate,
};
use super::{
    channel_labels, uniform_grid, FftEncoding, FftProcessor, PowerSpectralDensity,
    ProcessingError, Sidedness, Signal,
};

/// Fourier transform of a record, normalized by its sample count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSpectralRepresentation")]
pub struct SpectralRepresentation {
    frequency: Array1<f64>,
    response: Array2<Complex64>,
    label: Vec<String>,
    encoding: FftEncoding,
    sided: Sidedness,
    is_onesided_center: bool,
}

#[derive(Deserialize)]
struct RawSpectralRepresentation {
    frequency: Array1<f64>,
    response: Array2<Complex64>,
    #[serde(default)]
    label: Vec<String>,
    encoding: FftEncoding,
    sided: Sidedness,
    is_onesided_center: Option<bool>,
}

impl TryFrom<RawSpectralRepresentation> for SpectralRepresentation {
    type Error = ProcessingError;

    fn try_from(raw: RawSpectralRepresentation) -> Result<Self, Self::Error> {
        Self::new(
            raw.frequency,
            raw.response,
            raw.label,
            raw.encoding,
            raw.sided,
            raw.is_onesided_center,
        )
    }
}

impl SpectralRepresentation {
    /// `is_onesided_center` has no default: `None` is rejected.
    pub fn new(
        frequency: Array1<f64>,
        response: Array2<Complex64>,
        label: Vec<String>,
        encoding: FftEncoding,
        sided: Sidedness,
        is_onesided_center: Option<bool>,
    ) -> Result<Self, ProcessingError> {
        let is_onesided_center = is_onesided_center.ok_or(ProcessingError::MissingCenterParity {
            entity: "SpectralRepresentation",
        })?;
        if response.nrows() != frequency.len() {
            return Err(ProcessingError::ShapeMismatch {
                what: "SpectralRepresentation",
                rows: response.nrows(),
                expected: frequency.len(),
            });
        }
        let channels = response.ncols();
        Ok(Self {
            frequency,
            response,
            label: channel_labels(label, channels),
            encoding,
            sided,
            is_onesided_center,
        })
    }

    /// Single-channel convenience constructor.
    pub fn from_values(
        frequency: Array1<f64>,
        values: Array1<Complex64>,
        label: Vec<String>,
        encoding: FftEncoding,
        sided: Sidedness,
        is_onesided_center: Option<bool>,
    ) -> Result<Self, ProcessingError> {
        Self::new(
            frequency,
            values.insert_axis(Axis(1)),
            label,
            encoding,
            sided,
            is_onesided_center,
        )
    }

    pub const fn frequency(&self) -> &Array1<f64> {
        &self.frequency
    }

    /// Stored values, in this representation's encoding.
    pub const fn response(&self) -> &Array2<Complex64> {
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

    pub const fn encoding(&self) -> FftEncoding {
        self.encoding
    }

    pub const fn sided(&self) -> Sidedness {
        self.sided
    }

    pub const fn is_onesided_center(&self) -> bool {
        self.is_onesided_center
    }

    pub fn df(&self) -> Result<f64, ProcessingError> {
        grid_step(self.frequency.view())
    }

    pub fn fsampling(&self) -> Result<f64, ProcessingError> {
        let df = self.df()?;
        let fmax = self.frequency[self.frequency.len() - 1];
        Ok(sampling_rate(fmax, df, self.sided, self.is_onesided_center))
    }

    /// Exact inverse transform back to a time series.
    ///
    /// Only a full two-sided spectrum carries enough information.
    pub fn to_time(&self) -> Result<Signal, ProcessingError> {
        if self.sided != Sidedness::Two {
            return Err(ProcessingError::RequiresTwoSided { operation: "to_time" });
        }
        let df = self.df()?;
        let fs = self.fsampling()?;
        let ntimes = bin_count(fs / df);
        if ntimes != self.frequency.len() {
            return Err(ProcessingError::ShapeMismatch {
                what: "SpectralRepresentation::to_time",
                rows: self.frequency.len(),
                expected: ntimes,
            });
        }

        let processor = FftProcessor::new(ntimes, fs)?;
        let real_imag = self.real_imag();
        let mut response = Array2::<f64>::zeros((ntimes, real_imag.ncols()));
        for (ich, column) in real_imag.axis_iter(Axis(1)).enumerate() {
            // undo the 1/n applied by the forward transform
            let scaled: Vec<Complex64> = column.iter().map(|z| z * ntimes as f64).collect();
            let inverse = processor.inverse(&scaled)?;
            for (dst, z) in response.column_mut(ich).iter_mut().zip(inverse) {
                *dst = z.re;
            }
        }
        tracing::debug!(ntimes, fs, df, "Fourier -> time");
        Signal::new(uniform_grid(ntimes, 1.0 / fs), response, self.label.clone())
    }

    /// Spectral density of the decoded transform.
    ///
    /// A one-sided representation is folded with the doubling rule, so the
    /// result is a proper one-sided density; it is then converted to the
    /// requested sidedness.
    pub fn to_psd(&self, sided: Sidedness) -> Result<PowerSpectralDensity, ProcessingError> {
        if self.response.ncols() != 1 {
            return Err(ProcessingError::MultiChannel {
                entity: "SpectralRepresentation::to_psd",
                columns: self.response.ncols(),
            });
        }
        let values = self.real_imag().column(0).to_owned();
        let density = psd_density_from_transform(self.frequency.view(), values.view())?;
        let df = self.df()?;

        let (frequency, density, is_onesided_center) = match (self.sided, sided) {
            (Sidedness::Two, Sidedness::Two) => {
                (self.frequency.clone(), density, self.is_onesided_center)
            }
            (Sidedness::Two, Sidedness::One) => {
                psd_to_onesided(self.frequency.view(), density.view())?
            }
            (Sidedness::One, Sidedness::One) => (
                self.frequency.clone(),
                fold_density_onesided(density.view(), self.is_onesided_center),
                self.is_onesided_center,
            ),
            (Sidedness::One, Sidedness::Two) => {
                let folded = fold_density_onesided(density.view(), self.is_onesided_center);
                let (frequency, density) = psd_to_twosided(
                    self.frequency.view(),
                    folded.view(),
                    self.is_onesided_center,
                    df,
                )?;
                (frequency, density, self.is_onesided_center)
            }
        };
        tracing::debug!(from = %self.sided, to = %sided, is_onesided_center, "Fourier -> PSD");
        PowerSpectralDensity::from_values(
            frequency,
            density,
            self.label.clone(),
            sided,
            Some(is_onesided_center),
            0,
        )
    }

    /// Truncate to the non-negative half; no amplitude rescaling.
    pub fn to_onesided(&self) -> Self {
        if self.sided == Sidedness::One {
            return self.clone();
        }
        let (frequency, response, is_onesided_center) =
            fourier_to_onesided(self.frequency.view(), &self.response);
        Self {
            frequency,
            response,
            label: self.label.clone(),
            encoding: self.encoding,
            sided: Sidedness::One,
            is_onesided_center,
        }
    }

    /// `(magnitude, phase)` per bin and channel; phase in radians unless
    /// `in_degrees`.
    pub fn magnitude_phase(&self, in_degrees: bool) -> (Array2<f64>, Array2<f64>) {
        let (mag, phase) = match self.encoding {
            // stored as |z| + i·arg(z)
            FftEncoding::MagPhase => (self.response.mapv(|z| z.re), self.response.mapv(|z| z.im)),
            FftEncoding::RealImag => (
                self.response.mapv(|z| z.norm()),
                self.response.mapv(|z| z.im.atan2(z.re)),
            ),
        };
        if in_degrees {
            (mag, phase.mapv(f64::to_degrees))
        } else {
            (mag, phase)
        }
    }

    /// Values as ordinary complex numbers, whatever the stored encoding.
    pub fn real_imag(&self) -> Array2<Complex64> {
        match self.encoding {
            FftEncoding::RealImag => self.response.clone(),
            FftEncoding::MagPhase => self.response.mapv(|z| Complex64::from_polar(z.re, z.im)),
        }
    }

    /// Same values, stored in `encoding`.
    pub fn with_encoding(&self, encoding: FftEncoding) -> Self {
        if encoding == self.encoding {
            return self.clone();
        }
        let response = match encoding {
            FftEncoding::RealImag => self.real_imag(),
            FftEncoding::MagPhase => self.response.mapv(|z| Complex64::new(z.norm(), z.im.atan2(z.re))),
        };
        Self {
            response,
            encoding,
            ..self.clone()
        }
    }
}

/// Nearest whole number of bins for a ratio that is integral in exact
/// arithmetic.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bin_count(ratio: f64) -> usize {
    ratio.round().max(0.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine_signal(n: usize, fs: f64) -> Signal {
        let time = uniform_grid(n, 1.0 / fs);
        let y = time.mapv(|t| 2.0 * (2.0 * PI * 10.0 * t).sin() + 0.3);
        Signal::from_samples(time, y, "y").unwrap()
    }

    #[test]
    fn test_missing_center_rejected() {
        let f = uniform_grid(4, 1.0);
        let r = Array2::<Complex64>::zeros((4, 1));
        let err = SpectralRepresentation::new(
            f,
            r,
            vec![],
            FftEncoding::RealImag,
            Sidedness::Two,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ProcessingError::MissingCenterParity { .. }));
    }

    #[test]
    fn test_deserialize_validates() {
        let ft = sine_signal(8, 8.0)
            .to_fourier(Sidedness::Two, FftEncoding::RealImag)
            .unwrap();
        let json = serde_json::to_value(&ft).unwrap();
        let back: SpectralRepresentation = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, ft);

        let mut no_center = json.clone();
        no_center["is_onesided_center"] = serde_json::Value::Null;
        assert!(serde_json::from_value::<SpectralRepresentation>(no_center).is_err());

        let mut short = json;
        short["frequency"] = serde_json::to_value(uniform_grid(3, 1.0)).unwrap();
        assert!(serde_json::from_value::<SpectralRepresentation>(short).is_err());
    }

    #[test]
    fn test_to_time_requires_two_sided() {
        let ft = sine_signal(32, 32.0)
            .to_fourier(Sidedness::One, FftEncoding::RealImag)
            .unwrap();
        assert_eq!(
            ft.to_time().unwrap_err(),
            ProcessingError::RequiresTwoSided { operation: "to_time" }
        );
    }

    #[test]
    fn test_round_trip_mag_phase_odd_length() {
        let signal = sine_signal(999, 2000.0);
        let ft = signal.to_fourier(Sidedness::Two, FftEncoding::MagPhase).unwrap();
        assert!(!ft.is_onesided_center());
        assert!((ft.fsampling().unwrap() - 2000.0).abs() < 1e-6);
        let back = ft.to_time().unwrap();
        assert_eq!(back.len(), 999);
        for (a, b) in signal.response().iter().zip(back.response().iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_encodings_agree() {
        let signal = sine_signal(50, 100.0);
        let ri = signal.to_fourier(Sidedness::Two, FftEncoding::RealImag).unwrap();
        let mp = ri.with_encoding(FftEncoding::MagPhase);
        assert_eq!(mp.encoding(), FftEncoding::MagPhase);
        for (a, b) in ri.real_imag().iter().zip(mp.real_imag().iter()) {
            assert!((a - b).norm() < 1e-12);
        }
        let (m1, p1) = ri.magnitude_phase(true);
        let (m2, p2) = mp.magnitude_phase(true);
        for k in 0..50 {
            assert!((m1[[k, 0]] - m2[[k, 0]]).abs() < 1e-12);
            if m1[[k, 0]] > 1e-9 {
                assert!((p1[[k, 0]] - p2[[k, 0]]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_to_onesided_truncates() {
        let ft = sine_signal(10, 10.0)
            .to_fourier(Sidedness::Two, FftEncoding::RealImag)
            .unwrap();
        let one = ft.to_onesided();
        assert_eq!(one.sided(), Sidedness::One);
        assert_eq!(one.frequency().len(), 6);
        assert_eq!(one.response().nrows(), 6);
        assert!(one.is_onesided_center());
        assert!((one.fsampling().unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(one.to_onesided(), one);
    }

    #[test]
    fn test_to_psd_matches_signal_psd_all_paths() {
        let signal = sine_signal(41, 40.0);
        let two = signal.to_fourier(Sidedness::Two, FftEncoding::MagPhase).unwrap();
        let one = two.to_onesided();
        for sided in [Sidedness::One, Sidedness::Two] {
            let direct = signal.to_psd(sided).unwrap();
            for ft in [&two, &one] {
                let psd = ft.to_psd(sided).unwrap();
                assert_eq!(psd.values().len(), direct.values().len());
                for (a, b) in psd.values().iter().zip(direct.values().iter()) {
                    assert!((a - b).abs() < 1e-12);
                }
                assert_eq!(psd.is_onesided_center(), direct.is_onesided_center());
            }
        }
    }
}
