//! Welch PSD estimation.
//!
//! Averaged modified periodogram: the record is cut into overlapping
//! segments, each segment is detrended and windowed, its squared transform
//! is scaled, and the segment spectra are averaged (mean).
//!
//! Windows are the periodic (DFT-even) forms, as used for spectral
//! estimation.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;

use super::{FftProcessor, ProcessingError, Sidedness};

/// Window function applied to each segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    #[default]
    Hann,
    Hamming,
    Blackman,
    /// Rectangular window.
    Boxcar,
}

impl WindowType {
    /// Periodic window coefficients of length `n`.
    pub fn coefficients(self, n: usize) -> Vec<f64> {
        if n <= 1 {
            return vec![1.0; n];
        }
        let nf = n as f64;
        (0..n)
            .map(|i| {
                let x = 2.0 * PI * i as f64 / nf;
                match self {
                    Self::Hann => 0.5 - 0.5 * x.cos(),
                    Self::Hamming => 0.54 - 0.46 * x.cos(),
                    Self::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
                    Self::Boxcar => 1.0,
                }
            })
            .collect()
    }
}

impl FromStr for WindowType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hann" | "hanning" => Ok(Self::Hann),
            "hamming" => Ok(Self::Hamming),
            "blackman" => Ok(Self::Blackman),
            "boxcar" | "rect" | "rectangular" | "ones" => Ok(Self::Boxcar),
            other => Err(format!("unknown window '{other}'")),
        }
    }
}

/// Detrending mode per segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Detrend {
    /// No detrending.
    None,
    /// Remove the segment mean.
    #[default]
    Constant,
}

/// PSD scaling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PsdScaling {
    /// Power spectral density in units²/Hz.
    #[default]
    Density,
    /// Power spectrum in units².
    Spectrum,
}

/// Segment-level options in samples, as consumed by [`welch`].
#[derive(Debug, Clone, PartialEq)]
pub struct WelchOptions {
    pub window: WindowType,
    pub nperseg: usize,
    pub noverlap: usize,
    pub detrend: Detrend,
    pub scaling: PsdScaling,
    pub sided: Sidedness,
}

/// Segment options in seconds, as taken by `Signal::to_psd_welch`.
///
/// Also the `[welch]` table of the config file; missing keys take the
/// defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WelchParams {
    pub window: WindowType,
    pub window_size_sec: f64,
    pub overlap_sec: f64,
    pub detrend: Detrend,
    pub scaling: PsdScaling,
}

impl Default for WelchParams {
    fn default() -> Self {
        Self {
            window: WindowType::Hann,
            window_size_sec: crate::config::defaults::WELCH_WINDOW_SIZE_SEC,
            overlap_sec: crate::config::defaults::WELCH_OVERLAP_SEC,
            detrend: Detrend::Constant,
            scaling: PsdScaling::Density,
        }
    }
}

impl WelchParams {
    /// Convert second-based sizes to sample counts at `fs`.
    pub fn to_options(&self, fs: f64, sided: Sidedness) -> Result<WelchOptions, ProcessingError> {
        if !(self.window_size_sec.is_finite() && self.window_size_sec > 0.0) {
            return Err(ProcessingError::InvalidParameter {
                name: "window_size_sec",
                value: self.window_size_sec,
                reason: "must be > 0",
            });
        }
        if !(self.overlap_sec.is_finite() && self.overlap_sec >= 0.0) {
            return Err(ProcessingError::InvalidParameter {
                name: "overlap_sec",
                value: self.overlap_sec,
                reason: "must be >= 0",
            });
        }
        Ok(WelchOptions {
            window: self.window,
            nperseg: samples_for(fs, self.window_size_sec),
            noverlap: samples_for(fs, self.overlap_sec),
            detrend: self.detrend,
            scaling: self.scaling,
            sided,
        })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn samples_for(fs: f64, seconds: f64) -> usize {
    (fs * seconds).round().max(0.0) as usize
}

/// Welch estimate of `samples` taken at `fs`.
///
/// Returns `(frequency, psd)`. One-sided output keeps `nperseg/2 + 1` bins
/// with mirrored bins doubled; two-sided output is the full DFT grid
/// `k·fs/nperseg`, `k = 0..nperseg`.
///
/// A segment longer than the record is shortened to the record length.
pub fn welch(
    samples: &[f64],
    fs: f64,
    options: &WelchOptions,
) -> Result<(Vec<f64>, Vec<f64>), ProcessingError> {
    if samples.is_empty() {
        return Err(ProcessingError::InsufficientData {
            needed: 1,
            available: 0,
        });
    }
    if !(fs.is_finite() && fs > 0.0) {
        return Err(ProcessingError::InvalidSamplingRate(fs));
    }
    if options.nperseg == 0 {
        return Err(ProcessingError::InvalidParameter {
            name: "nperseg",
            value: 0.0,
            reason: "segment must contain at least one sample",
        });
    }

    let mut nperseg = options.nperseg;
    if nperseg > samples.len() {
        tracing::warn!(
            nperseg,
            available = samples.len(),
            "Welch segment longer than record, using record length"
        );
        nperseg = samples.len();
    }
    let noverlap = options.noverlap;
    if noverlap >= nperseg {
        return Err(ProcessingError::InvalidParameter {
            name: "noverlap",
            value: noverlap as f64,
            reason: "overlap must be shorter than the segment",
        });
    }

    let window = options.window.coefficients(nperseg);
    let scale = match options.scaling {
        PsdScaling::Density => 1.0 / (fs * window.iter().map(|w| w * w).sum::<f64>()),
        PsdScaling::Spectrum => 1.0 / window.iter().sum::<f64>().powi(2),
    };

    let processor = FftProcessor::new(nperseg, fs)?;
    let step = nperseg - noverlap;
    let mut accum = vec![0.0_f64; nperseg];
    let mut segments = 0_usize;
    let mut start = 0_usize;
    let mut buffer = vec![Complex64::new(0.0, 0.0); nperseg];

    while start + nperseg <= samples.len() {
        let segment = &samples[start..start + nperseg];
        let mean = match options.detrend {
            Detrend::Constant => segment.iter().sum::<f64>() / nperseg as f64,
            Detrend::None => 0.0,
        };
        for ((dst, &x), &w) in buffer.iter_mut().zip(segment).zip(&window) {
            *dst = Complex64::new((x - mean) * w, 0.0);
        }
        processor.forward(&mut buffer)?;
        for (a, c) in accum.iter_mut().zip(&buffer) {
            *a += c.norm_sqr();
        }
        segments += 1;
        start += step;
    }

    let norm = scale / segments as f64;
    let twosided: Vec<f64> = accum.iter().map(|p| p * norm).collect();
    let df = fs / nperseg as f64;
    tracing::debug!(nperseg, noverlap, segments, df, "Welch estimate");

    match options.sided {
        Sidedness::Two => Ok((processor.frequency_bins(), twosided)),
        Sidedness::One => {
            let half = super::sided::onesided_len(nperseg);
            let is_center = nperseg % 2 == 0;
            let folded = super::sided::fold_density_onesided(
                ndarray::ArrayView1::from(&twosided[..half]),
                is_center,
            );
            let frequency = (0..half).map(|k| k as f64 * df).collect();
            Ok((frequency, folded.to_vec()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(nperseg: usize, noverlap: usize, sided: Sidedness) -> WelchOptions {
        WelchOptions {
            window: WindowType::Hann,
            nperseg,
            noverlap,
            detrend: Detrend::Constant,
            scaling: PsdScaling::Density,
            sided,
        }
    }

    #[test]
    fn test_window_shapes() {
        let hann = WindowType::Hann.coefficients(8);
        assert!(hann[0].abs() < 1e-12);
        assert!((hann[4] - 1.0).abs() < 1e-12);
        assert!(WindowType::Boxcar.coefficients(5).iter().all(|&w| w == 1.0));
        assert_eq!("boxcar".parse::<WindowType>().unwrap(), WindowType::Boxcar);
        assert!("triangle".parse::<WindowType>().is_err());
    }

    #[test]
    fn test_welch_tone_peak() {
        let fs = 1000.0;
        let samples: Vec<f64> = (0..4000)
            .map(|i| (2.0 * PI * 125.0 * i as f64 / fs).sin())
            .collect();
        let (f, p) = welch(&samples, fs, &options(200, 100, Sidedness::One)).unwrap();
        assert_eq!(f.len(), 101);
        let peak = p
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!((f[peak] - 125.0).abs() < 1e-9);
    }

    #[test]
    fn test_welch_boxcar_integrates_to_variance() {
        // one segment, boxcar: exactly the periodogram, Parseval holds
        let fs = 64.0;
        let samples: Vec<f64> = (0..64)
            .map(|i| (i as f64 * 0.37).sin() + 0.25 * (i as f64 * 1.91).cos())
            .collect();
        let mean = samples.iter().sum::<f64>() / 64.0;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 64.0;

        let mut opts = options(64, 0, Sidedness::One);
        opts.window = WindowType::Boxcar;
        let (f, p) = welch(&samples, fs, &opts).unwrap();
        let df = f[1] - f[0];
        let total: f64 = p.iter().sum::<f64>() * df;
        assert!((total - variance).abs() < 1e-9, "{total} vs {variance}");

        opts.sided = Sidedness::Two;
        let (f2, p2) = welch(&samples, fs, &opts).unwrap();
        assert_eq!(f2.len(), 64);
        let total2: f64 = p2.iter().sum::<f64>() * (f2[1] - f2[0]);
        assert!((total2 - variance).abs() < 1e-9);
    }

    #[test]
    fn test_welch_rejects_bad_overlap() {
        let samples = vec![0.0; 32];
        assert!(welch(&samples, 1.0, &options(16, 16, Sidedness::One)).is_err());
        assert!(welch(&[], 1.0, &options(16, 8, Sidedness::One)).is_err());
    }

    #[test]
    fn test_params_to_options_rounds() {
        let params = WelchParams {
            window_size_sec: 0.25,
            overlap_sec: 0.125,
            ..WelchParams::default()
        };
        let opts = params.to_options(1000.0, Sidedness::One).unwrap();
        assert_eq!(opts.nperseg, 250);
        assert_eq!(opts.noverlap, 125);
    }
}
