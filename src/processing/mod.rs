//! Spectral processing module - time series, Fourier, PSD and VRS conversions
//!
//! Every container here is an immutable value. Conversions borrow `self` and
//! return a new value; rebind the result if the old one is no longer needed.

mod fft;
mod fourier;
pub mod sdof;
pub mod sided;
mod signal;
mod spectrum;
pub mod synthesis;
pub mod welch;

pub use fft::FftProcessor;
pub use fourier::SpectralRepresentation;
pub use signal::Signal;
pub use spectrum::{
    Density, PowerSpectralDensity, Response, Spectrum, SpectrumKind, SpectrumQuantity,
    VibrationResponseSpectrum,
};
pub use synthesis::{IndependentPhase, PhaseModel, PhaseStrategy, SingleGlobalPhase};
pub use welch::{Detrend, PsdScaling, WelchOptions, WelchParams, WindowType};

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors in spectral processing.
///
/// Every variant is a broken contract; the computation that raised it is
/// abandoned and no partial result is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    #[error("Insufficient data: need {needed}, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("Invalid sampling rate: {0}")]
    InvalidSamplingRate(f64),

    #[error("Shape mismatch in {what}: response has {rows} rows, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        rows: usize,
        expected: usize,
    },

    #[error("{entity} supports a single channel, got {columns} columns")]
    MultiChannel { entity: &'static str, columns: usize },

    #[error("{entity} requires real-valued data, got a complex array")]
    ComplexValued { entity: &'static str },

    #[error("is_onesided_center must be given explicitly for {entity}")]
    MissingCenterParity { entity: &'static str },

    #[error("sided must be 1 or 2, got {0}")]
    InvalidSidedness(u8),

    #[error("{operation} requires a two-sided spectrum")]
    RequiresTwoSided { operation: &'static str },

    #[error("octave_spacing={0} is not implemented; only uniform grids (0) are supported")]
    OctaveSpacingNotImplemented(u32),

    #[error("Invalid parameter {name}={value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

/// Which half of the spectrum an array covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sidedness {
    /// Non-negative frequencies only, up to (or just below) Nyquist.
    One,
    /// The full DFT range `0..fs`.
    Two,
}

impl Sidedness {
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

impl TryFrom<u8> for Sidedness {
    type Error = ProcessingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(ProcessingError::InvalidSidedness(other)),
        }
    }
}

impl std::fmt::Display for Sidedness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// How complex Fourier samples are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FftEncoding {
    /// `re + i·im`
    #[default]
    RealImag,
    /// `|z| + i·arg(z)` packed into one complex value.
    MagPhase,
}

/// Element types a response array may be built from.
///
/// Lets constructors reject complex input at run time the same way they
/// reject bad shapes, while real input passes through untouched.
pub trait Sample: Copy {
    const IS_COMPLEX: bool;

    fn real_part(self) -> f64;
}

impl Sample for f64 {
    const IS_COMPLEX: bool = false;

    fn real_part(self) -> f64 {
        self
    }
}

impl Sample for f32 {
    const IS_COMPLEX: bool = false;

    fn real_part(self) -> f64 {
        f64::from(self)
    }
}

impl Sample for Complex64 {
    const IS_COMPLEX: bool = true;

    fn real_part(self) -> f64 {
        self.re
    }
}

/// Uniform grid `k·step` for `k = 0..n`.
pub(crate) fn uniform_grid(n: usize, step: f64) -> ndarray::Array1<f64> {
    ndarray::Array1::from_iter((0..n).map(|k| k as f64 * step))
}

/// Pad or trim a label list to one entry per channel.
pub(crate) fn channel_labels(label: Vec<String>, channels: usize) -> Vec<String> {
    let mut label = label;
    let start = label.len();
    label.extend((start..channels).map(|i| format!("channel_{i}")));
    label.truncate(channels);
    label
}
