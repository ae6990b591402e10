//! vibespec: Vibration Spectra Engine
//!
//! Converts vibration measurements between time histories, Fourier
//! transforms and power spectral densities, and derives the response
//! spectra used in vibration testing.
//!
//! ## Architecture
//!
//! - **Signal**: uniformly-sampled real time series
//! - **SpectralRepresentation**: complex Fourier samples (real/imag or magnitude/phase)
//! - **PowerSpectralDensity**: one-channel PSD with sidedness and center parity
//! - **VibrationResponseSpectrum**: SDOF response magnitude per natural frequency
//!
//! ```text
//! Signal -> SpectralRepresentation -> PowerSpectralDensity -> VibrationResponseSpectrum
//!   ^                |                        |
//!   +---- to_time ---+                        |
//!   +------------ to_time_series -------------+
//! ```

pub mod config;
pub mod processing;

// Re-export configuration
pub use config::SpectralConfig;

// Re-export the spectral containers
pub use processing::{
    FftEncoding, PowerSpectralDensity, ProcessingError, Sidedness, Signal, SpectralRepresentation,
    SpectrumQuantity, VibrationResponseSpectrum,
};
