//! FFT computation using rustfft
//!
//! Thin pre-planned wrapper over `rustfft` used by every conversion in this
//! crate. Transforms are always of the exact record length: no zero padding,
//! no power-of-two rounding, since the sample count parity is part of the
//! spectrum's identity.
//!
//! # Normalization
//!
//! - [`FftProcessor::forward`]: unnormalized, `X_k = Σ x_j e^{-2πijk/n}`
//! - [`FftProcessor::inverse`]: divided by `n`, so `inverse(forward(x)) == x`
//!
//! # Example
//!
//! ```
//! use vibespec::processing::FftProcessor;
//!
//! let fft = FftProcessor::new(4, 8.0).unwrap();
//! let spectrum = fft.forward_real(&[1.0, 0.0, -1.0, 0.0]);
//! assert!((spectrum[1].re - 2.0).abs() < 1e-12);
//! ```

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use super::ProcessingError;

/// FFT processor with pre-planned forward and inverse transforms.
///
/// Use this when computing many FFTs of the same size for better performance.
pub struct FftProcessor {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    size: usize,
    sampling_rate: f64,
}

impl std::fmt::Debug for FftProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftProcessor")
            .field("size", &self.size)
            .field("sampling_rate", &self.sampling_rate)
            .finish_non_exhaustive()
    }
}

impl FftProcessor {
    /// Create a new FFT processor
    ///
    /// # Arguments
    /// * `size` - Exact transform length
    /// * `sampling_rate` - Sampling rate in Hz
    pub fn new(size: usize, sampling_rate: f64) -> Result<Self, ProcessingError> {
        if size == 0 {
            return Err(ProcessingError::InsufficientData {
                needed: 1,
                available: 0,
            });
        }
        if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
            return Err(ProcessingError::InvalidSamplingRate(sampling_rate));
        }

        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);

        Ok(Self {
            forward,
            inverse,
            size,
            sampling_rate,
        })
    }

    /// Forward transform of a real-valued record.
    ///
    /// Samples beyond `size` are ignored; a shorter record is zero-extended.
    pub fn forward_real(&self, signal: &[f64]) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = signal
            .iter()
            .take(self.size)
            .map(|&x| Complex64::new(x, 0.0))
            .collect();
        buffer.resize(self.size, Complex64::new(0.0, 0.0));
        self.forward.process(&mut buffer);
        buffer
    }

    /// Forward transform of a complex record, in place.
    pub fn forward(&self, buffer: &mut [Complex64]) -> Result<(), ProcessingError> {
        self.check_len(buffer.len())?;
        self.forward.process(buffer);
        Ok(())
    }

    /// Inverse transform, normalized by `1/n`.
    pub fn inverse(&self, spectrum: &[Complex64]) -> Result<Vec<Complex64>, ProcessingError> {
        self.check_len(spectrum.len())?;
        let mut buffer = spectrum.to_vec();
        self.inverse.process(&mut buffer);
        let scale = 1.0 / self.size as f64;
        for c in &mut buffer {
            *c *= scale;
        }
        Ok(buffer)
    }

    /// Get frequency bins for this FFT configuration (two-sided DFT grid)
    pub fn frequency_bins(&self) -> Vec<f64> {
        let df = self.frequency_resolution();
        (0..self.size).map(|i| i as f64 * df).collect()
    }

    /// Get the FFT size
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Get the frequency resolution (Hz per bin)
    pub fn frequency_resolution(&self) -> f64 {
        self.sampling_rate / self.size as f64
    }

    fn check_len(&self, len: usize) -> Result<(), ProcessingError> {
        if len == self.size {
            Ok(())
        } else {
            Err(ProcessingError::ShapeMismatch {
                what: "fft buffer",
                rows: len,
                expected: self.size,
            })
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
