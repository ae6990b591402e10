//! Single-degree-of-freedom (SDOF) base-excitation formulas.
//!
//! With natural frequency `fn`, quality factor `Q`, damping ratio
//! `ζ = 1/(2Q)` and frequency ratio `ρ = f/fn`:
//!
//! ```text
//! transmissibility      T(f) = (1 + 2jζρ) / (1 - ρ² + 2jζρ)
//! base excitation gain  |T(f)|² = (1 + 4ζ²ρ²) / ((1 - ρ²)² + 4ζ²ρ²)
//! VRS(fn)               sqrt(Σ_f |T(f)|²·S(f)·df)
//! ```

use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;
use rayon::prelude::*;

use super::ProcessingError;

/// Damping ratio for a quality factor, `ζ = 1/(2Q)`.
pub fn damping_ratio(q: f64) -> Result<f64, ProcessingError> {
    check_positive("q", q)?;
    Ok(1.0 / (2.0 * q))
}

pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<(), ProcessingError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ProcessingError::InvalidParameter {
            name,
            value,
            reason: "must be a finite value > 0",
        })
    }
}

/// Complex transmissibility of the SDOF system at `frequency`.
pub fn transmissibility(frequency: f64, natural_frequency: f64, zeta: f64) -> Complex64 {
    let rho = frequency / natural_frequency;
    let damping = Complex64::new(0.0, 2.0 * zeta * rho);
    (1.0 + damping) / (1.0 - rho * rho + damping)
}

/// Absolute acceleration response of the SDOF system to base
/// acceleration, `-fn²·f² / (fn² - f² + 2jζ·f·fn)`.
pub fn acceleration_transfer(frequency: f64, natural_frequency: f64, zeta: f64) -> Complex64 {
    let fn2 = natural_frequency * natural_frequency;
    let f2 = frequency * frequency;
    let numerator = Complex64::new(-fn2 * f2, 0.0);
    let denominator = Complex64::new(fn2 - f2, 2.0 * zeta * frequency * natural_frequency);
    numerator / denominator
}

/// `|T|²` written in terms of the frequency ratio.
///
/// At `fn = 0` the ratio is unbounded and the gain tends to zero, except at
/// `f = 0` itself where the system moves with its base.
pub fn base_excitation_gain(frequency: f64, natural_frequency: f64, zeta: f64) -> f64 {
    if natural_frequency == 0.0 {
        return if frequency == 0.0 { 1.0 } else { 0.0 };
    }
    let rho2 = (frequency / natural_frequency).powi(2);
    let damping = 4.0 * zeta * zeta * rho2;
    (1.0 + damping) / ((1.0 - rho2).powi(2) + damping)
}

fn vrs_at(
    natural_frequency: f64,
    frequency: ArrayView1<'_, f64>,
    psd: ArrayView1<'_, f64>,
    zeta: f64,
    df: f64,
) -> f64 {
    frequency
        .iter()
        .zip(psd.iter())
        .map(|(&f, &s)| base_excitation_gain(f, natural_frequency, zeta) * s * df)
        .sum::<f64>()
        .sqrt()
}

/// VRS at every grid frequency, one natural frequency after another.
pub fn vrs_serial(
    frequency: ArrayView1<'_, f64>,
    psd: ArrayView1<'_, f64>,
    zeta: f64,
    df: f64,
) -> Array1<f64> {
    frequency.mapv(|fn_| vrs_at(fn_, frequency, psd, zeta, df))
}

/// Same sums as [`vrs_serial`], natural frequencies spread over the rayon
/// pool.
pub fn vrs_parallel(
    frequency: ArrayView1<'_, f64>,
    psd: ArrayView1<'_, f64>,
    zeta: f64,
    df: f64,
) -> Array1<f64> {
    let natural: Vec<f64> = frequency.to_vec();
    let values: Vec<f64> = natural
        .par_iter()
        .map(|&fn_| vrs_at(fn_, frequency, psd, zeta, df))
        .collect();
    Array1::from(values)
}

/// Mean spacing of a grid.
pub fn mean_step(frequency: ArrayView1<'_, f64>) -> Result<f64, ProcessingError> {
    let n = frequency.len();
    if n < 2 {
        return Err(ProcessingError::InsufficientData {
            needed: 2,
            available: n,
        });
    }
    Ok((frequency[n - 1] - frequency[0]) / (n - 1) as f64)
}
