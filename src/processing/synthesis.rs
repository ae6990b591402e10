//! Phase models for PSD -> time series synthesis.
//!
//! A PSD fixes only the magnitude of each bin; the phases are free. The
//! strategy decides how they are drawn. Randomness always comes from the
//! caller's RNG so runs can be seeded.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Draws the phase of every bin of an `n`-point two-sided spectrum.
pub trait PhaseStrategy: Send + Sync {
    fn phases(&self, n: usize, rng: &mut dyn RngCore) -> Vec<f64>;
}

/// One uniform draw in `[-π, π]` shared by every bin.
///
/// With a conjugate-symmetric magnitude this gives `cos(φ)` times a
/// zero-phase record, so the RMS can fall anywhere in `[0, grms]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleGlobalPhase;

impl PhaseStrategy for SingleGlobalPhase {
    fn phases(&self, n: usize, rng: &mut dyn RngCore) -> Vec<f64> {
        let phase = rng.gen_range(-PI..=PI);
        vec![phase; n]
    }
}

/// Independent uniform phase per bin, Hermitian-symmetric
/// (`φ[n-k] = -φ[k]`), with DC and Nyquist held real.
///
/// The synthesized record is real and its RMS equals the PSD's `grms`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndependentPhase;

impl PhaseStrategy for IndependentPhase {
    fn phases(&self, n: usize, rng: &mut dyn RngCore) -> Vec<f64> {
        let mut phases = vec![0.0; n];
        for k in 1..n.div_ceil(2) {
            let phase = rng.gen_range(-PI..PI);
            phases[k] = phase;
            phases[n - k] = -phase;
        }
        phases
    }
}

/// Config-level selector for a [`PhaseStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseModel {
    #[default]
    SingleGlobal,
    Independent,
}

impl PhaseModel {
    pub fn strategy(self) -> Box<dyn PhaseStrategy> {
        match self {
            Self::SingleGlobal => Box::new(SingleGlobalPhase),
            Self::Independent => Box::new(IndependentPhase),
        }
    }
}

impl std::str::FromStr for PhaseModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_global" => Ok(Self::SingleGlobal),
            "independent" => Ok(Self::Independent),
            other => Err(format!("unknown phase model '{other}'")),
        }
    }
}
