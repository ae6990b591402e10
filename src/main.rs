//! vibespec - Vibration Spectra Engine
//!
//! Command-line driver over the `vibespec` library. Results are written to
//! stdout as JSON; logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # VRS of a breakpoint PSD profile
//! vibespec vrs --profile profile.toml --q 10
//!
//! # Welch PSD of a recorded time series
//! vibespec welch --input record.json
//!
//! # Single SDOF system driven by a profile
//! vibespec sdof --profile profile.toml --natural-frequency 150
//!
//! # Random-phase time history matching a profile
//! vibespec synthesize --profile profile.toml --seed 7
//! ```
//!
//! A profile is a TOML file:
//!
//! ```toml
//! label = "base"
//! units = "g"
//! frequency = [20.0, 150.0, 600.0, 2000.0]
//! psd = [0.0053, 0.04, 0.04, 0.0036]
//! ```
//!
//! # Environment Variables
//!
//! - `VIBESPEC_CONFIG`: Path to the analysis config (default: ./vibespec.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use vibespec::config::{self, defaults, SpectralConfig};
use vibespec::processing::{PhaseModel, Spectrum, SpectrumKind, WindowType};
use vibespec::{PowerSpectralDensity, Sidedness, Signal};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "vibespec")]
#[command(about = "Vibration spectra: PSD, VRS and random-phase synthesis")]
#[command(version)]
struct CliArgs {
    /// Analysis config file (default: ./vibespec.toml, then built-in defaults)
    #[arg(long, global = true, env = "VIBESPEC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Vibration response spectrum of a breakpoint PSD profile
    Vrs {
        /// PSD profile (TOML)
        #[arg(long)]
        profile: PathBuf,
        /// Quality factor (default from config)
        #[arg(long)]
        q: Option<f64>,
        /// Uniform grid size the profile is resampled onto
        #[arg(long)]
        points: Option<usize>,
        /// Evaluate natural frequencies in parallel
        #[arg(long)]
        parallel: bool,
        /// Also report Miles' equation on the same grid
        #[arg(long)]
        miles: bool,
    },

    /// Transmissibility and response of one SDOF system under a PSD profile
    Sdof {
        /// PSD profile (TOML)
        #[arg(long)]
        profile: PathBuf,
        /// Quality factor (default from config)
        #[arg(long)]
        q: Option<f64>,
        /// Natural frequency in Hz (default from config)
        #[arg(long)]
        natural_frequency: Option<f64>,
        /// Uniform grid size the profile is resampled onto
        #[arg(long)]
        points: Option<usize>,
    },

    /// Welch PSD of a time series
    Welch {
        /// Time series (JSON: {"time": [...], "response": [...]})
        #[arg(long)]
        input: PathBuf,
        /// Window override (hann, hamming, blackman, boxcar)
        #[arg(long)]
        window: Option<WindowType>,
        /// Produce a two-sided PSD
        #[arg(long)]
        two_sided: bool,
    },

    /// Random-phase time history from a PSD profile
    Synthesize {
        /// PSD profile (TOML)
        #[arg(long)]
        profile: PathBuf,
        /// One-sided grid size the profile is resampled onto
        #[arg(long)]
        points: Option<usize>,
        /// RNG seed (default from config)
        #[arg(long)]
        seed: Option<u64>,
        /// Phase model override (single_global, independent)
        #[arg(long)]
        phase_model: Option<PhaseModel>,
    },
}

// ============================================================================
// Input / Output Formats
// ============================================================================

/// Breakpoint PSD profile, log-log interpolated between points.
#[derive(Debug, Deserialize)]
struct PsdProfile {
    #[serde(default = "default_profile_label")]
    label: String,
    #[serde(default = "default_units")]
    units: String,
    frequency: Vec<f64>,
    psd: Vec<f64>,
}

fn default_profile_label() -> String {
    "profile".to_string()
}
fn default_units() -> String {
    "g".to_string()
}

impl PsdProfile {
    fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile {}", path.display()))?;
        let profile: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse profile {}", path.display()))?;
        if profile.frequency.len() < 2 || profile.frequency.len() != profile.psd.len() {
            return Err(anyhow::anyhow!(
                "Profile needs >= 2 breakpoints with one psd value each (got {} frequencies, {} values)",
                profile.frequency.len(),
                profile.psd.len()
            ));
        }
        if profile.frequency.windows(2).any(|w| w[1] <= w[0]) {
            return Err(anyhow::anyhow!("Profile frequencies must be strictly increasing"));
        }
        Ok(profile)
    }

    fn fmin(&self) -> f64 {
        self.frequency[0]
    }

    fn fmax(&self) -> f64 {
        self.frequency[self.frequency.len() - 1]
    }

    fn to_psd(&self) -> Result<PowerSpectralDensity> {
        Ok(PowerSpectralDensity::from_values(
            Array1::from(self.frequency.clone()),
            Array1::from(self.psd.clone()),
            vec![self.label.clone()],
            Sidedness::One,
            Some(true),
            0,
        )?)
    }
}

/// Recorded time series for `welch`.
#[derive(Debug, Deserialize)]
struct TimeSeriesInput {
    #[serde(default = "default_series_label")]
    label: String,
    #[serde(default = "default_units")]
    units: String,
    time: Vec<f64>,
    response: Vec<f64>,
}

fn default_series_label() -> String {
    "signal".to_string()
}

#[derive(Debug, Serialize)]
struct SpectrumOutput {
    label: String,
    quantity: &'static str,
    units: String,
    sided: u8,
    frequency: Vec<f64>,
    response: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    grms: Option<f64>,
}

impl SpectrumOutput {
    fn from_spectrum<K: SpectrumKind>(spectrum: &Spectrum<K>, units: &str) -> Self {
        Self {
            label: spectrum.label().first().cloned().unwrap_or_default(),
            quantity: spectrum.quantity().name(),
            units: spectrum.unit_label(units),
            sided: spectrum.sided().as_u8(),
            frequency: spectrum.frequency().to_vec(),
            response: spectrum.values().to_vec(),
            grms: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct VrsOutput {
    q: f64,
    psd: SpectrumOutput,
    vrs: SpectrumOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    miles: Option<SpectrumOutput>,
}

#[derive(Debug, Serialize)]
struct SdofOutput {
    q: f64,
    natural_frequency_hz: f64,
    peak_transmissibility: f64,
    transmissibility: Vec<f64>,
    response: SpectrumOutput,
}

#[derive(Debug, Serialize)]
struct TimeSeriesOutput {
    label: String,
    units: String,
    sampling_rate: f64,
    seed: u64,
    phase_model: PhaseModel,
    rms: f64,
    psd_grms: f64,
    time: Vec<f64>,
    response: Vec<f64>,
}

// ============================================================================
// Subcommands
// ============================================================================

fn run_vrs(
    cfg: &SpectralConfig,
    profile_path: &Path,
    q: Option<f64>,
    points: Option<usize>,
    parallel: bool,
    miles: bool,
) -> Result<VrsOutput> {
    let profile = PsdProfile::load(profile_path)?;
    let q = q.unwrap_or(cfg.sdof.q);
    let points = points.unwrap_or(cfg.vrs.resample_points).max(2);

    let grid = Array1::linspace(profile.fmin(), profile.fmax(), points);
    let psd = profile.to_psd()?.resample(grid)?;
    let parallel = (parallel || cfg.vrs.parallel) && points >= defaults::VRS_PARALLEL_MIN_POINTS;
    info!(
        profile = %profile_path.display(),
        points,
        q,
        parallel,
        "Computing VRS"
    );

    let vrs = if parallel {
        psd.to_vrs_par(q)?
    } else {
        psd.to_vrs(q)?
    };
    let miles = if miles {
        Some(SpectrumOutput::from_spectrum(&psd.to_miles(q)?, &profile.units))
    } else {
        None
    };

    let mut psd_out = SpectrumOutput::from_spectrum(&psd, &profile.units);
    psd_out.grms = Some(psd.grms()?);
    Ok(VrsOutput {
        q,
        psd: psd_out,
        vrs: SpectrumOutput::from_spectrum(&vrs, &profile.units),
        miles,
    })
}

fn run_sdof(
    cfg: &SpectralConfig,
    profile_path: &Path,
    q: Option<f64>,
    natural_frequency: Option<f64>,
    points: Option<usize>,
) -> Result<SdofOutput> {
    let profile = PsdProfile::load(profile_path)?;
    let q = q.unwrap_or(cfg.sdof.q);
    let natural_frequency = natural_frequency.unwrap_or(cfg.sdof.natural_frequency_hz);
    let points = points.unwrap_or(cfg.vrs.resample_points).max(2);

    let grid = Array1::linspace(profile.fmin(), profile.fmax(), points);
    let psd = profile.to_psd()?.resample(grid)?;
    info!(
        profile = %profile_path.display(),
        points,
        q,
        natural_frequency,
        "Computing SDOF response"
    );

    let (magnitude, _) = psd
        .to_sdof_transmissibility(q, natural_frequency)?
        .magnitude_phase(false);
    let transmissibility = magnitude.column(0).to_vec();
    let peak_transmissibility = transmissibility.iter().copied().fold(0.0, f64::max);
    let response = psd.to_sdof_vrs_response(q, natural_frequency)?;

    Ok(SdofOutput {
        q,
        natural_frequency_hz: natural_frequency,
        peak_transmissibility,
        transmissibility,
        response: SpectrumOutput::from_spectrum(&response, &profile.units),
    })
}

fn run_welch(
    cfg: &SpectralConfig,
    input: &Path,
    window: Option<WindowType>,
    two_sided: bool,
) -> Result<SpectrumOutput> {
    let contents = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let series: TimeSeriesInput = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", input.display()))?;

    let signal = Signal::from_samples(
        Array1::from(series.time),
        Array1::from(series.response),
        series.label,
    )?;
    let mut params = cfg.welch;
    if let Some(window) = window {
        params.window = window;
    }
    let sided = if two_sided { Sidedness::Two } else { Sidedness::One };
    info!(
        input = %input.display(),
        samples = signal.len(),
        fs = signal.sampling_rate(),
        "Computing Welch PSD"
    );

    let psd = signal.to_psd_welch(sided, &params)?;
    let mut out = SpectrumOutput::from_spectrum(&psd, &series.units);
    out.grms = Some(psd.grms()?);
    Ok(out)
}

fn run_synthesize(
    cfg: &SpectralConfig,
    profile_path: &Path,
    points: Option<usize>,
    seed: Option<u64>,
    phase_model: Option<PhaseModel>,
) -> Result<TimeSeriesOutput> {
    let profile = PsdProfile::load(profile_path)?;
    let points = points.unwrap_or(cfg.vrs.resample_points).max(2);
    let seed = seed.unwrap_or(cfg.synthesis.seed);
    let phase_model = phase_model.unwrap_or(cfg.synthesis.phase_model);

    // one-sided DFT grid 0..=fmax, zero outside the profile band
    let df = profile.fmax() / (points - 1) as f64;
    let grid = Array1::from_iter((0..points).map(|k| k as f64 * df));
    let resampled = profile.to_psd()?.resample(grid.clone())?;
    let (fmin, fmax) = (profile.fmin(), profile.fmax());
    let banded = Array1::from_iter(
        grid.iter()
            .zip(resampled.values().iter())
            .map(|(&f, &s)| if f < fmin || f > fmax { 0.0 } else { s }),
    );
    let psd = PowerSpectralDensity::from_values(
        grid,
        banded,
        vec![profile.label.clone()],
        Sidedness::One,
        Some(true),
        0,
    )?;

    info!(
        profile = %profile_path.display(),
        points,
        seed,
        phase_model = ?phase_model,
        "Synthesizing time series"
    );
    let strategy = phase_model.strategy();
    let mut rng = StdRng::seed_from_u64(seed);
    let signal = psd.to_time_series(strategy.as_ref(), &mut rng)?;

    Ok(TimeSeriesOutput {
        label: profile.label,
        units: profile.units,
        sampling_rate: signal.sampling_rate(),
        seed,
        phase_model,
        rms: signal.rms()[0],
        psd_grms: psd.grms()?,
        time: signal.time().to_vec(),
        response: signal.response().column(0).to_vec(),
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{text}");
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    // Initialize logging (stderr, stdout carries the JSON result)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    // Load analysis configuration
    let spectral_config = match &args.config {
        Some(path) => SpectralConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SpectralConfig::load(),
    };
    info!(
        "Q: {:.1} | Welch: {} s / {} s | phase model: {:?}",
        spectral_config.sdof.q,
        spectral_config.welch.window_size_sec,
        spectral_config.welch.overlap_sec,
        spectral_config.synthesis.phase_model
    );
    config::init(spectral_config);
    let cfg = config::get();

    match args.command {
        SubCommand::Vrs {
            profile,
            q,
            points,
            parallel,
            miles,
        } => print_json(&run_vrs(cfg, &profile, q, points, parallel, miles)?),
        SubCommand::Sdof {
            profile,
            q,
            natural_frequency,
            points,
        } => print_json(&run_sdof(cfg, &profile, q, natural_frequency, points)?),
        SubCommand::Welch {
            input,
            window,
            two_sided,
        } => print_json(&run_welch(cfg, &input, window, two_sided)?),
        SubCommand::Synthesize {
            profile,
            points,
            seed,
            phase_model,
        } => print_json(&run_synthesize(cfg, &profile, points, seed, phase_model)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_profile(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("profile.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "label = \"base\"\nfrequency = [20.0, 150.0, 600.0, 2000.0]\npsd = [0.0053, 0.04, 0.04, 0.0036]"
        )
        .unwrap();
        path
    }

    #[test]
    fn test_vrs_subcommand_grid() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_profile(&dir);
        let out = run_vrs(&SpectralConfig::default(), &path, None, Some(100), false, true).unwrap();
        assert_eq!(out.vrs.frequency.len(), 100);
        assert!((out.vrs.frequency[0] - 20.0).abs() < 1e-9);
        assert_eq!(out.vrs.quantity, "VRS");
        assert_eq!(out.psd.units, "g^2/Hz");
        assert!(out.miles.is_some());
    }

    #[test]
    fn test_sdof_uses_configured_natural_frequency() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_profile(&dir);
        let mut cfg = SpectralConfig::default();
        cfg.sdof.natural_frequency_hz = 200.0;
        // 20..2000 Hz in 10 Hz steps, so 200 Hz is a grid point
        let out = run_sdof(&cfg, &path, None, None, Some(199)).unwrap();
        assert_eq!(out.natural_frequency_hz, 200.0);
        assert_eq!(out.transmissibility.len(), 199);
        // |T(fn)| = sqrt(1 + Q²) with the default Q of 10
        assert!((out.peak_transmissibility - 101.0_f64.sqrt()).abs() < 1e-9);
        assert_eq!(out.response.quantity, "VRS");
        assert!((out.response.response[0] - 0.0053).abs() < 1e-12);

        let overridden = run_sdof(&cfg, &path, None, Some(500.0), Some(199)).unwrap();
        assert_eq!(overridden.natural_frequency_hz, 500.0);
    }

    #[test]
    fn test_synthesize_is_seeded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_profile(&dir);
        let cfg = SpectralConfig::default();
        let a = run_synthesize(&cfg, &path, Some(257), Some(5), Some(PhaseModel::Independent))
            .unwrap();
        let b = run_synthesize(&cfg, &path, Some(257), Some(5), Some(PhaseModel::Independent))
            .unwrap();
        assert_eq!(a.response, b.response);
        assert_eq!(a.response.len(), 512);
        assert!((a.rms - a.psd_grms).abs() < 1e-9 * a.psd_grms.max(1.0));
    }

    #[test]
    fn test_bad_profile_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "frequency = [10.0, 5.0]\npsd = [1.0, 1.0]\n").unwrap();
        assert!(PsdProfile::load(&path).is_err());
    }
}
