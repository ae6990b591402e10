//! Spectral Configuration - analysis defaults as operator-tunable TOML values
//!
//! Each section implements `Default` with the constants in
//! [`super::defaults`], so running without a config file changes nothing.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::processing::{PhaseModel, WelchParams};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for an analysis run.
///
/// Load with `SpectralConfig::load()` which searches:
/// 1. `$VIBESPEC_CONFIG` env var
/// 2. `./vibespec.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralConfig {
    /// Welch PSD estimation
    #[serde(default)]
    pub welch: WelchParams,

    /// SDOF system parameters
    #[serde(default)]
    pub sdof: SdofConfig,

    /// Random-phase time series synthesis
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Vibration response spectrum evaluation
    #[serde(default)]
    pub vrs: VrsConfig,
}

impl SpectralConfig {
    /// Load configuration using the standard search order:
    /// 1. `$VIBESPEC_CONFIG` environment variable
    /// 2. `./vibespec.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from VIBESPEC_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from VIBESPEC_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "VIBESPEC_CONFIG points to non-existent file, falling back");
            }
        }

        // 2. Check ./vibespec.toml
        let local = PathBuf::from(defaults::CONFIG_FILE_NAME);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./vibespec.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./vibespec.toml, using defaults");
                }
            }
        }

        // 3. Defaults
        info!("No vibespec.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config = Self::from_toml_str(&contents)
            .map_err(|e| e.with_path(path))?;
        Ok(config)
    }

    /// Parse and validate TOML text.
    ///
    /// Unknown keys are logged as warnings; they never fail the load.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        // Two-pass: check for unknown keys first (warnings only)
        let typo_warnings = super::validation::validate_unknown_keys(contents);
        for w in &typo_warnings {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize current config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Validate every value range.
    ///
    /// Rules:
    /// - `sdof.q` and `sdof.natural_frequency_hz` must be finite and > 0
    /// - `welch.window_size_sec` must be > 0, `welch.overlap_sec` in
    ///   `[0, window_size_sec)`
    /// - `vrs.resample_points` must be >= 2
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, range_warnings) = super::validation::validate_ranges(self);
        for w in &range_warnings {
            warn!("{}", w);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Config Errors
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        match self {
            Self::Parse(_, e) => Self::Parse(path.to_path_buf(), e),
            other => other,
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            Self::Serialize(e) => write!(f, "Config serialization error: {e}"),
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// SDOF
// ============================================================================

/// Single-degree-of-freedom system parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdofConfig {
    /// Quality factor, `Q = 1/(2ζ)`
    #[serde(default = "default_q")]
    pub q: f64,

    /// Natural frequency for single-system responses (Hz)
    #[serde(default = "default_natural_frequency")]
    pub natural_frequency_hz: f64,
}

const fn default_q() -> f64 {
    defaults::DEFAULT_Q
}
const fn default_natural_frequency() -> f64 {
    defaults::DEFAULT_NATURAL_FREQUENCY_HZ
}

impl Default for SdofConfig {
    fn default() -> Self {
        Self {
            q: default_q(),
            natural_frequency_hz: default_natural_frequency(),
        }
    }
}

// ============================================================================
// Synthesis
// ============================================================================

/// PSD -> time series synthesis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// `single_global` or `independent`
    #[serde(default)]
    pub phase_model: PhaseModel,

    #[serde(default = "default_seed")]
    pub seed: u64,
}

const fn default_seed() -> u64 {
    defaults::DEFAULT_SYNTHESIS_SEED
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            phase_model: PhaseModel::default(),
            seed: default_seed(),
        }
    }
}

// ============================================================================
// VRS
// ============================================================================

/// VRS evaluation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VrsConfig {
    /// Spread the per-frequency sums over the rayon pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    /// Uniform grid size a breakpoint profile is resampled onto
    #[serde(default = "default_resample_points")]
    pub resample_points: usize,
}

const fn default_parallel() -> bool {
    true
}
const fn default_resample_points() -> usize {
    defaults::RESAMPLE_POINTS
}

impl Default for VrsConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            resample_points: default_resample_points(),
        }
    }
}
