//! System-wide default constants.
//!
//! Every `#[serde(default)]` in [`super::SpectralConfig`] resolves to one of
//! these, so a missing config file and an empty one behave the same.

// ============================================================================
// Welch Estimation
// ============================================================================

/// Welch segment length (seconds).
///
/// At 1 kHz this is a 1000-point segment with 1 Hz resolution.
pub const WELCH_WINDOW_SIZE_SEC: f64 = 1.0;

/// Overlap between consecutive Welch segments (seconds). Half a segment.
pub const WELCH_OVERLAP_SEC: f64 = 0.5;

// ============================================================================
// SDOF
// ============================================================================

/// Quality factor used when none is given. `Q = 10` is the usual choice
/// for vibration response spectra (5% damping).
pub const DEFAULT_Q: f64 = 10.0;

/// Natural frequency for single-system SDOF responses (Hz).
pub const DEFAULT_NATURAL_FREQUENCY_HZ: f64 = 100.0;

// ============================================================================
// Synthesis
// ============================================================================

/// Seed for random-phase synthesis when the caller does not pick one.
pub const DEFAULT_SYNTHESIS_SEED: u64 = 0;

// ============================================================================
// VRS
// ============================================================================

/// Points on the uniform grid a breakpoint profile is resampled onto.
pub const RESAMPLE_POINTS: usize = 1001;

/// Below this many grid points the serial VRS loop is used even when
/// parallel evaluation is enabled.
pub const VRS_PARALLEL_MIN_POINTS: usize = 256;

// ============================================================================
// Config File Search
// ============================================================================

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "VIBESPEC_CONFIG";

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "vibespec.toml";
