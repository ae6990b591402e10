//! Analysis Configuration Module
//!
//! Provides the analysis defaults (Welch segmenting, SDOF parameters,
//! synthesis phase model, VRS evaluation) loaded from TOML files.
//!
//! ## Loading Order
//!
//! 1. `VIBESPEC_CONFIG` environment variable (path to TOML file)
//! 2. `vibespec.toml` in the current working directory
//! 3. Built-in defaults (see [`defaults`])
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(SpectralConfig::load());
//!
//! // Anywhere in the binary:
//! let q = config::get().sdof.q;
//! ```

pub mod defaults;
mod spectral_config;
pub mod validation;

pub use spectral_config::*;

use std::sync::OnceLock;

/// Global analysis configuration, initialized once at startup.
static SPECTRAL_CONFIG: OnceLock<SpectralConfig> = OnceLock::new();

/// Initialize the global configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: SpectralConfig) {
    if SPECTRAL_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get the global configuration.
///
/// Falls back to the built-in defaults if `init()` was never called.
pub fn get() -> &'static SpectralConfig {
    SPECTRAL_CONFIG.get_or_init(|| {
        tracing::debug!("config::get() before config::init(), using defaults");
        SpectralConfig::default()
    })
}
