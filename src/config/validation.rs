//! Config validation: unknown-key detection with Levenshtein suggestions
//! and value range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `SpectralConfig`.
///
/// Maintained by hand to match the struct hierarchy in `spectral_config.rs`
/// and `WelchParams`.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [welch]
        "welch",
        "welch.window",
        "welch.window_size_sec",
        "welch.overlap_sec",
        "welch.detrend",
        "welch.scaling",
        // [sdof]
        "sdof",
        "sdof.q",
        "sdof.natural_frequency_hz",
        // [synthesis]
        "synthesis",
        "synthesis.phase_model",
        "synthesis.seed",
        // [vrs]
        "vrs",
        "vrs.parallel",
        "vrs.resample_points",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties go to the alphabetically first key so the suggestion is stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|&(dist, _)| dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys; it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        // parse errors are handled by serde later
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Value Range Validation
// ============================================================================

/// Validate value ranges on a parsed `SpectralConfig`.
///
/// Returns (errors, warnings): errors are values no computation can use;
/// warnings are legal but unusual.
pub fn validate_ranges(config: &super::SpectralConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    check_positive(config.sdof.q, "sdof.q", &mut errors);
    check_positive(
        config.sdof.natural_frequency_hz,
        "sdof.natural_frequency_hz",
        &mut errors,
    );

    let w = &config.welch;
    check_positive(w.window_size_sec, "welch.window_size_sec", &mut errors);
    if !w.overlap_sec.is_finite() || w.overlap_sec < 0.0 {
        errors.push(format!(
            "welch.overlap_sec = {} must be finite and >= 0",
            w.overlap_sec
        ));
    } else if w.overlap_sec >= w.window_size_sec {
        errors.push(format!(
            "welch.overlap_sec ({:.3}) must be < welch.window_size_sec ({:.3})",
            w.overlap_sec, w.window_size_sec
        ));
    }

    if config.vrs.resample_points < 2 {
        errors.push(format!(
            "vrs.resample_points = {} must be >= 2",
            config.vrs.resample_points
        ));
    }

    // Q below 1 is an overdamped system; legal but rarely intended
    if config.sdof.q.is_finite() && config.sdof.q > 0.0 && config.sdof.q < 1.0 {
        warnings.push(ValidationWarning {
            field: "sdof.q".to_string(),
            message: format!(
                "sdof.q = {:.3} is below 1 (damping ratio above 0.5)",
                config.sdof.q
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

fn check_positive(value: f64, name: &str, errors: &mut Vec<String>) {
    // NaN comparisons silently pass, catch them explicitly
    if !value.is_finite() {
        errors.push(format!("{name}: value must be finite (got {value})"));
    } else if value <= 0.0 {
        errors.push(format!("{name} = {value} must be > 0"));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpectralConfig;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("overlap_sce", "overlap_sec"), 2);
        assert_eq!(levenshtein("paralel", "parallel"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [sdof]
            q = 10.0
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert_eq!(keys, vec!["sdof".to_string(), "sdof.q".to_string()]);
    }

    #[test]
    fn test_suggest_none_when_far() {
        let known = known_config_keys();
        assert_eq!(suggest_correction("completely_unrelated", &known), None);
        assert_eq!(
            suggest_correction("sdof.qq", &known).as_deref(),
            Some("sdof.q")
        );
    }

    #[test]
    fn test_overlap_must_be_shorter_than_window() {
        let mut config = SpectralConfig::default();
        config.welch.overlap_sec = config.welch.window_size_sec;
        let (errors, _) = validate_ranges(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("welch.overlap_sec"));
    }

    #[test]
    fn test_nan_rejected() {
        let mut config = SpectralConfig::default();
        config.sdof.natural_frequency_hz = f64::NAN;
        let (errors, _) = validate_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("finite")));
    }

    #[test]
    fn test_low_q_warns_only() {
        let mut config = SpectralConfig::default();
        config.sdof.q = 0.4;
        let (errors, warnings) = validate_ranges(&config);
        assert!(errors.is_empty());
        assert_eq!(warnings.len(), 1);
    }
}
