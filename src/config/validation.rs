//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use crate::types::ActivityType;

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
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Prefix under which operators may name their own formation categories
const OPEN_TABLE_PREFIX: &str = "weights.formation.";

/// Returns the complete set of valid dotted key paths for AssocConfig.
///
/// Maintained by hand to match the struct hierarchy in assoc_config.rs and
/// tables.rs. Entries of `weights.formation` are free-form and not listed.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [run]
        "run",
        "run.mode",
        "run.scoring",
        "run.batch_size",
        "run.backfill_batch_size",
        "run.in_memory",
        "run.types",
        "run.store_path",
        "run.data_dir",
        "run.timezone",
        // [radius_km]
        "radius_km",
        "radius_km.HF",
        "radius_km.HF.KSMMA",
        "radius_km.HF.Northern Montney",
        "radius_km.WD",
        "radius_km.WD.KSMMA",
        "radius_km.WD.Northern Montney",
        "radius_km.PROD",
        "radius_km.PROD.KSMMA",
        "radius_km.PROD.Northern Montney",
        // [windows]
        "windows",
        "windows.hf_lag_dateonly_days",
        "windows.hf_lag_datetime_hours",
        "windows.hf_tmax_days",
        "windows.wd_delay_months",
        "windows.wd_tmax_days",
        "windows.prod_tmax_days",
        "windows.prod_cut",
        // [weights]
        "weights",
        "weights.hf",
        "weights.wd",
        "weights.prod",
        "weights.formation",
        "weights.formation_fallback",
        // [kernel]
        "kernel",
        "kernel.shape",
        "kernel.earth_radius_km",
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
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist <= 3 {
            if let Some((_, best_dist)) = best {
                if dist < best_dist {
                    best = Some((k, dist));
                }
            } else {
                best = Some((k, dist));
            }
        }
    }
    best.map(|(k, _)| k.to_string())
}


// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns. Strictly-shaped tables
/// (`radius_km`) are still rejected by serde afterwards.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let found = walk_toml_keys(&value, "");
    let mut warnings = Vec::new();

    for key in &found {
        if key.starts_with(OPEN_TABLE_PREFIX) || known.contains(key.as_str()) {
            continue;
        }
        let suggestion = suggest_correction(key, &known);
        let message = format!("Unknown config key '{key}'");
        warnings.push(ValidationWarning {
            field: key.clone(),
            message,
            suggestion,
        });
    }

    warnings
}

// ============================================================================
// Range Validation
// ============================================================================

/// Radius above which a search is unlikely to mean anything for induced events (km)
const SUSPICIOUS_RADIUS_KM: f64 = 100.0;

/// Validate value ranges on a parsed AssocConfig.
///
/// Returns (errors, warnings): errors are values the geometry cannot work
/// with; warnings are legal but suspicious.
pub fn validate_ranges(config: &super::AssocConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // A spherical cap wider than half the circumference wraps onto itself
    let half_circumference = std::f64::consts::PI * config.kernel.earth_radius_km;
    for t in ActivityType::ALL {
        let radii = config.radius_km.for_type(t);
        let max = radii.max();
        if max >= half_circumference {
            errors.push(format!(
                "radius_km.{t} = {max:.1} km exceeds half the Earth's circumference"
            ));
        } else if max > SUSPICIOUS_RADIUS_KM {
            warnings.push(ValidationWarning {
                field: format!("radius_km.{t}"),
                message: format!("radius_km.{t} = {max:.1} km is unusually large"),
                suggestion: None,
            });
        }
    }

    let shape = config.kernel.shape;
    if shape.is_finite() && !(1.0..=10.0).contains(&shape) {
        warnings.push(ValidationWarning {
            field: "kernel.shape".to_string(),
            message: format!("kernel.shape = {shape:.2} is outside the typical range (1-10)"),
            suggestion: None,
        });
    }

    let w = &config.weights;
    if w.hf == 0.0 && w.wd == 0.0 && w.prod == 0.0 {
        warnings.push(ValidationWarning {
            field: "weights".to_string(),
            message: "all type weights are zero, every score will be 0".to_string(),
            suggestion: None,
        });
    }

    if config.run.batch_size > 1_000_000 {
        warnings.push(ValidationWarning {
            field: "run.batch_size".to_string(),
            message: format!(
                "run.batch_size = {} is very large; consider run.in_memory instead",
                config.run.batch_size
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
