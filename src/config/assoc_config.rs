//! Association configuration - every engine constant as an operator-tunable TOML value
//!
//! Each struct implements `Default` with the values the attribution study was
//! calibrated with, so running without a config file reproduces the reference
//! behaviour. A built config is never mutated: overrides produce a new value.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

use super::defaults::{
    DEFAULT_BACKFILL_BATCH_SIZE, DEFAULT_BATCH_SIZE, DEFAULT_DATA_DIR, DEFAULT_STORE_PATH,
    DEFAULT_TIMEZONE, EARTH_RADIUS_KM, KERNEL_SHAPE, MAX_DELAY_MONTHS, MAX_WINDOW_DAYS,
};
use super::tables::{RadiusTable, WeightConfig};
use crate::types::{ActivityType, ProcessingMode, ScoringMode};

/// Environment variable pointing at a config file
pub const CONFIG_ENV_VAR: &str = "EQ_ASSOC_CONFIG";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "assoc_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for an association run.
///
/// Load with `AssocConfig::load()` which searches:
/// 1. `$EQ_ASSOC_CONFIG` env var
/// 2. `./assoc_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssocConfig {
    /// Processing mode, batching, enabled types, storage location
    #[serde(default)]
    pub run: RunConfig,

    /// Search radius per activity type and region (km)
    #[serde(default)]
    pub radius_km: RadiusTable,

    /// Activity time windows
    #[serde(default)]
    pub windows: WindowConfig,

    /// Score weights
    #[serde(default)]
    pub weights: WeightConfig,

    /// Decay kernel constants
    #[serde(default)]
    pub kernel: KernelConfig,
}

impl AssocConfig {
    /// Load configuration using the standard search order:
    /// 1. `$EQ_ASSOC_CONFIG` environment variable
    /// 2. `./assoc_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded association config from {CONFIG_ENV_VAR}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV_VAR}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded association config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        // Unknown keys only warn; serde decides what is fatal
        for w in super::validation::validate_unknown_keys(&contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Apply a sparse set of overrides, returning a new validated config.
    ///
    /// Unset fields keep the base value; `self` is left untouched.
    pub fn with_overrides(&self, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut next = self.clone();
        let o = overrides;

        if let Some(v) = o.mode { next.run.mode = v; }
        if let Some(v) = o.scoring { next.run.scoring = v; }
        if let Some(v) = o.batch_size { next.run.batch_size = v; }
        if let Some(v) = o.in_memory { next.run.in_memory = v; }
        if let Some(v) = &o.types { next.run.types = v.clone(); }
        if let Some(v) = &o.store_path { next.run.store_path = v.clone(); }
        if let Some(v) = &o.data_dir { next.run.data_dir = v.clone(); }
        if let Some(v) = o.radius_km { next.radius_km = v; }
        if let Some(v) = o.hf_lag_dateonly_days { next.windows.hf_lag_dateonly_days = v; }
        if let Some(v) = o.hf_lag_datetime_hours { next.windows.hf_lag_datetime_hours = v; }
        if let Some(v) = o.hf_tmax_days { next.windows.hf_tmax_days = v; }
        if let Some(v) = o.wd_delay_months { next.windows.wd_delay_months = v; }
        if let Some(v) = o.wd_tmax_days { next.windows.wd_tmax_days = v; }
        if let Some(v) = o.prod_tmax_days { next.windows.prod_tmax_days = v; }
        if let Some(v) = o.kernel_shape { next.kernel.shape = v; }

        next.validate()?;
        Ok(next)
    }

    /// Whether an activity type takes part in this run
    pub fn type_enabled(&self, activity_type: ActivityType) -> bool {
        self.run.types.contains(&activity_type)
    }

    /// Validate every section for internal consistency.
    ///
    /// Rules:
    /// - Batch sizes must be > 0 and at least one activity type enabled
    /// - Every radius must be positive and finite
    /// - Weights must be finite and non-negative, with a valid fallback formation
    /// - Tmax values must be positive; lags must be non-negative
    /// - Kernel shape and Earth radius must be positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let r = &self.run;
        if r.batch_size == 0 {
            errors.push("run.batch_size must be > 0".to_string());
        }
        if r.backfill_batch_size == 0 {
            errors.push("run.backfill_batch_size must be > 0".to_string());
        }
        if r.types.is_empty() {
            errors.push("run.types must enable at least one activity type".to_string());
        }
        for (i, t) in r.types.iter().enumerate() {
            if r.types[..i].contains(t) {
                errors.push(format!("run.types lists {t} more than once"));
            }
        }
        if chrono_tz::Tz::from_str(&r.timezone).is_err() {
            errors.push(format!("run.timezone '{}' is not a known IANA time zone", r.timezone));
        }

        self.radius_km.check(&mut errors);
        self.weights.check(&mut errors);

        let w = &self.windows;
        for (name, days) in [
            ("hf_tmax_days", w.hf_tmax_days),
            ("wd_tmax_days", w.wd_tmax_days),
            ("prod_tmax_days", w.prod_tmax_days),
        ] {
            if days <= 0 || days > MAX_WINDOW_DAYS {
                errors.push(format!("windows.{name} must be in 1..={MAX_WINDOW_DAYS} (got {days})"));
            }
        }
        if !(0..=MAX_WINDOW_DAYS).contains(&w.hf_lag_dateonly_days) {
            errors.push(format!(
                "windows.hf_lag_dateonly_days must be in 0..={MAX_WINDOW_DAYS} (got {})",
                w.hf_lag_dateonly_days
            ));
        }
        if !(0..=MAX_WINDOW_DAYS * 24).contains(&w.hf_lag_datetime_hours) {
            errors.push(format!(
                "windows.hf_lag_datetime_hours must be in 0..={} (got {})",
                MAX_WINDOW_DAYS * 24,
                w.hf_lag_datetime_hours
            ));
        }
        if w.wd_delay_months > MAX_DELAY_MONTHS {
            errors.push(format!(
                "windows.wd_delay_months must be <= {MAX_DELAY_MONTHS} (got {})",
                w.wd_delay_months
            ));
        }

        let k = &self.kernel;
        if !k.shape.is_finite() || k.shape <= 0.0 {
            errors.push(format!("kernel.shape must be a positive finite number (got {})", k.shape));
        }
        if !k.earth_radius_km.is_finite() || k.earth_radius_km <= 0.0 {
            errors.push(format!(
                "kernel.earth_radius_km must be a positive finite number (got {})",
                k.earth_radius_km
            ));
        }

        let (range_errors, range_warnings) = super::validation::validate_ranges(self);
        errors.extend(range_errors);
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
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Overrides
// ============================================================================

/// Sparse per-run overrides (CLI flags, exploratory runs).
///
/// `None` means "keep the base value".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub mode: Option<ProcessingMode>,
    pub scoring: Option<ScoringMode>,
    pub batch_size: Option<usize>,
    pub in_memory: Option<bool>,
    pub types: Option<Vec<ActivityType>>,
    pub store_path: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub radius_km: Option<RadiusTable>,
    pub hf_lag_dateonly_days: Option<i64>,
    pub hf_lag_datetime_hours: Option<i64>,
    pub hf_tmax_days: Option<i64>,
    pub wd_delay_months: Option<u32>,
    pub wd_tmax_days: Option<i64>,
    pub prod_tmax_days: Option<i64>,
    pub kernel_shape: Option<f64>,
}

// ============================================================================
// Run
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub mode: ProcessingMode,

    #[serde(default)]
    pub scoring: ScoringMode,

    /// Events per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Events per backfill chunk
    #[serde(default = "default_backfill_batch_size")]
    pub backfill_batch_size: usize,

    /// Accumulate all batches and write once at the end
    #[serde(default)]
    pub in_memory: bool,

    /// Enabled activity types
    #[serde(default = "default_types")]
    pub types: Vec<ActivityType>,

    /// sled database holding the link and summary tables
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Directory of source CSV tables
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// IANA zone that catalogue UTC times are converted into
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_batch_size() -> usize { DEFAULT_BATCH_SIZE }
fn default_backfill_batch_size() -> usize { DEFAULT_BACKFILL_BATCH_SIZE }
fn default_types() -> Vec<ActivityType> { ActivityType::ALL.to_vec() }
fn default_store_path() -> PathBuf { PathBuf::from(DEFAULT_STORE_PATH) }
fn default_data_dir() -> PathBuf { PathBuf::from(DEFAULT_DATA_DIR) }
fn default_timezone() -> String { DEFAULT_TIMEZONE.to_string() }

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: ProcessingMode::default(),
            scoring: ScoringMode::default(),
            batch_size: default_batch_size(),
            backfill_batch_size: default_backfill_batch_size(),
            in_memory: false,
            types: default_types(),
            store_path: default_store_path(),
            data_dir: default_data_dir(),
            timezone: default_timezone(),
        }
    }
}

// ============================================================================
// Time windows
// ============================================================================

/// Window lengths and lags used to build activity windows and decay constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Lag added to date-only HF stage records (days)
    #[serde(default = "default_hf_lag_dateonly_days")]
    pub hf_lag_dateonly_days: i64,

    /// Lag added to HF stage records with a precise time (hours)
    #[serde(default)]
    pub hf_lag_datetime_hours: i64,

    /// HF stage presence tail (days)
    #[serde(default = "default_hf_tmax_days")]
    pub hf_tmax_days: i64,

    /// Delayed onset of pressure effects for disposal (calendar months)
    #[serde(default = "default_wd_delay_months")]
    pub wd_delay_months: u32,

    #[serde(default = "default_wd_tmax_days")]
    pub wd_tmax_days: i64,

    /// Decay horizon for production (its window itself is open-ended)
    #[serde(default = "default_prod_tmax_days")]
    pub prod_tmax_days: i64,

    /// Production wells whose status date precedes this are ignored
    #[serde(default = "default_prod_cut")]
    pub prod_cut: NaiveDate,
}

fn default_hf_lag_dateonly_days() -> i64 { 1 }
fn default_hf_tmax_days() -> i64 { 744 }
fn default_wd_delay_months() -> u32 { 1 }
fn default_wd_tmax_days() -> i64 { 365 }
fn default_prod_tmax_days() -> i64 { 365 * 2 }
fn default_prod_cut() -> NaiveDate {
    NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or_default()
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            hf_lag_dateonly_days: default_hf_lag_dateonly_days(),
            hf_lag_datetime_hours: 0,
            hf_tmax_days: default_hf_tmax_days(),
            wd_delay_months: default_wd_delay_months(),
            wd_tmax_days: default_wd_tmax_days(),
            prod_tmax_days: default_prod_tmax_days(),
            prod_cut: default_prod_cut(),
        }
    }
}

impl WindowConfig {
    /// Maximum meaningful window length for a type (days)
    pub const fn tmax_days(&self, activity_type: ActivityType) -> i64 {
        match activity_type {
            ActivityType::Hf => self.hf_tmax_days,
            ActivityType::Wd => self.wd_tmax_days,
            ActivityType::Prod => self.prod_tmax_days,
        }
    }
}

// ============================================================================
// Kernel
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Decay shape constant (sigma = radius / shape, tau = Tmax / shape)
    #[serde(default = "default_kernel_shape")]
    pub shape: f64,

    #[serde(default = "default_earth_radius_km")]
    pub earth_radius_km: f64,
}

fn default_kernel_shape() -> f64 { KERNEL_SHAPE }
fn default_earth_radius_km() -> f64 { EARTH_RADIUS_KM }

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            shape: default_kernel_shape(),
            earth_radius_km: default_earth_radius_km(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Region;

    #[test]
    fn test_default_config_validates() {
        let config = AssocConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: AssocConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config, AssocConfig::default());
        assert_eq!(config.windows.hf_tmax_days, 744);
        assert_eq!(config.weights.hf, 0.9);
        assert_eq!(config.kernel.shape, 2.45);
        assert_eq!(config.run.batch_size, 5_000);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[run]
mode = "full"
types = ["HF", "WD"]

[radius_km.WD]
KSMMA = 4.0
"Northern Montney" = 8.0

[windows]
wd_tmax_days = 400
"#;
        let config: AssocConfig = toml::from_str(toml_str).expect("partial TOML should parse");
        assert_eq!(config.run.mode, ProcessingMode::Full);
        assert_eq!(config.run.types, vec![ActivityType::Hf, ActivityType::Wd]);
        assert_eq!(config.radius_km.get(ActivityType::Wd, Region::Ksmma), 4.0);
        assert_eq!(config.windows.wd_tmax_days, 400);
        // Untouched values keep their defaults
        assert_eq!(config.radius_km.get(ActivityType::Hf, Region::Ksmma), 1.0);
        assert_eq!(config.windows.hf_tmax_days, 744);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_catches_bad_values() {
        let mut config = AssocConfig::default();
        config.run.batch_size = 0;
        config.radius_km.hf.ksmma = -1.0;
        config.windows.wd_tmax_days = 0;
        config.kernel.shape = f64::NAN;
        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("invalid config must fail validation");
        };
        assert!(errors.iter().any(|e| e.contains("batch_size")));
        assert!(errors.iter().any(|e| e.contains("radius_km.HF")));
        assert!(errors.iter().any(|e| e.contains("wd_tmax_days")));
        assert!(errors.iter().any(|e| e.contains("kernel.shape")));
    }

    #[test]
    fn test_window_lengths_are_bounded() {
        let mut config = AssocConfig::default();
        config.windows.hf_tmax_days = 1_000_000_000_000;
        config.windows.hf_lag_datetime_hours = i64::MAX;
        config.windows.wd_delay_months = 50_000;
        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("oversized windows must fail validation");
        };
        assert!(errors.iter().any(|e| e.contains("hf_tmax_days")));
        assert!(errors.iter().any(|e| e.contains("hf_lag_datetime_hours")));
        assert!(errors.iter().any(|e| e.contains("wd_delay_months")));

        let mut edge = AssocConfig::default();
        edge.windows.prod_tmax_days = MAX_WINDOW_DAYS;
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_duplicate_types_rejected() {
        let mut config = AssocConfig::default();
        config.run.types = vec![ActivityType::Hf, ActivityType::Hf];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_produce_new_value() {
        let base = AssocConfig::default();
        let overrides = ConfigOverrides {
            hf_tmax_days: Some(180),
            radius_km: Some(RadiusTable::uniform(20.0)),
            mode: Some(ProcessingMode::Full),
            ..Default::default()
        };
        let next = base.with_overrides(&overrides).expect("overrides are valid");
        assert_eq!(next.windows.hf_tmax_days, 180);
        assert_eq!(next.radius_km.get(ActivityType::Prod, Region::NorthernMontney), 20.0);
        assert_eq!(next.run.mode, ProcessingMode::Full);
        // Base untouched, unset fields carried over
        assert_eq!(base.windows.hf_tmax_days, 744);
        assert_eq!(next.windows.wd_tmax_days, base.windows.wd_tmax_days);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let overrides = ConfigOverrides {
            batch_size: Some(0),
            ..Default::default()
        };
        assert!(AssocConfig::default().with_overrides(&overrides).is_err());
    }

    #[test]
    fn test_roundtrip_toml() {
        let original = AssocConfig::default();
        let toml_str = original.to_toml().expect("serialization should work");
        let roundtripped: AssocConfig = toml::from_str(&toml_str).expect("deserialization should work");
        assert_eq!(original, roundtripped);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assoc_config.toml");
        std::fs::write(&path, "[run]\nbatch_size = 250\n").unwrap();
        let config = AssocConfig::load_from_file(&path).unwrap();
        assert_eq!(config.run.batch_size, 250);
    }
}
