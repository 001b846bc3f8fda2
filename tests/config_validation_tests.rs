//! Config Validation Tests
//!
//! Typo detection, range checks and override handling for `assoc_config.toml`,
//! exercised independently from the pipeline.

use eq_assoc::config::validation::{
    known_config_keys, suggest_correction, validate_ranges, validate_unknown_keys,
};
use eq_assoc::config::{ConfigError, RadiusTable};
use eq_assoc::{ActivityType, AssocConfig, ConfigOverrides, ProcessingMode, Region};

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_window_key_warns_with_suggestion() {
    let toml_str = r#"
[windows]
hf_tmax_dayz = 700
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("hf_tmax_dayz"));
    assert_eq!(warnings[0].suggestion.as_deref(), Some("windows.hf_tmax_days"));
}

#[test]
fn custom_formation_categories_are_not_typos() {
    let toml_str = r#"
[weights.formation]
"Lower Middle Montney" = 0.8
"Upper Montney" = 0.3
Other = 0.2
"#;
    assert!(validate_unknown_keys(toml_str).is_empty());
}

#[test]
fn region_names_with_spaces_are_known() {
    let known = known_config_keys();
    assert!(known.contains("radius_km.WD.Northern Montney"));
    assert!(validate_unknown_keys(
        r#"
[radius_km.WD]
KSMMA = 4.0
"Northern Montney" = 8.0
"#
    )
    .is_empty());
}

#[test]
fn far_off_key_has_no_suggestion() {
    let known = known_config_keys();
    assert_eq!(suggest_correction("completely.unrelated.thing", &known), None);
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn default_config_has_no_range_issues() {
    let (errors, warnings) = validate_ranges(&AssocConfig::default());
    assert!(errors.is_empty(), "{errors:?}");
    assert!(warnings.is_empty(), "{warnings:?}");
}

#[test]
fn huge_radius_warns_but_validates() {
    let mut config = AssocConfig::default();
    config.radius_km = RadiusTable::uniform(150.0);
    let (errors, warnings) = validate_ranges(&config);
    assert!(errors.is_empty());
    assert!(!warnings.is_empty());
    assert!(config.validate().is_ok());
}

#[test]
fn radius_beyond_half_circumference_is_rejected() {
    let mut config = AssocConfig::default();
    config.radius_km = RadiusTable::uniform(25_000.0);
    assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
}

#[test]
fn negative_weight_is_rejected() {
    let mut config = AssocConfig::default();
    config.weights.wd = -0.1;
    let Err(ConfigError::Validation(errors)) = config.validate() else {
        panic!("expected validation failure");
    };
    assert!(errors.iter().any(|e| e.contains("weights.wd")));
}

// ============================================================================
// Loading and Overrides
// ============================================================================

#[test]
fn file_with_partial_sections_keeps_other_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assoc_config.toml");
    std::fs::write(
        &path,
        r#"
[run]
mode = "full"
types = ["HF", "WD"]

[radius_km.HF]
KSMMA = 2.0
"Northern Montney" = 4.0
"#,
    )
    .unwrap();

    let config = AssocConfig::load_from_file(&path).unwrap();
    assert_eq!(config.run.mode, ProcessingMode::Full);
    assert!(!config.type_enabled(ActivityType::Prod));
    assert_eq!(config.radius_km.get(ActivityType::Hf, Region::Ksmma), 2.0);
    assert_eq!(config.radius_km.get(ActivityType::Wd, Region::Ksmma), 5.0);
    assert_eq!(config.windows.hf_tmax_days, 744);
}

#[test]
fn malformed_file_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[run\nmode = ").unwrap();
    let err = AssocConfig::load_from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(ref p, _) if p == &path));
}

#[test]
fn overrides_do_not_touch_the_base() {
    let base = AssocConfig::default();
    let overrides = ConfigOverrides {
        radius_km: Some(RadiusTable::uniform(20.0)),
        wd_delay_months: Some(3),
        ..ConfigOverrides::default()
    };
    let next = base.with_overrides(&overrides).unwrap();
    assert_eq!(next.radius_km.get(ActivityType::Prod, Region::NorthernMontney), 20.0);
    assert_eq!(next.windows.wd_delay_months, 3);
    assert_eq!(base, AssocConfig::default());
}

#[test]
fn empty_type_list_override_is_rejected() {
    let overrides = ConfigOverrides { types: Some(Vec::new()), ..ConfigOverrides::default() };
    assert!(AssocConfig::default().with_overrides(&overrides).is_err());
}
