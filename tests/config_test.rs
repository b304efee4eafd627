//! Configuration import/export and validation

use notation_capture::config::{
    CaptureConfig, ConfigError, ConfigManager, ErrorRecoveryMode, KeyMappingSetting, PreviewSize, Theme,
};
use notation_capture::shortcuts::{KeyMappings, MappingCategory};
use notation_capture::DurationValue;
use serde_json::json;

#[test]
fn test_json_round_trip() {
    let mut manager = ConfigManager::new();
    manager
        .update(json!({
            "rendering": { "previewSize": "large", "theme": "dark" },
            "behavior": { "autoCommitDelayMs": 2500, "errorRecoveryMode": "strict" }
        }))
        .unwrap();

    let exported = manager.export_config().unwrap();
    let mut other = ConfigManager::new();
    other.import_config(&exported).unwrap();

    assert_eq!(other.config(), manager.config());
    assert_eq!(other.config().rendering.preview_size, PreviewSize::Large);
    assert_eq!(other.config().behavior.auto_commit_delay_ms, Some(2500));
    assert_eq!(other.config().behavior.error_recovery_mode, ErrorRecoveryMode::Strict);
}

#[test]
fn test_yaml_round_trip_with_custom_mappings() {
    let mut manager = ConfigManager::new();
    let mut mappings = KeyMappings::default();
    mappings.set(MappingCategory::Controls, "Enter", "commit");
    manager.set_key_mappings(mappings.clone());

    let yaml = manager.export_yaml().unwrap();
    let mut other = ConfigManager::new();
    other.import_yaml(&yaml).unwrap();

    assert_eq!(other.key_mappings(), mappings);
    assert_eq!(other.config(), manager.config());
}

#[test]
fn test_partial_document_takes_defaults() {
    let config = CaptureConfig::from_json(r#"{ "behavior": { "defaultDuration": "eighth" } }"#).unwrap();
    assert_eq!(config.behavior.default_duration, DurationValue::Eighth);
    assert_eq!(config.behavior.default_octave, 4);
    assert_eq!(config.rendering.theme, Theme::Light);
    assert_eq!(config.key_mappings, KeyMappingSetting::default());
}

#[test]
fn test_invalid_imports_leave_config_intact() {
    let mut manager = ConfigManager::with_overrides(json!({ "behavior": { "defaultOctave": 5 } })).unwrap();
    let before = manager.config().clone();

    let rejected = [
        "not json",
        r#"{ "behavior": { "defaultOctave": 9 } }"#,
        r#"{ "behavior": { "undoHistorySize": 0 } }"#,
        r#"{ "behavior": { "defaultDuration": "breve" } }"#,
        r#"{ "behavior": { "errorRecoveryMode": "panic" } }"#,
        r#"{ "rendering": { "theme": "sepia" } }"#,
        r#"{ "rendering": { "autoScroll": "yes" } }"#,
        r#"{ "keyMappings": "qwerty" }"#,
        r#"{ "keyMappings": { "pitches": { "c": "C" } } }"#,
    ];
    for text in rejected {
        assert!(manager.import_config(text).is_err(), "{} should be rejected", text);
        assert_eq!(manager.config(), &before);
    }

    assert!(matches!(manager.import_config("{"), Err(ConfigError::Parse(_))));
    assert!(manager.import_yaml("behavior: [1, 2").is_err());
    assert_eq!(manager.config(), &before);
}

#[test]
fn test_reset_restores_defaults() {
    let mut manager = ConfigManager::with_overrides(json!({ "rendering": { "highlightCurrent": false } })).unwrap();
    assert!(!manager.config().rendering.highlight_current);
    manager.reset();
    assert_eq!(manager.config(), &CaptureConfig::default());
}

#[test]
fn test_presets_switch_active_mappings() {
    let mut manager = ConfigManager::new();
    let mut solfege = KeyMappings::default();
    solfege.set(MappingCategory::Pitches, "h", "B");
    manager.save_preset("solfege", solfege.clone());
    manager.save_preset("stock", KeyMappings::default());

    assert_eq!(manager.preset_names(), vec!["solfege".to_string(), "stock".to_string()]);

    manager.load_preset("solfege").unwrap();
    assert_eq!(manager.key_mappings(), solfege);
    manager.load_preset("stock").unwrap();
    assert_eq!(manager.key_mappings(), KeyMappings::default());

    assert!(!manager.delete_preset("missing"));
    assert!(matches!(manager.load_preset("missing"), Err(ConfigError::UnknownPreset(_))));
}
