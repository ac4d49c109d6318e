//! File round-trip tests for conversion settings

use fcodekit_settings::{Config, ConfigError, OutputFormat};
use tempfile::tempdir;

#[test]
fn test_toml_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("g2f.toml");

    let mut config = Config::new();
    config.output.format = OutputFormat::V1;
    config.output.head_type = "EXTRUDER".to_string();
    config.estimator.acc_x = 3000.0;
    config.push_metadata_entry("AUTHOR=flux").unwrap();
    config.save_to_file(&path).unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded.output.format, OutputFormat::V1);
    assert_eq!(loaded.output.head_type, "EXTRUDER");
    assert_eq!(loaded.estimator.acc_x, 3000.0);
    assert_eq!(loaded.estimator.acc_y, 2000.0);
    assert_eq!(loaded.metadata, config.metadata);
}

#[test]
fn test_json_partial_file_uses_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("g2f.json");
    std::fs::write(&path, r#"{ "estimator": { "z_speed": 5.0 } }"#).unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded.estimator.z_speed, 5.0);
    assert_eq!(loaded.estimator.acc_x, 4000.0);
    assert_eq!(loaded.output.format, OutputFormat::V2);
    assert!(loaded.metadata.is_empty());
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("g2f.toml");
    std::fs::write(&path, "[estimator]\nacc_x = -1.0\n").unwrap();

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ValueOutOfRange { .. }));
}

#[test]
fn test_unknown_extension_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("g2f.yaml");
    std::fs::write(&path, "output: {}").unwrap();

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    assert!(Config::new().save_to_file(&path).is_err());
}
