//! Tests for configuration loading, saving and validation

use landmark_collector::config::{Config, FileFormat, EXAMPLE_CONFIG};
use std::path::PathBuf;

#[test]
fn test_load_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, EXAMPLE_CONFIG).unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.data_path, PathBuf::from("MP_Data"));
    assert_eq!(config.no_sequences, 30);
    assert_eq!(config.sequence_length, 30);
    assert_eq!(config.sequence_range(), 0..30);
    assert_eq!(config.frames_per_session(), 900);
}

#[test]
fn test_yaml_round_trip_keeps_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");

    let mut config = Config::from_json(EXAMPLE_CONFIG).unwrap();
    config.file_format = FileFormat::Pickle;
    config.start_folder = 30;
    config.save_images = true;
    config.timing.countdown_seconds = 5;
    config.to_file(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.file_format, FileFormat::Pickle);
    assert_eq!(loaded.sequence_range(), 30..60);
    assert!(loaded.save_images);
    assert_eq!(loaded.timing.countdown_seconds, 5);
}

#[test]
fn test_classic_config_keys_only() {
    // A configuration with just the collector's classic keys
    let json = r#"{
        "data_path": "data",
        "actions": ["hello", "thanks"],
        "no_sequences": 10,
        "sequence_length": 20,
        "start_folder": 3,
        "camera_index": 1,
        "min_detection_confidence": 0.6,
        "min_tracking_confidence": 0.4,
        "file_format": "pickle",
        "save_images": true
    }"#;

    let config = Config::from_json(json).unwrap();
    config.validate().unwrap();
    assert_eq!(config.camera_index, 1);
    assert_eq!(config.file_format.extension(), "pkl");
    assert_eq!(config.cue_sound, Some(PathBuf::from("note.wav")));
    assert!(config.video_file.is_none());
}

#[test]
fn test_validation_rejects_bad_values() {
    let valid = Config::from_json(EXAMPLE_CONFIG).unwrap();

    let mut config = valid.clone();
    config.min_detection_confidence = 1.5;
    assert!(config.validate().is_err());

    let mut config = valid.clone();
    config.sequence_length = 0;
    assert!(config.validate().is_err());

    let mut config = valid.clone();
    config.actions.clear();
    assert!(config.validate().is_err());

    let mut config = valid;
    config.actions.push("a/b".to_string());
    assert!(config.validate().is_err());
}

#[test]
fn test_unknown_format_value_falls_back_to_npy() {
    let config = Config::from_json(r#"{"file_format": "csv"}"#).unwrap();
    assert_eq!(config.file_format, FileFormat::Npy);

    let config = Config::from_yaml("file_format: pickle\n").unwrap();
    assert_eq!(config.file_format, FileFormat::Pickle);
}

#[test]
fn test_huge_start_folder_fails_validation() {
    let mut config = Config::from_json(EXAMPLE_CONFIG).unwrap();
    config.start_folder = usize::MAX;
    assert!(config.validate().is_err());
}

#[test]
fn test_unsupported_extension_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "data_path = 'x'").unwrap();
    assert!(Config::from_file(&path).is_err());
}
