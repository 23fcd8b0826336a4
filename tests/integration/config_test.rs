use airq::core::air_monitor::Measurement;
use airq::core::config::{Config, ProviderKind, ServiceKind};
use std::fs;
use tempfile::TempDir;

const CONFIG: &str = r#"{
    "name": "Balcony",
    "update_interval_seconds": 60,
    "update_history_seconds": 300,
    "history_filename": "history.csv",
    "sources": [
        { "id": "outdoor", "provider": "sensor.community", "sensor": "4711",
          "keys": ["temperature", "humidity"] },
        { "id": "indoor", "provider": "bme280", "i2cAddress": 118,
          "keys": ["temperature", "pressure"], "offsets": { "temperature": -0.8 } }
    ],
    "services": {
        "temperature": {
            "name": "Average",
            "temperature": { "sources": ["outdoor", "indoor"], "aggregate": "average" }
        }
    }
}"#;

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, CONFIG).unwrap();

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.name, "Balcony");
    assert_eq!(config.history_frequency(), 5);
    assert_eq!(config.sources[1].provider, ProviderKind::Bme280);
    assert_eq!(config.sources[1].i2c_address, Some(0x76));
    assert_eq!(
        config.source("indoor").unwrap().offsets.get(&Measurement::Temperature),
        Some(&-0.8)
    );
    assert!(config.service(ServiceKind::Humidity).is_none());
}

#[test]
fn test_load_missing_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let result = Config::load(Some(&temp_dir.path().join("missing.json")));
    assert!(result.is_err());
}

#[test]
fn test_load_rejects_unknown_source_reference() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, CONFIG.replace(r#"["outdoor", "indoor"]"#, r#"["outdoor", "garage"]"#))
        .unwrap();

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(format!("{:#}", err).contains("garage"));
}

#[test]
fn test_journal_path_uses_history_path() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::from_json_str(CONFIG).unwrap();
    config.history_path = Some(temp_dir.path().to_path_buf());

    assert_eq!(
        config.journal_path(),
        Some(temp_dir.path().join("history.csv"))
    );
}

#[test]
fn test_config_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.json");

    let config = Config::from_json_str(CONFIG).unwrap();
    config.save(&path).unwrap();
    let loaded = Config::load(Some(&path)).unwrap();

    assert_eq!(loaded.sources, config.sources);
    assert_eq!(loaded.services, config.services);
    assert_eq!(loaded.update_interval_seconds, 60);
}
