use airq::core::air_monitor::{
    AirQuality, Aggregator, BoxedProvider, Engine, HistorySampler, HistoryStore, Measurement,
    Orchestrator, Pipeline, Provider, ProviderError, Reading, RollingHistory,
};
use airq::core::config::{Config, ProviderKind, ServiceKind, SourceConfig};
use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Returns the same reading on every poll
struct FixedProvider(Reading);

#[async_trait]
impl Provider for FixedProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Unknown("fixed".to_string())
    }

    async fn poll(&mut self, _source: &SourceConfig) -> Result<Reading, ProviderError> {
        Ok(self.0.clone())
    }
}

/// Always fails to poll
struct BrokenProvider;

#[async_trait]
impl Provider for BrokenProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Unknown("broken".to_string())
    }

    async fn poll(&mut self, _source: &SourceConfig) -> Result<Reading, ProviderError> {
        Err(ProviderError::Transport("connection refused".to_string()))
    }
}

const SERVICES: &str = r#"{
    "sources": [
        { "id": "outdoor", "provider": "sensor.community", "sensor": "1",
          "keys": ["temperature", "humidity"] },
        { "id": "city", "provider": "waqi.info", "city": "x", "token": "t",
          "keys": ["no2", "pm10", "o3", "pm2.5"] }
    ],
    "services": {
        "temperature": { "temperature": "outdoor" },
        "humidity": { "humidity": "outdoor" },
        "airquality": { "no2": "city", "pm10": "city", "o3": "city", "pm2.5": "city" }
    }
}"#;

fn reading(values: &[(Measurement, f64)]) -> Reading {
    values.iter().copied().collect()
}

fn build(config: &Config, providers: Vec<BoxedProvider>, history: Arc<RollingHistory>) -> Engine {
    let sources = config
        .sources
        .iter()
        .cloned()
        .zip(providers.into_iter().map(Some))
        .collect();
    let pipeline = Pipeline::new(
        Orchestrator::new(sources, None),
        Aggregator::new(config.services.clone()),
        HistorySampler::new(config.history_frequency(), true),
        None,
    );
    Engine::from_parts(pipeline, history, config.update_interval())
}

#[tokio::test]
async fn test_fair_air_quality_scenario() {
    let config = Config::from_json_str(SERVICES).unwrap();
    let providers: Vec<BoxedProvider> = vec![
        Box::new(FixedProvider(reading(&[
            (Measurement::Temperature, 21.3),
            (Measurement::Humidity, 55.0),
        ]))),
        Box::new(FixedProvider(reading(&[
            (Measurement::No2, 120.0),
            (Measurement::Pm10, 30.0),
            (Measurement::O3, 90.0),
            (Measurement::Pm25, 20.0),
        ]))),
    ];
    let engine = build(&config, providers, Arc::new(RollingHistory::new()));

    let state = engine.startup().await;

    assert!(!state.error);
    assert_eq!(state.values.value(Measurement::Temperature), Some(21.3));
    assert_eq!(state.values.value(Measurement::Humidity), Some(55.0));
    assert_eq!(state.values.air_quality(), Some(AirQuality::Fair));
    assert_eq!(engine.current_values().cycle, 1);
}

#[tokio::test]
async fn test_failing_source_faults_every_service() {
    let config = Config::from_json_str(SERVICES).unwrap();
    let providers: Vec<BoxedProvider> = vec![
        Box::new(BrokenProvider),
        Box::new(FixedProvider(reading(&[(Measurement::Pm10, 10.0)]))),
    ];
    let engine = build(&config, providers, Arc::new(RollingHistory::new()));

    let state = engine.startup().await;

    assert!(state.error);
    assert_eq!(state.failed_sources, vec!["outdoor"]);
    assert!(state.values.services.values().all(|s| s.fault));
    assert_eq!(state.values.value(Measurement::Temperature), None);
    assert_eq!(state.values.air_quality(), Some(AirQuality::Excellent));
}

#[tokio::test]
async fn test_history_decimation_over_eleven_cycles() {
    let mut config = Config::from_json_str(SERVICES).unwrap();
    config.update_interval_seconds = 120;
    config.update_history_seconds = 600;
    let history = Arc::new(RollingHistory::new());
    let providers: Vec<BoxedProvider> = vec![
        Box::new(FixedProvider(reading(&[(Measurement::Temperature, 18.0)]))),
        Box::new(FixedProvider(Reading::new())),
    ];
    let engine = build(&config, providers, history.clone());

    engine.startup().await;
    for _ in 0..10 {
        engine.tick().await;
    }

    assert_eq!(engine.cycles(), 11);
    let entries = history.entries();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.temperature == Some(18.0)));
    assert!(entries.iter().all(|e| e.humidity.is_none()));
}

fn fake_bme280(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("name"), "bme280\n").unwrap();
    fs::write(dir.join("in_temp_input"), "22500\n").unwrap();
    fs::write(dir.join("in_humidityrelative_input"), "40000\n").unwrap();
    fs::write(dir.join("in_pressure_input"), "100\n").unwrap();
}

#[tokio::test]
async fn test_engine_from_config_writes_journal() {
    let temp_dir = TempDir::new().unwrap();
    let device = temp_dir.path().join("iio:device0");
    fake_bme280(&device);

    let config = Config::from_json_str(&format!(
        r#"{{
            "update_interval_seconds": 60,
            "update_history_seconds": 60,
            "history_path": {history:?},
            "history_filename": "history.csv",
            "sources": [
                {{ "id": "indoor", "provider": "bme280", "device_path": {device:?},
                   "keys": ["temperature", "humidity", "pressure"],
                   "offsets": {{ "temperature": -0.5 }} }}
            ],
            "services": {{
                "temperature": {{ "temperature": "indoor", "pressure": "indoor" }},
                "humidity": {{ "humidity": "indoor" }}
            }}
        }}"#,
        history = temp_dir.path().join("journal").display().to_string(),
        device = device.display().to_string(),
    ))
    .unwrap();

    let engine = Engine::new(&config).unwrap();
    let state = engine.startup().await;
    engine.tick().await;

    assert!(!state.error);
    assert_eq!(state.values.value(Measurement::Temperature), Some(22.0));
    assert_eq!(state.values.value(Measurement::Humidity), Some(40.0));
    assert!(state.values.service(ServiceKind::AirQuality).is_none());

    let journal = fs::read_to_string(temp_dir.path().join("journal").join("history.csv")).unwrap();
    let lines: Vec<&str> = journal.split("\r\n").filter(|l| !l.is_empty()).collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("date;time;temperature;humidity;pressure"));
    assert!(lines[1].contains(";22;40;1000;"));
}

#[tokio::test]
async fn test_custom_history_store_receives_entries() {
    #[derive(Default)]
    struct Counting(parking_lot::Mutex<usize>);

    impl HistoryStore for Counting {
        fn add_entry(&self, _entry: airq::core::air_monitor::HistoryEntry) {
            *self.0.lock() += 1;
        }
    }

    let config = Config::from_json_str(SERVICES).unwrap();
    let store = Arc::new(Counting::default());
    let pipeline = Pipeline::new(
        Orchestrator::new(
            config.sources.iter().cloned().map(|s| (s, None)).collect(),
            None,
        ),
        Aggregator::new(config.services.clone()),
        HistorySampler::new(1, true),
        None,
    );
    let engine = Engine::from_parts(pipeline, store.clone(), Duration::from_secs(60));

    engine.startup().await;
    engine.tick().await;

    assert_eq!(*store.0.lock(), 2);
}
