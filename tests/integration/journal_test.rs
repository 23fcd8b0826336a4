use airq::core::air_monitor::{CycleValues, Journal, Measurement, ServiceValues};
use airq::core::config::ServiceKind;
use chrono::{Local, TimeZone};
use std::fs;
use tempfile::TempDir;

fn values(temperature: f64) -> CycleValues {
    let mut service = ServiceValues::default();
    service.values.insert(Measurement::Temperature, Some(temperature));
    service.values.insert(Measurement::Pressure, None);
    let mut values = CycleValues::default();
    values.services.insert(ServiceKind::Temperature, service);
    values
}

fn header_count(content: &str) -> usize {
    content.lines().filter(|l| l.starts_with("date;")).count()
}

#[tokio::test]
async fn test_first_append_writes_header_once() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("history.csv");
    let journal = Journal::new(&path);
    let at = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

    journal.append(&values(20.5), at).await.unwrap();
    journal.append(&values(21.0), at).await.unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(header_count(&content), 1);
    assert_eq!(content.matches("\r\n").count(), 3);
    assert!(content.contains("2024/01/02;03:04:05;20.5;;;;;;;;;;\r\n"));
    assert!(content.ends_with("2024/01/02;03:04:05;21;;;;;;;;;;\r\n"));
}

#[tokio::test]
async fn test_reopened_journal_keeps_existing_header() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("history.csv");
    let at = Local.with_ymd_and_hms(2024, 6, 30, 23, 59, 59).unwrap();

    Journal::new(&path).append(&values(15.0), at).await.unwrap();
    // A later run opens the same file again
    Journal::new(&path).append(&values(16.0), at).await.unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(header_count(&content), 1);
    assert_eq!(content.lines().count(), 3);
}

#[tokio::test]
async fn test_existing_file_without_header_is_not_rewritten() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("history.csv");
    fs::write(&path, "2023/12/31;12:00:00;10;;;;;;;;;;\r\n").unwrap();
    let at = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    Journal::new(&path).append(&values(11.0), at).await.unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(header_count(&content), 0);
    assert!(content.starts_with("2023/12/31"));
}
