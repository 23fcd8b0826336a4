//! Append-only, semicolon separated journal of history samples.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::aggregator::CycleValues;
use super::reading::Measurement;
use crate::error::{AirqError, Result};

const LINE_END: &str = "\r\n";

pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header() -> String {
        let mut columns = vec!["date", "time"];
        columns.extend(Measurement::ALL.iter().map(|m| column_name(*m)));
        columns.join(";") + LINE_END
    }

    pub fn row(values: &CycleValues, at: DateTime<Local>) -> String {
        let mut cells = vec![at.format("%Y/%m/%d").to_string(), at.format("%H:%M:%S").to_string()];
        cells.extend(
            Measurement::ALL
                .iter()
                .map(|m| values.value(*m).map(|v| v.to_string()).unwrap_or_default()),
        );
        cells.join(";") + LINE_END
    }

    /// Append one row, writing the header first if the file does not exist yet
    pub async fn append(&self, values: &CycleValues, at: DateTime<Local>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| self.error(e))?;
        }

        let mut file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await
            .map_err(|e| self.error(e))?;

        let mut buffer = String::new();
        if file.metadata().await.map_err(|e| self.error(e))?.len() == 0 {
            buffer.push_str(&Self::header());
        }
        buffer.push_str(&Self::row(values, at));

        file.write_all(buffer.as_bytes())
            .await
            .map_err(|e| self.error(e))?;
        file.flush().await.map_err(|e| self.error(e))
    }

    fn error(&self, e: std::io::Error) -> AirqError {
        AirqError::journal(format!("{}: {}", self.path.display(), e))
    }
}

/// Journal column; pm2.5 is written without the dot
fn column_name(measurement: Measurement) -> &'static str {
    match measurement {
        Measurement::Pm25 => "pm25",
        other => other.key(),
    }
}
