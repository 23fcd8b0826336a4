use async_trait::async_trait;
use thiserror::Error;

use super::reading::Reading;
use crate::core::config::{ProviderKind, SourceConfig};

/// Failure of a whole init or poll call
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed payload: {0}")]
    Payload(String),

    #[error("upstream reported an error: {0}")]
    Upstream(String),

    #[error("invalid city code")]
    InvalidCity,

    #[error("sensor fault: {0}")]
    Sensor(String),

    #[error("not initialized")]
    NotInitialized,

    #[error("timed out after {0}s")]
    Timeout(u64),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Payload(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

impl From<std::io::Error> for ProviderError {
    fn from(err: std::io::Error) -> Self {
        ProviderError::Sensor(err.to_string())
    }
}

/// Adapter contract shared by every source kind.
///
/// `poll` returns only the requested keys it could resolve. Keys it could not
/// resolve are logged by the adapter and left out; only a failure of the whole
/// call is an error.
#[async_trait]
pub trait Provider: Send {
    fn kind(&self) -> ProviderKind;

    /// Idempotent setup. Adapters without state keep the default.
    async fn init(&mut self, _source: &SourceConfig) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn poll(&mut self, source: &SourceConfig) -> Result<Reading, ProviderError>;
}

pub type BoxedProvider = Box<dyn Provider>;
