use thiserror::Error;

/// Custom error type for airq
#[derive(Error, Debug)]
pub enum AirqError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot initialize source '{source_id}': {message}")]
    AdapterInit { source_id: String, message: String },

    #[error("Cannot poll source '{source_id}': {message}")]
    AdapterPoll { source_id: String, message: String },

    #[error("History journal error: {0}")]
    Journal(String),
}

/// Result type alias for airq
pub type Result<T> = std::result::Result<T, AirqError>;

impl AirqError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        AirqError::Config(msg.into())
    }

    /// Create an adapter initialization error
    pub fn adapter_init<S: Into<String>, M: ToString>(source_id: S, message: M) -> Self {
        AirqError::AdapterInit {
            source_id: source_id.into(),
            message: message.to_string(),
        }
    }

    /// Create an adapter poll error
    pub fn adapter_poll<S: Into<String>, M: ToString>(source_id: S, message: M) -> Self {
        AirqError::AdapterPoll {
            source_id: source_id.into(),
            message: message.to_string(),
        }
    }

    pub fn journal<S: Into<String>>(msg: S) -> Self {
        AirqError::Journal(msg.into())
    }
}
