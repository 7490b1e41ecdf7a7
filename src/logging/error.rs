use thiserror::Error;
use tracing_subscriber::{filter::ParseError, reload, util::TryInitError};

/// Ошибки настройки логирования.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unknown log level `{0}`")]
    InvalidLevel(String),

    #[error("unknown log format `{0}`, expected pretty, compact or json")]
    InvalidFormat(String),

    #[error("invalid filter directive `{directive}`: {source}")]
    InvalidFilter {
        directive: String,
        #[source]
        source: ParseError,
    },

    #[error("global subscriber is already installed: {0}")]
    AlreadyInitialized(#[from] TryInitError),

    #[error("failed to reload filter: {0}")]
    Reload(#[from] reload::Error),
}
