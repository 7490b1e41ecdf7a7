use tracing_subscriber::EnvFilter;

use super::{config::LoggingConfig, error::LoggingError};

/// Фильтр из конфигурации. Если задана `RUST_LOG`, используется она.
pub(crate) fn build_filter_from_config(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(env_filter) = EnvFilter::try_from_default_env() {
        return Ok(env_filter);
    }
    parse_directive(&config.build_filter_directive())
}

pub(crate) fn parse_directive(directive: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directive).map_err(|source| LoggingError::InvalidFilter {
        directive: directive.to_string(),
        source,
    })
}
