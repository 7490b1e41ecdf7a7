use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment};
use serde::{Deserialize, Serialize};

use crate::logging::{LogFormat, LoggingConfig};

/// Ёмкость арены по умолчанию, байт.
pub const DEFAULT_ARENA_CAPACITY: usize = 4096;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub log_level: String,
    pub log_format: LogFormat,
    pub arena_capacity: usize,
}

impl Settings {
    /// Значения по умолчанию, поверх которых накладываются переменные
    /// окружения `DOVECOTE_*` (например `DOVECOTE_ARENA_CAPACITY=8192`).
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            // Переменные окружения с префиксом DOVECOTE_
            .add_source(Environment::with_prefix("DOVECOTE"))
            .build()?
            .try_deserialize()
    }

    /// Только значения по умолчанию, без окружения.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("log_level", "info")?
            .set_default("log_format", LogFormat::default().to_string())?
            .set_default("arena_capacity", DEFAULT_ARENA_CAPACITY as u64)
    }

    /// Конфигурация логирования на основе этих настроек.
    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            format: self.log_format,
            ..Default::default()
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            arena_capacity: DEFAULT_ARENA_CAPACITY,
        }
    }
}
