use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::LoggingError;

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Формат вывода событий.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Многострочный вывод для разработки.
    Pretty,
    /// Одна строка на событие.
    #[default]
    Compact,
    /// JSON для сборщиков логов.
    Json,
}

/// Конфигурация логирования.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Базовый уровень (`trace`..`error`, `off`).
    pub level: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
    /// Уровни для отдельных target-ов, например `dovecote::pubsub = "trace"`.
    pub targets: BTreeMap<String, String>,
}

impl LoggingConfig {
    /// Проверяет базовый уровень и уровни target-ов.
    pub fn validate(&self) -> Result<(), LoggingError> {
        std::iter::once(&self.level)
            .chain(self.targets.values())
            .try_for_each(|level| validate_level(level))
    }

    /// Директива для `EnvFilter`: `info,dovecote::pubsub=trace`.
    pub fn build_filter_directive(&self) -> String {
        let mut directive = self.level.to_lowercase();
        for (target, level) in &self.targets {
            directive.push(',');
            directive.push_str(target);
            directive.push('=');
            directive.push_str(&level.to_lowercase());
        }
        directive
    }
}

fn validate_level(level: &str) -> Result<(), LoggingError> {
    if LEVELS.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(LoggingError::InvalidLevel(level.to_string()))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
            targets: BTreeMap::new(),
        }
    }
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет директиву фильтра с уровнями target-ов.
    #[test]
    fn test_build_filter_directive() {
        let mut cfg = LoggingConfig {
            level: "WARN".to_string(),
            ..Default::default()
        };
        assert_eq!(cfg.build_filter_directive(), "warn");

        cfg.targets
            .insert("dovecote::pubsub".to_string(), "trace".to_string());
        assert_eq!(cfg.build_filter_directive(), "warn,dovecote::pubsub=trace");
    }

    /// Тест проверяет валидацию уровней.
    #[test]
    fn test_validate() {
        assert!(LoggingConfig::default().validate().is_ok());

        let cfg = LoggingConfig {
            level: "loud".to_string(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(LoggingError::InvalidLevel(l)) if l == "loud"));

        let mut cfg = LoggingConfig::default();
        cfg.targets.insert("x".to_string(), "chatty".to_string());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Compact.to_string(), "compact");
    }
}
