use tracing_subscriber::{reload, EnvFilter, Registry};

use super::{config::LogFormat, error::LoggingError, filters};

/// Управление установленным логированием: смена фильтра на лету.
pub struct LoggingHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    format: LogFormat,
}

impl LoggingHandle {
    pub(crate) fn new(
        filter: reload::Handle<EnvFilter, Registry>,
        format: LogFormat,
    ) -> Self {
        Self { filter, format }
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// Заменяет фильтр директивой вида `info,dovecote::pubsub=trace`.
    pub fn set_filter(
        &self,
        directive: &str,
    ) -> Result<(), LoggingError> {
        let filter = filters::parse_directive(directive)?;
        self.filter.reload(filter)?;
        tracing::info!(directive, "log filter reloaded");
        Ok(())
    }

    /// Текущая директива фильтра.
    pub fn current_filter(&self) -> Option<String> {
        self.filter.with_current(|filter| filter.to_string()).ok()
    }
}

impl std::fmt::Debug for LoggingHandle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LoggingHandle")
            .field("filter", &self.current_filter())
            .field("format", &self.format)
            .finish()
    }
}
