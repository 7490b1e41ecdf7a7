//! Логирование через `tracing`.
//!
//! Движок доставки пишет события сам; [`init_logging`] лишь устанавливает
//! глобальный subscriber с фильтром и одним `fmt`-слоем.

pub mod config;
pub mod error;
mod filters;
mod formatter;
pub mod handle;

pub use config::{LogFormat, LoggingConfig};
pub use error::LoggingError;
pub use handle::LoggingHandle;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt};

/// Устанавливает глобальный subscriber.
///
/// Повторный вызов возвращает [`LoggingError::AlreadyInitialized`].
pub fn init_logging(config: LoggingConfig) -> Result<LoggingHandle, LoggingError> {
    config.validate()?;

    let env_filter = filters::build_filter_from_config(&config)?;
    let (filter_layer, filter_handle) = reload::Layer::new(env_filter);
    let fmt_layer = formatter::build_formatter_from_config(&config, std::io::stderr);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        git_commit = env!("GIT_COMMIT"),
        build_time = env!("BUILD_TIME"),
        log_level = %config.level,
        log_format = %config.format,
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(filter_handle, config.format))
}
