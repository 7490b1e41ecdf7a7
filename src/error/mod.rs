//! Ошибки доставки. Сами типы живут в крейте `dovecote-error`, чтобы их
//! можно было использовать без движка.

pub use dovecote_error::{
    AllocError, DeliveryError, DeliveryResult, ErrorExt, LogLevel, StatusCode,
};
use tracing::{debug, error, info, trace, warn};

pub use crate::logging::LoggingError;

/// Пишет ошибку в журнал с уровнем, который рекомендует её статус-код.
pub(crate) fn log_error<E: ErrorExt>(err: &E) {
    let code = err.status_code().code();
    let kind = err.type_name();
    match err.log_level() {
        LogLevel::Trace => trace!(code, %kind, "{err}"),
        LogLevel::Debug => debug!(code, %kind, "{err}"),
        LogLevel::Info => info!(code, %kind, "{err}"),
        LogLevel::Warn => warn!(code, %kind, "{err}"),
        LogLevel::Error => error!(code, %kind, "{err}"),
    }
}
