use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибка аллокатора узлов подписки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    /// Аллокатор не может выделить запрошенный объём (например, арена
    /// фиксированной ёмкости исчерпана).
    #[error("not enough memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: usize, available: usize },
}

impl ErrorExt for AllocError {
    fn status_code(&self) -> StatusCode {
        StatusCode::OutOfMemory
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
