use std::any::Any;

use thiserror::Error;

use crate::{AllocError, ErrorExt, StatusCode};

/// Ошибки операций над сообщениями и реестрами.
///
/// `Dispatching` и `Destructing` — ошибки программиста: вызов нарушает
/// протокол использования и не может быть исправлен повтором.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("`{operation}` is not allowed while the message is dispatching")]
    Dispatching { operation: &'static str },

    #[error("`{operation}` is not allowed while the registry is destructing")]
    Destructing { operation: &'static str },

    #[error(transparent)]
    OutOfMemory(#[from] AllocError),
}

impl DeliveryError {
    /// `true` для нарушений протокола (а не нехватки ресурсов).
    pub fn is_programming_error(&self) -> bool {
        self.status_code().is_programming_error()
    }
}

impl ErrorExt for DeliveryError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Dispatching { .. } => StatusCode::ReentrantMutation,
            Self::Destructing { .. } => StatusCode::RegistryDestructing,
            Self::OutOfMemory(err) => err.status_code(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_error_display() {
        let err = DeliveryError::Dispatching { operation: "clear" };
        assert_eq!(
            err.to_string(),
            "`clear` is not allowed while the message is dispatching"
        );

        let err = DeliveryError::Destructing { operation: "size" };
        assert_eq!(
            err.to_string(),
            "`size` is not allowed while the registry is destructing"
        );
    }

    #[test]
    fn test_status_codes() {
        let err = DeliveryError::Dispatching { operation: "drop" };
        assert_eq!(err.status_code(), StatusCode::ReentrantMutation);
        assert!(err.is_programming_error());

        let err: DeliveryError = AllocError::OutOfMemory {
            requested: 40,
            available: 20,
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::OutOfMemory);
        assert!(!err.is_programming_error());
        assert_eq!(
            err.to_string(),
            "not enough memory: requested 40 bytes, 20 available"
        );
    }
}
