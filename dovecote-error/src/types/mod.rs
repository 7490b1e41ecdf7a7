pub mod delivery;
pub mod memory;

// Публичный экспорт всех типов ошибок из вложенных модулей, чтобы упростить
// доступ к ним из внешнего кода.
pub use delivery::*;
pub use memory::*;
