//! Доставка сообщений внутри процесса (pub/sub).
//!
//! Сообщение ([`Message`]) и реестр ([`Registry`]) живут независимо друг от
//! друга. Каждая подписка одновременно принадлежит одному сообщению и одному
//! реестру и разрушается только после того, как её удалили обе стороны, в
//! любом порядке:
//!
//! - `contact`: идентификаторы, токены и протокол двойного удаления.
//! - `sender` (приватный): узел подписки с типизированным обработчиком.
//! - `arguments`: какие типы можно передавать обработчикам.
//! - `message`: список отправителей, рассылка, защита от повторного входа.
//! - `registry`: подписки одного подписчика на разные сообщения.
//! - `builder`: пошаговая настройка подписки.
//! - `iteration`: решения контроллера и совместное изменение аргументов.
//! - `access`: политики доступа к рассылке.
//! - `alloc`: стратегии выделения памяти под узлы.
//! - `allocator_registry`: реестр со своим аллокатором.
//! - `flagged` (приватный): значение с флагом.

pub mod access;
pub mod alloc;
pub mod allocator_registry;
pub mod arguments;
pub mod builder;
pub mod contact;
mod flagged;
pub mod iteration;
pub mod message;
pub mod registry;
mod sender;

pub use access::{Access, Open, Sealed};
pub use alloc::{
    round_up, Allocator, ArenaAllocator, BoundedAllocator, FixedArena, HeapAllocator, Slot,
    MIN_ALIGNMENT,
};
pub use allocator_registry::AllocatorRegistry;
pub use arguments::Arguments;
pub use builder::Delivery;
pub use contact::{ContactId, ContactToken, OnDrop, Who};
pub use iteration::{Decision, IntoDecision, Tagged, ValueState};
pub use message::{Message, Outlet};
pub use registry::Registry;
