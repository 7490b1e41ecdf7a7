//! Пошаговая настройка подписки.

use std::rc::Rc;

use dovecote_error::DeliveryResult;

use super::{
    access::Access,
    alloc::Allocator,
    arguments::Arguments,
    contact::{ContactToken, OnDrop, Who},
    message::Message,
    registry::{Registry, RegistryCore},
};

/// Необязательные параметры подписки.
#[derive(Default)]
pub(crate) struct Wiring {
    pub(crate) allocator: Option<Rc<dyn Allocator>>,
    pub(crate) on_drop: Option<OnDrop>,
    pub(crate) eager: bool,
}

/// Подписка в процессе настройки; создаётся через
/// [`Registry::deliver`].
///
/// ```
/// use std::rc::Rc;
///
/// use dovecote::{HeapAllocator, Message, Registry};
///
/// let heap = Rc::new(HeapAllocator::new());
/// let message: Message<String> = Message::new();
/// let registry = Registry::new();
///
/// registry
///     .deliver(&message)
///     .with_allocator(heap.clone())
///     .on_drop(|token, who| println!("{token} dropped by {who:?}"))
///     .eager()
///     .to(|text| println!("{text}"))
///     .unwrap();
///
/// assert_eq!(heap.live(), 1);
/// drop(message);
/// assert_eq!(heap.live(), 0);
/// ```
#[must_use = "подписка создаётся только вызовом `to`"]
pub struct Delivery<'a, A, R, P>
where
    A: Arguments,
    P: Access,
{
    registry: &'a Registry,
    message: &'a Message<A, R, P>,
    wiring: Wiring,
}

impl<'a, A, R, P> Delivery<'a, A, R, P>
where
    A: Arguments,
    P: Access,
{
    pub(crate) fn new(
        registry: &'a Registry,
        message: &'a Message<A, R, P>,
    ) -> Self {
        Self {
            registry,
            message,
            wiring: Wiring::default(),
        }
    }

    /// Узел подписки будет размещён в `allocator` и возвращён ему при
    /// окончательном удалении. Без этого вызова узел живёт в собственной
    /// куче реестра.
    pub fn with_allocator<T>(
        mut self,
        allocator: Rc<T>,
    ) -> Self
    where
        T: Allocator + 'static,
    {
        self.wiring.allocator = Some(allocator);
        self
    }

    /// Колбэк, вызываемый при первом удалении подписки (с любой стороны).
    pub fn on_drop<F>(
        mut self,
        on_drop: F,
    ) -> Self
    where
        F: FnMut(ContactToken, Who) + 'static,
    {
        self.wiring.on_drop = Some(Box::new(on_drop));
        self
    }

    /// Первое удаление сразу пересылается второй стороне, и узел
    /// разрушается синхронно.
    pub fn eager(mut self) -> Self {
        self.wiring.eager = true;
        self
    }

    pub fn to<H>(
        self,
        handler: H,
    ) -> DeliveryResult<ContactToken>
    where
        R: 'static,
        H: FnMut(&A) -> R + 'static,
    {
        RegistryCore::attach(
            self.registry.core(),
            self.message,
            Box::new(handler),
            self.wiring,
        )
    }
}
