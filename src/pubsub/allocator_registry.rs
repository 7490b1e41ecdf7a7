//! Реестр, владеющий собственным аллокатором.

use std::{fmt, rc::Rc};

use dovecote_error::DeliveryResult;

use super::{
    access::Access,
    alloc::{Allocator, BoundedAllocator},
    arguments::Arguments,
    builder::Delivery,
    contact::ContactToken,
    message::Message,
    registry::Registry,
};

/// Реестр, все подписки которого размещаются в его аллокаторе.
///
/// Каждая подписка создаётся с немедленной пересылкой удаления, поэтому
/// узел разрушается и возвращает память, как только его удалила любая из
/// сторон. Реестр объявлен раньше аллокатора и уничтожается первым.
pub struct AllocatorRegistry<T>
where
    T: Allocator + 'static,
{
    registry: Registry,
    allocator: Rc<T>,
}

impl<T> AllocatorRegistry<T>
where
    T: Allocator + 'static,
{
    pub fn new(allocator: T) -> Self {
        Self {
            registry: Registry::new(),
            allocator: Rc::new(allocator),
        }
    }

    pub fn allocator(&self) -> &T {
        &self.allocator
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn subscribe<A, R, P, H>(
        &self,
        message: &Message<A, R, P>,
        handler: H,
    ) -> DeliveryResult<ContactToken>
    where
        A: Arguments,
        R: 'static,
        P: Access,
        H: FnMut(&A) -> R + 'static,
    {
        self.deliver(message).to(handler)
    }

    /// Настройка подписки с уже подключёнными аллокатором и пересылкой.
    pub fn deliver<'a, A, R, P>(
        &'a self,
        message: &'a Message<A, R, P>,
    ) -> Delivery<'a, A, R, P>
    where
        A: Arguments,
        P: Access,
    {
        self.registry
            .deliver(message)
            .with_allocator(self.allocator.clone())
            .eager()
    }

    pub fn drop_by_token(
        &self,
        token: ContactToken,
    ) -> DeliveryResult<bool> {
        self.registry.drop_by_token(token)
    }

    pub fn clear(&self) {
        self.registry.clear();
    }

    pub fn size(&self) -> DeliveryResult<usize> {
        self.registry.size()
    }
}

impl<T> AllocatorRegistry<T>
where
    T: BoundedAllocator + 'static,
{
    pub fn total_memory(&self) -> usize {
        self.allocator.capacity()
    }

    pub fn used_memory(&self) -> usize {
        self.allocator.used()
    }

    pub fn available_memory(&self) -> usize {
        self.allocator.available()
    }
}

impl<T> Default for AllocatorRegistry<T>
where
    T: Allocator + Default + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for AllocatorRegistry<T>
where
    T: Allocator + fmt::Debug + 'static,
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("AllocatorRegistry")
            .field("registry", &self.registry)
            .field("allocator", &self.allocator)
            .finish()
    }
}
