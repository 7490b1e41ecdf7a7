//! Реестр подписок одного подписчика.
//!
//! Реестр хранит подписки на сообщения разных типов и удаляет их со своей
//! стороны при уничтожении. Подписчику не нужно отписываться вручную, а
//! сообщению не нужно знать, жив ли подписчик.

use std::{
    collections::VecDeque,
    fmt,
    rc::{Rc, Weak},
};

use dovecote_error::{DeliveryError, DeliveryResult};
use tracing::{debug, trace};

use super::{
    access::Access,
    alloc::{Allocator, HeapAllocator, Lease},
    arguments::Arguments,
    builder::{Delivery, Wiring},
    contact::{Contact, ContactCore, ContactToken, Link, OnDrop, Who},
    flagged::Flagged,
    message::{Message, MessageCore},
    sender::{Handler, SenderNode},
};
use crate::error::log_error;

/// Внутренняя часть реестра. Флаг списка означает «идёт разрушение».
pub(crate) struct RegistryCore {
    contacts: Flagged<VecDeque<Link<dyn Contact>>>,
    /// Куча для подписок без явного аллокатора.
    heap: Rc<HeapAllocator>,
}

impl RegistryCore {
    fn new() -> Self {
        Self {
            contacts: Default::default(),
            heap: Rc::new(HeapAllocator::new()),
        }
    }

    pub(crate) fn is_destructing(&self) -> bool {
        self.contacts.test()
    }

    #[cfg(test)]
    pub(crate) fn linked(&self) -> usize {
        self.contacts.borrow().len()
    }

    fn ensure_alive(
        &self,
        operation: &'static str,
    ) -> DeliveryResult<()> {
        if self.is_destructing() {
            let err = DeliveryError::Destructing { operation };
            log_error(&err);
            return Err(err);
        }
        Ok(())
    }

    fn size(&self) -> DeliveryResult<usize> {
        self.ensure_alive("size")?;
        Ok(self
            .contacts
            .borrow()
            .iter()
            .filter(|link| link.is_live())
            .count())
    }

    fn unlink(
        &self,
        token: ContactToken,
    ) -> Option<Link<dyn Contact>> {
        let mut contacts = self.contacts.borrow_mut();
        let position = contacts.iter().position(|link| link.id() == token.id())?;
        contacts.remove(position)
    }

    /// Создаёт узел подписки и связывает его с сообщением и с реестром.
    ///
    /// Все проверки и выделение памяти выполняются до связывания, поэтому
    /// при ошибке ни один из списков не меняется. Узлом владеет аллокатор
    /// подписки, а без него куча реестра.
    pub(crate) fn attach<A, R, P>(
        this: &Rc<Self>,
        message: &Message<A, R, P>,
        handler: Handler<A, R>,
        wiring: Wiring,
    ) -> DeliveryResult<ContactToken>
    where
        A: Arguments,
        R: 'static,
        P: Access,
    {
        this.ensure_alive("subscribe")?;
        let target = message.core();
        target.ensure_not_sending("subscribe")?;

        let allocator: Rc<dyn Allocator> = match wiring.allocator {
            Some(allocator) => allocator,
            None => this.heap.clone(),
        };
        let lease = Lease::acquire(allocator, SenderNode::<A, R>::footprint())?;

        let on_drop = if wiring.eager {
            let forward = cross_notify(Rc::downgrade(target), Rc::downgrade(this));
            Some(chain(wiring.on_drop, forward))
        } else {
            wiring.on_drop
        };

        let sender = Rc::new(SenderNode::new(ContactCore::new(Some(lease), on_drop), handler));
        let token = sender.core().token();
        let contact: Rc<dyn Contact> = sender.clone();
        sender.core().place(contact.clone());
        target.attach(&sender);
        this.contacts
            .borrow_mut()
            .push_front(Link::new(token.id(), Rc::downgrade(&contact)));

        debug!(contact = %token, eager = wiring.eager, "subscribed");
        Ok(token)
    }

    fn drop_by_token(
        &self,
        token: ContactToken,
    ) -> DeliveryResult<bool> {
        self.ensure_alive("drop_by_token")?;
        let Some(link) = self.unlink(token) else {
            return Ok(false);
        };
        if let Some(contact) = link.upgrade() {
            contact.drop_by(Who::Registry);
        }
        debug!(contact = %token, "dropped by registry");
        Ok(true)
    }

    /// Удаление, пришедшее от сообщения. Во время разрушения ничего не
    /// делает: узел удалит сама очистка.
    pub(crate) fn forward_drop(
        &self,
        token: ContactToken,
    ) {
        if self.is_destructing() {
            trace!(contact = %token, "forward skipped, registry is destructing");
            return;
        }
        if let Some(contact) = self.unlink(token).and_then(|link| link.upgrade()) {
            contact.drop_by(Who::Registry);
        }
    }

    fn clear(&self) {
        let contacts = self.contacts.replace(VecDeque::new());
        if !contacts.is_empty() {
            debug!(count = contacts.len(), "registry cleared");
        }
        for contact in contacts.iter().filter_map(Link::upgrade) {
            contact.drop_by(Who::Registry);
        }
    }
}

/// Пересылает первое удаление противоположной стороне, чтобы второе
/// произошло сразу, а не при следующем обходе списка.
fn cross_notify<A, R>(
    message: Weak<MessageCore<A, R>>,
    registry: Weak<RegistryCore>,
) -> OnDrop
where
    A: 'static,
    R: 'static,
{
    Box::new(move |token, who| match who {
        Who::Registry => {
            if let Some(message) = message.upgrade() {
                message.forward_drop(token);
            }
        }
        Who::Message => {
            if let Some(registry) = registry.upgrade() {
                registry.forward_drop(token);
            }
        }
    })
}

/// Сначала пользовательский колбэк, затем пересылка.
fn chain(
    first: Option<OnDrop>,
    mut forward: OnDrop,
) -> OnDrop {
    match first {
        Some(mut first) => Box::new(move |token, who| {
            first(token, who);
            forward(token, who);
        }),
        None => forward,
    }
}

/// Реестр подписок.
///
/// ```
/// use dovecote::{Message, Registry};
///
/// let message: Message<i32> = Message::new();
/// let registry = Registry::new();
/// let token = registry.subscribe(&message, |value| println!("{value}")).unwrap();
///
/// message.send(7);
/// assert_eq!(registry.drop_by_token(token), Ok(true));
/// assert_eq!(message.size(), 0);
/// ```
pub struct Registry {
    core: Rc<RegistryCore>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            core: Rc::new(RegistryCore::new()),
        }
    }

    /// Подписывает обработчик на сообщение; узел размещается в куче
    /// реестра.
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

    /// Начинает настройку подписки: аллокатор, колбэк удаления, немедленная
    /// пересылка.
    pub fn deliver<'a, A, R, P>(
        &'a self,
        message: &'a Message<A, R, P>,
    ) -> Delivery<'a, A, R, P>
    where
        A: Arguments,
        P: Access,
    {
        Delivery::new(self, message)
    }

    /// Удаляет подписку со стороны реестра. `Ok(false)`, если такой
    /// подписки в реестре нет.
    pub fn drop_by_token(
        &self,
        token: ContactToken,
    ) -> DeliveryResult<bool> {
        self.core.drop_by_token(token)
    }

    /// Удаляет все подписки со стороны реестра.
    pub fn clear(&self) {
        self.core.clear();
    }

    /// Количество подписок, которые ещё не удалены ни одной из сторон.
    pub fn size(&self) -> DeliveryResult<usize> {
        self.core.size()
    }

    pub fn is_destructing(&self) -> bool {
        self.core.is_destructing()
    }

    /// Куча, в которой живут подписки без явного аллокатора.
    pub fn heap(&self) -> &HeapAllocator {
        &self.core.heap
    }

    pub(crate) fn core(&self) -> &Rc<RegistryCore> {
        &self.core
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.core.contacts.set();
        self.core.clear();
    }
}

impl fmt::Debug for Registry {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Registry")
            .field("contacts", &self.core.contacts.borrow().len())
            .field("destructing", &self.is_destructing())
            .finish()
    }
}
