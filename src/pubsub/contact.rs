//! Подписка с двумя владельцами и протокол двойного удаления.
//!
//! Каждая подписка одновременно лежит в списке сообщения и в списке реестра.
//! Первое удаление (с любой стороны) только помечает узел и уведомляет
//! колбэк; второе окончательно освобождает обработчик и участок аллокатора.
//! Все последующие вызовы ничего не делают.
//!
//! Узлом владеет аллокатор, разместивший его; списки держат [`Link`].

use std::{
    cell::Cell,
    fmt,
    num::NonZeroU64,
    rc::{Rc, Weak},
};

use tracing::trace;

use super::alloc::Lease;

thread_local! {
    static NEXT_CONTACT_ID: Cell<u64> = const { Cell::new(1) };
}

/// Уникальный в пределах потока идентификатор подписки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId(NonZeroU64);

impl ContactId {
    pub(crate) fn next() -> Self {
        NEXT_CONTACT_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            // Счётчик стартует с единицы и только растёт.
            Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
        })
    }

    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

/// Токен подписки.
///
/// Даёт право попросить удаление с любой из двух сторон, но не владеет
/// подпиской. Токен мёртвой подписки безопасен: поиск просто ничего не
/// найдёт.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContactToken(ContactId);

impl ContactToken {
    pub fn id(&self) -> ContactId {
        self.0
    }
}

impl fmt::Display for ContactToken {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "contact#{}", self.0.get())
    }
}

/// Сторона, которая удаляет подписку.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Who {
    Registry,
    Message,
}

impl Who {
    /// Противоположная сторона.
    pub fn peer(self) -> Self {
        match self {
            Self::Registry => Self::Message,
            Self::Message => Self::Registry,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DropState {
    Live,
    DroppedOnce,
    Destroyed,
}

/// Колбэк первого удаления: получает токен подписки и сторону, которая её
/// удалила.
pub type OnDrop = Box<dyn FnMut(ContactToken, Who)>;

/// Общая часть любой подписки.
pub(crate) struct ContactCore {
    id: ContactId,
    state: Cell<DropState>,
    on_drop: Cell<Option<OnDrop>>,
    lease: Cell<Option<Lease>>,
}

impl ContactCore {
    pub(crate) fn new(
        lease: Option<Lease>,
        on_drop: Option<OnDrop>,
    ) -> Self {
        Self {
            id: ContactId::next(),
            state: Cell::new(DropState::Live),
            on_drop: Cell::new(on_drop),
            lease: Cell::new(lease),
        }
    }

    pub(crate) fn id(&self) -> ContactId {
        self.id
    }

    pub(crate) fn token(&self) -> ContactToken {
        ContactToken(self.id)
    }

    pub(crate) fn state(&self) -> DropState {
        self.state.get()
    }

    pub(crate) fn is_dropped(&self) -> bool {
        self.state() != DropState::Live
    }

    /// Колбэк вызывается не более одного раза: он забирается из ячейки
    /// перед вызовом.
    fn notify(
        &self,
        who: Who,
    ) {
        if let Some(mut on_drop) = self.on_drop.take() {
            on_drop(self.token(), who);
        }
    }

    /// Передаёт узел аллокатору, выдавшему его участок.
    pub(crate) fn place(
        &self,
        node: Rc<dyn Contact>,
    ) {
        if let Some(lease) = self.lease.take() {
            lease.place(node);
            self.lease.set(Some(lease));
        }
    }

    fn release_lease(&self) {
        if let Some(lease) = self.lease.take() {
            lease.release();
        }
    }
}

/// Элемент списка сообщения или реестра: идентификатор узла и слабая
/// ссылка на него.
pub(crate) struct Link<N: ?Sized> {
    id: ContactId,
    node: Weak<N>,
}

impl<N: ?Sized> Link<N> {
    pub(crate) fn new(
        id: ContactId,
        node: Weak<N>,
    ) -> Self {
        Self { id, node }
    }

    pub(crate) fn id(&self) -> ContactId {
        self.id
    }

    /// `None`, если аллокатор уже уничтожил узел.
    pub(crate) fn upgrade(&self) -> Option<Rc<N>> {
        self.node.upgrade()
    }
}

impl<N: Contact + ?Sized> Link<N> {
    /// Узел существует и ещё не удалён ни одной из сторон.
    pub(crate) fn is_live(&self) -> bool {
        self.upgrade().is_some_and(|node| !node.is_dropped())
    }
}

/// Узел, участвующий в протоколе двойного удаления.
pub(crate) trait Contact {
    fn core(&self) -> &ContactCore;

    /// Освобождает всё, что узел держит помимо [`ContactCore`]
    /// (обработчик у отправителя).
    fn release(&self);

    fn id(&self) -> ContactId {
        self.core().id()
    }

    fn is_dropped(&self) -> bool {
        self.core().is_dropped()
    }

    /// Один шаг протокола удаления со стороны `who`.
    fn drop_by(
        &self,
        who: Who,
    ) {
        let core = self.core();
        match core.state() {
            DropState::Live => {
                core.state.set(DropState::DroppedOnce);
                trace!(contact = %core.token(), ?who, "contact dropped once");
                core.notify(who);
            }
            DropState::DroppedOnce => {
                core.state.set(DropState::Destroyed);
                trace!(contact = %core.token(), ?who, "contact destroyed");
                self.release();
                core.release_lease();
            }
            DropState::Destroyed => {}
        }
    }
}
