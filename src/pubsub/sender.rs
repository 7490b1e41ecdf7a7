//! Подписка, знающая тип обработчика.

use std::{cell::RefCell, mem};

use super::{
    contact::{Contact, ContactCore},
    iteration::{Decision, IntoDecision},
};

pub(crate) type Handler<A, R> = Box<dyn FnMut(&A) -> R>;

/// Узел в списке сообщения: [`ContactCore`] плюс обработчик.
pub(crate) struct SenderNode<A, R> {
    core: ContactCore,
    handler: RefCell<Option<Handler<A, R>>>,
}

impl<A, R> SenderNode<A, R> {
    pub(crate) fn new(
        core: ContactCore,
        handler: Handler<A, R>,
    ) -> Self {
        Self {
            core,
            handler: RefCell::new(Some(handler)),
        }
    }

    /// Объём, который узел занимает у аллокатора.
    pub(crate) fn footprint() -> usize {
        mem::size_of::<Self>()
    }

    /// Вызывает обработчик и передаёт результат контроллеру.
    ///
    /// Для удалённого узла обработчик не вызывается, а результатом будет
    /// [`Decision::Dead`]. Заём обработчика снимается до вызова контроллера.
    pub(crate) fn try_send<C, D>(
        &self,
        args: &A,
        controller: &mut C,
    ) -> Decision
    where
        C: FnMut(R) -> D,
        D: IntoDecision,
    {
        if self.core.is_dropped() {
            return Decision::Dead;
        }

        let result = {
            let mut slot = self.handler.borrow_mut();
            let Some(handler) = slot.as_mut() else {
                return Decision::Dead;
            };
            handler(args)
        };

        controller(result).into_decision()
    }
}

impl<A, R> Contact for SenderNode<A, R> {
    fn core(&self) -> &ContactCore {
        &self.core
    }

    fn release(&self) {
        // Узел может быть разрушен из собственного обработчика; тогда
        // обработчик освободится вместе с узлом.
        if let Ok(mut handler) = self.handler.try_borrow_mut() {
            handler.take();
        }
    }
}
