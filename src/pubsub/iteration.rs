//! Управление ходом рассылки и совместное изменение аргументов.

use std::{
    cell::{Cell, Ref, RefCell},
    fmt,
};

/// Состояние значения, которое обработчики могут совместно изменять.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueState {
    /// Значение ещё никто не менял.
    #[default]
    Original,
    /// Обработчик записал новое значение; остальные должны его увидеть.
    Changed,
    /// Значение забрано (перемещено) одним из обработчиков.
    MovedFrom,
    /// Значение зафиксировано, дальнейшие изменения не ожидаются.
    Constant,
}

/// Решение контроллера после вызова очередного обработчика.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Считать текущую подписку удалённой: отвязать и перейти дальше.
    Dead,
    /// Перейти к следующей подписке.
    Progress,
    /// Немедленно завершить рассылку.
    Finish,
    /// Переставить текущую подписку в начало списка и продолжить, чтобы все
    /// остальные обработчики увидели изменение.
    Repeat,
}

/// Преобразование результата контроллера в [`Decision`].
///
/// Контроллер, который ничего не возвращает, означает [`Decision::Progress`].
pub trait IntoDecision {
    fn into_decision(self) -> Decision;
}

impl IntoDecision for () {
    fn into_decision(self) -> Decision {
        Decision::Progress
    }
}

impl IntoDecision for Decision {
    fn into_decision(self) -> Decision {
        self
    }
}

/// Значение вместе с его тегом [`ValueState`].
///
/// Единственный способ передать обработчикам изменяемый аргумент:
/// обработчики получают `&A`, и менять можно только то, что лежит в
/// `Tagged`. Любая запись помечает значение как [`ValueState::Changed`].
pub struct Tagged<T> {
    value: RefCell<T>,
    state: Cell<ValueState>,
}

impl<T> Tagged<T> {
    pub fn new(value: T) -> Self {
        Self::with_state(value, ValueState::Original)
    }

    pub fn with_state(
        value: T,
        state: ValueState,
    ) -> Self {
        Self {
            value: RefCell::new(value),
            state: Cell::new(state),
        }
    }

    pub fn state(&self) -> ValueState {
        self.state.get()
    }

    pub fn set_state(
        &self,
        state: ValueState,
    ) {
        self.state.set(state);
    }

    pub fn is_original(&self) -> bool {
        self.state() == ValueState::Original
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.value.borrow()
    }

    /// Записывает новое значение и помечает его как изменённое.
    pub fn set(
        &self,
        value: T,
    ) {
        *self.value.borrow_mut() = value;
        self.state.set(ValueState::Changed);
    }

    /// Изменяет значение на месте и помечает его как изменённое.
    pub fn update<F>(
        &self,
        f: F,
    ) where
        F: FnOnce(&mut T),
    {
        f(&mut self.value.borrow_mut());
        self.state.set(ValueState::Changed);
    }

    /// Забирает значение, оставляя на его месте `T::default()`.
    pub fn take(&self) -> T
    where
        T: Default,
    {
        let value = self.value.take();
        self.state.set(ValueState::MovedFrom);
        value
    }

    /// Шаг сходимости для контроллера: `Changed` фиксируется как
    /// `Constant` и требует повтора, всё остальное — `Progress`.
    pub fn settle(&self) -> Decision {
        if self.state() == ValueState::Changed {
            self.state.set(ValueState::Constant);
            Decision::Repeat
        } else {
            Decision::Progress
        }
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Clone> Tagged<T> {
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }
}

impl<T: Clone> Clone for Tagged<T> {
    fn clone(&self) -> Self {
        Self::with_state(self.get(), self.state())
    }
}

impl<T: Default> Default for Tagged<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Tagged<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Tagged")
            .field("value", &*self.value.borrow())
            .field("state", &self.state.get())
            .finish()
    }
}
