//! Значение с однобитным флагом рядом.
//!
//! Голова списка подписок хранит вместе с самим списком один флаг: у
//! сообщения это «идёт рассылка», у реестра — «идёт разрушение». Флаг
//! живёт отдельно от значения, поэтому замена значения его не трогает.

use std::cell::{Cell, Ref, RefCell, RefMut};

pub(crate) struct Flagged<T> {
    value: RefCell<T>,
    flag: Cell<bool>,
}

/// Сбрасывает флаг при выходе из области видимости, в том числе при
/// раскрутке стека.
#[must_use = "флаг сбрасывается сразу, если guard не сохранён"]
pub(crate) struct FlagGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<T> Flagged<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
            flag: Cell::new(false),
        }
    }

    pub(crate) fn borrow(&self) -> Ref<'_, T> {
        self.value.borrow()
    }

    pub(crate) fn borrow_mut(&self) -> RefMut<'_, T> {
        self.value.borrow_mut()
    }

    /// Заменяет значение, сохраняя текущее состояние флага.
    pub(crate) fn replace(
        &self,
        value: T,
    ) -> T {
        self.value.replace(value)
    }

    pub(crate) fn test(&self) -> bool {
        self.flag.get()
    }

    pub(crate) fn set(&self) {
        self.flag.set(true);
    }

    #[cfg(test)]
    pub(crate) fn reset(&self) {
        self.flag.set(false);
    }

    /// Поднимает флаг до конца жизни возвращённого guard.
    pub(crate) fn scoped_set(&self) -> FlagGuard<'_> {
        self.flag.set(true);
        FlagGuard { flag: &self.flag }
    }
}

impl<T: Default> Default for Flagged<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}
