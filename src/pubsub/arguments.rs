//! Допустимые типы аргументов сообщения.
//!
//! Обработчики получают аргументы по общей ссылке, поэтому менять их можно
//! только через [`Tagged`]. Реализации ниже перечисляют типы без внутренней
//! изменяемости; `Cell`, `RefCell` и эксклюзивные ссылки в этот список не
//! входят.

use std::{collections::VecDeque, rc::Rc, time::Duration};

use super::iteration::Tagged;

/// Набор аргументов сообщения.
///
/// Аргументы можно передавать как копированием, так и перемещением. Для
/// собственного типа достаточно пустой реализации; она обещает, что тип не
/// меняется через `&self`:
///
/// ```
/// use dovecote::{Arguments, Message, Registry};
///
/// struct Payload(Vec<u8>);
///
/// impl Arguments for Payload {}
///
/// let message: Message<Payload> = Message::new();
/// let registry = Registry::new();
/// registry.subscribe(&message, |payload| assert_eq!(payload.0.len(), 2)).unwrap();
/// message.send(Payload(vec![1, 2]));
/// ```
///
/// Эксклюзивная ссылка не подходит:
///
/// ```compile_fail
/// use dovecote::Message;
///
/// let _message: Message<&'static mut i32> = Message::new();
/// ```
///
/// Общее значение с внутренней изменяемостью тоже, его можно изменить
/// только в паре с тегом:
///
/// ```compile_fail
/// use std::{cell::Cell, rc::Rc};
///
/// use dovecote::Message;
///
/// let _message: Message<Rc<Cell<i32>>> = Message::new();
/// ```
pub trait Arguments: 'static {}

macro_rules! impl_arguments {
    ($($ty:ty),* $(,)?) => {
        $(impl Arguments for $ty {})*
    };
}

macro_rules! impl_arguments_for_tuples {
    ($(($($name:ident),+)),* $(,)?) => {
        $(impl<$($name: Arguments),+> Arguments for ($($name,)+) {})*
    };
}

impl_arguments!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    str,
    String,
    Duration,
);

impl_arguments_for_tuples!(
    (T1),
    (T1, T2),
    (T1, T2, T3),
    (T1, T2, T3, T4),
    (T1, T2, T3, T4, T5),
    (T1, T2, T3, T4, T5, T6),
);

impl<T: Arguments + ?Sized> Arguments for &'static T {}

impl<T: Arguments + ?Sized> Arguments for Box<T> {}

impl<T: Arguments + ?Sized> Arguments for Rc<T> {}

impl<T: Arguments> Arguments for [T] {}

impl<T: Arguments, const N: usize> Arguments for [T; N] {}

impl<T: Arguments> Arguments for Vec<T> {}

impl<T: Arguments> Arguments for VecDeque<T> {}

impl<T: Arguments> Arguments for Option<T> {}

impl<T: Arguments> Arguments for Tagged<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_arguments<A: Arguments + ?Sized>() {}

    /// Тест проверяет, что типичные наборы аргументов подходят.
    #[test]
    fn test_common_argument_packs() {
        assert_arguments::<()>();
        assert_arguments::<&'static str>();
        assert_arguments::<(i32, String, Tagged<u8>)>();
        assert_arguments::<Box<[u8]>>();
        assert_arguments::<Rc<Vec<Option<u64>>>>();
        assert_arguments::<[Tagged<String>; 2]>();
    }
}
