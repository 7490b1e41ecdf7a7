//! Политики доступа к изменяющим операциям сообщения.
//!
//! Подписаться на сообщение может кто угодно. Рассылать, очищать и удалять
//! подписки по токену у [`Open`] сообщения тоже может кто угодно, а у
//! [`Sealed<K>`] — только тот, кто может предъявить `&K`. Если конструктор
//! `K` виден лишь владельцу, то и доступ к рассылке есть только у него.

use std::marker::PhantomData;

/// Политика доступа сообщения.
pub trait Access: 'static {}

/// Изменяющие операции доступны всем.
#[derive(Debug, Clone, Copy, Default)]
pub struct Open;

impl Access for Open {}

/// Изменяющие операции доступны только через `Message::outlet(&K)`.
pub struct Sealed<K>(PhantomData<fn() -> K>);

impl<K: 'static> Access for Sealed<K> {}
