//! Типизированный канал рассылки.
//!
//! Сообщение владеет списком отправителей ([`SenderNode`]). Новые подписки
//! встают в начало списка, поэтому первым вызывается обработчик, подписанный
//! последним. Других гарантий порядка нет: [`Decision::Repeat`] переставляет
//! элементы списка прямо во время рассылки.

use std::{
    borrow::Borrow,
    cell::Cell,
    collections::VecDeque,
    fmt,
    marker::PhantomData,
    rc::Rc,
};

use dovecote_error::{DeliveryError, DeliveryResult};
use tracing::{debug, trace};

use super::{
    access::{Access, Open, Sealed},
    arguments::Arguments,
    contact::{Contact, ContactToken, Link, Who},
    flagged::Flagged,
    iteration::{Decision, IntoDecision},
    sender::SenderNode,
};
use crate::error::log_error;

/// Внутренняя часть сообщения. Флаг списка означает «идёт рассылка».
pub(crate) struct MessageCore<A, R> {
    senders: Flagged<VecDeque<Link<SenderNode<A, R>>>>,
    /// Во время рассылки реестр удалил узел, который цикл уже прошёл.
    stale: Cell<bool>,
}

impl<A, R> MessageCore<A, R> {
    fn new() -> Self {
        Self {
            senders: Flagged::default(),
            stale: Cell::new(false),
        }
    }

    /// Количество живых подписок; удалённые, но ещё не отвязанные
    /// элементы не считаются.
    pub(crate) fn size(&self) -> usize {
        self.senders
            .borrow()
            .iter()
            .filter(|link| link.is_live())
            .count()
    }

    pub(crate) fn is_sending(&self) -> bool {
        self.senders.test()
    }

    /// Длина списка вместе с удалёнными, но ещё не отвязанными узлами.
    #[cfg(test)]
    pub(crate) fn linked(&self) -> usize {
        self.senders.borrow().len()
    }

    pub(crate) fn ensure_not_sending(
        &self,
        operation: &'static str,
    ) -> DeliveryResult<()> {
        if self.is_sending() {
            let err = DeliveryError::Dispatching { operation };
            log_error(&err);
            return Err(err);
        }
        Ok(())
    }

    /// Ставит отправителя в начало списка. Проверку на рассылку делает
    /// вызывающий до того, как узел создан.
    pub(crate) fn attach(
        &self,
        sender: &Rc<SenderNode<A, R>>,
    ) {
        self.senders
            .borrow_mut()
            .push_front(Link::new(sender.id(), Rc::downgrade(sender)));
    }

    fn unlink(
        &self,
        token: ContactToken,
    ) -> Option<Link<SenderNode<A, R>>> {
        let mut senders = self.senders.borrow_mut();
        let position = senders.iter().position(|link| link.id() == token.id())?;
        senders.remove(position)
    }

    pub(crate) fn respond<C, D>(
        &self,
        args: &A,
        mut controller: C,
    ) where
        C: FnMut(R) -> D,
        D: IntoDecision,
    {
        if self.is_sending() {
            debug!("re-entrant send ignored");
            return;
        }
        let sending = self.senders.scoped_set();

        let mut index = 0;
        loop {
            // Заём списка снимается до вызова обработчика.
            let next = self.senders.borrow().get(index).map(Link::upgrade);
            let sender = match next {
                None => break,
                Some(Some(sender)) => sender,
                Some(None) => {
                    self.senders.borrow_mut().remove(index);
                    continue;
                }
            };

            match sender.try_send(args, &mut controller) {
                Decision::Progress => index += 1,
                Decision::Finish => break,
                Decision::Dead => {
                    self.senders.borrow_mut().remove(index);
                    sender.drop_by(Who::Message);
                }
                Decision::Repeat => {
                    // [.., cur, rest..] -> [cur, rest.., ..]
                    self.senders.borrow_mut().rotate_left(index);
                    trace!(contact = %sender.core().token(), "sender moved to front");
                    index = 1;
                }
            }
        }

        drop(sending);
        if self.stale.replace(false) {
            self.collect_dropped();
        }
    }

    /// Отвязывает узлы, удалённые реестром, пока шла рассылка.
    fn collect_dropped(&self) {
        let mut dropped = Vec::new();
        self.senders
            .borrow_mut()
            .retain(|link| match link.upgrade() {
                Some(sender) if sender.is_dropped() => {
                    dropped.push(sender);
                    false
                }
                Some(_) => true,
                None => false,
            });
        if !dropped.is_empty() {
            debug!(count = dropped.len(), "senders dropped during dispatch collected");
        }
        for sender in dropped {
            sender.drop_by(Who::Message);
        }
    }

    pub(crate) fn drop_by_token(
        &self,
        token: ContactToken,
    ) -> DeliveryResult<bool> {
        self.ensure_not_sending("drop_by_token")?;
        let Some(link) = self.unlink(token) else {
            return Ok(false);
        };
        if let Some(sender) = link.upgrade() {
            sender.drop_by(Who::Message);
        }
        debug!(contact = %token, "dropped by message");
        Ok(true)
    }

    /// Удаление, пришедшее от реестра. Во время рассылки только отмечает,
    /// что после неё список нужно проверить.
    pub(crate) fn forward_drop(
        &self,
        token: ContactToken,
    ) {
        if self.is_sending() {
            trace!(contact = %token, "forward deferred, message is dispatching");
            self.stale.set(true);
            return;
        }
        if let Some(sender) = self.unlink(token).and_then(|link| link.upgrade()) {
            sender.drop_by(Who::Message);
        }
    }

    pub(crate) fn clear(&self) -> DeliveryResult<()> {
        self.ensure_not_sending("clear")?;
        self.clear_unchecked();
        Ok(())
    }

    /// Список сначала отсоединяется целиком, затем каждый узел удаляется.
    fn clear_unchecked(&self) {
        let senders = self.senders.replace(VecDeque::new());
        if !senders.is_empty() {
            debug!(count = senders.len(), "message cleared");
        }
        for sender in senders.iter().filter_map(Link::upgrade) {
            sender.drop_by(Who::Message);
        }
    }
}

/// Сообщение с аргументами `A`, результатом обработчика `R` и политикой
/// доступа `P`.
///
/// Подписка идёт через [`Registry`](super::Registry). При уничтожении
/// сообщение удаляет все оставшиеся подписки со своей стороны.
pub struct Message<A, R = (), P = Open>
where
    A: Arguments,
    P: Access,
{
    core: Rc<MessageCore<A, R>>,
    _access: PhantomData<P>,
}

/// Изменяющие операции сообщения.
///
/// Для [`Open`] сообщений те же операции доступны прямо на [`Message`];
/// для [`Sealed`] только через [`Message::outlet`].
pub struct Outlet<'a, A, R> {
    core: &'a MessageCore<A, R>,
}

impl<A, R, P> Message<A, R, P>
where
    A: Arguments,
    P: Access,
{
    pub fn new() -> Self {
        Self {
            core: Rc::new(MessageCore::new()),
            _access: PhantomData,
        }
    }

    pub fn size(&self) -> usize {
        self.core.size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// `true`, пока идёт рассылка (в том числе внутри обработчиков).
    pub fn is_sending(&self) -> bool {
        self.core.is_sending()
    }

    /// Размер одного узла подписки этого сообщения: столько байт запросит
    /// у аллокатора каждая подписка.
    pub fn node_size() -> usize {
        SenderNode::<A, R>::footprint()
    }

    pub(crate) fn core(&self) -> &Rc<MessageCore<A, R>> {
        &self.core
    }

    fn outlet_unchecked(&self) -> Outlet<'_, A, R> {
        Outlet { core: &self.core }
    }
}

impl<A, R> Message<A, R, Open>
where
    A: Arguments,
{
    /// Вызывает всех подписчиков; эквивалент `respond` с контроллером,
    /// который всегда продолжает.
    pub fn send(
        &self,
        args: impl Borrow<A>,
    ) {
        self.outlet_unchecked().send(args)
    }

    pub fn respond<C, D>(
        &self,
        args: impl Borrow<A>,
        controller: C,
    ) where
        C: FnMut(R) -> D,
        D: IntoDecision,
    {
        self.outlet_unchecked().respond(args, controller)
    }

    pub fn drop_by_token(
        &self,
        token: ContactToken,
    ) -> DeliveryResult<bool> {
        self.outlet_unchecked().drop_by_token(token)
    }

    pub fn clear(&self) -> DeliveryResult<()> {
        self.outlet_unchecked().clear()
    }
}

impl<A, R, K> Message<A, R, Sealed<K>>
where
    A: Arguments,
    K: 'static,
{
    /// Доступ к изменяющим операциям для владельца ключа `K`.
    pub fn outlet(
        &self,
        _key: &K,
    ) -> Outlet<'_, A, R> {
        self.outlet_unchecked()
    }
}

impl<A, R> Outlet<'_, A, R> {
    pub fn send(
        &self,
        args: impl Borrow<A>,
    ) {
        self.core.respond(args.borrow(), |_| ())
    }

    pub fn respond<C, D>(
        &self,
        args: impl Borrow<A>,
        controller: C,
    ) where
        C: FnMut(R) -> D,
        D: IntoDecision,
    {
        self.core.respond(args.borrow(), controller)
    }

    /// Удаляет подписку по токену. `Ok(false)`, если в этом сообщении
    /// такой подписки нет.
    pub fn drop_by_token(
        &self,
        token: ContactToken,
    ) -> DeliveryResult<bool> {
        self.core.drop_by_token(token)
    }

    pub fn clear(&self) -> DeliveryResult<()> {
        self.core.clear()
    }

    pub fn size(&self) -> usize {
        self.core.size()
    }

    pub fn is_sending(&self) -> bool {
        self.core.is_sending()
    }
}

impl<A, R, P> Default for Message<A, R, P>
where
    A: Arguments,
    P: Access,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R, P> Drop for Message<A, R, P>
where
    A: Arguments,
    P: Access,
{
    fn drop(&mut self) {
        self.core.clear_unchecked();
    }
}

impl<A, R, P> fmt::Debug for Message<A, R, P>
where
    A: Arguments,
    P: Access,
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Message")
            .field("size", &self.size())
            .field("sending", &self.is_sending())
            .finish()
    }
}
