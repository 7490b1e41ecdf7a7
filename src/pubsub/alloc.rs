//! Стратегии размещения узлов подписок.
//!
//! Аллокатор выдаёт участок под узел и хранит сам узел в своём
//! [`NodeStore`]; списки сообщения и реестра держат только идентификатор и
//! слабую ссылку. Узел возвращается аллокатору ровно один раз, в момент
//! окончательного разрушения. Пока узел жив, он держит `Rc` на свой
//! аллокатор, поэтому аллокатор переживает все выданные им участки.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt,
    rc::Rc,
};

use dovecote_error::AllocError;
use tracing::trace;

use super::contact::{Contact, DropState};
use crate::{config::Settings, error::log_error};

/// Минимальное выравнивание участка в арене.
pub const MIN_ALIGNMENT: usize = std::mem::size_of::<usize>();

/// Округляет размер вверх до [`MIN_ALIGNMENT`].
pub fn round_up(bytes: usize) -> usize {
    bytes.div_ceil(MIN_ALIGNMENT) * MIN_ALIGNMENT
}

/// Участок, выданный аллокатором.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    offset: usize,
    len: usize,
}

impl Slot {
    pub fn new(
        offset: usize,
        len: usize,
    ) -> Self {
        Self { offset, len }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Узлы, размещённые одним аллокатором, по выданным им участкам.
#[derive(Default)]
pub struct NodeStore {
    nodes: RefCell<HashMap<Slot, Rc<dyn Contact>>>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Количество хранимых узлов, включая разрушенные, но ещё не
    /// вытесненные.
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Узлы, которые ещё не разрушены окончательно.
    pub fn live(&self) -> usize {
        self.nodes
            .borrow()
            .values()
            .filter(|node| node.core().state() != DropState::Destroyed)
            .count()
    }

    pub(crate) fn insert(
        &self,
        slot: Slot,
        node: Rc<dyn Contact>,
    ) {
        self.nodes.borrow_mut().insert(slot, node);
    }

    /// Убирает узел из хранилища. `false`, если на этом участке узла нет.
    pub fn evict(
        &self,
        slot: Slot,
    ) -> bool {
        // Узел уничтожается уже после снятия заёма.
        let node = self.nodes.borrow_mut().remove(&slot);
        node.is_some()
    }
}

impl fmt::Debug for NodeStore {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("NodeStore")
            .field("len", &self.len())
            .field("live", &self.live())
            .finish()
    }
}

/// Стратегия размещения узлов подписок.
///
/// `deallocate` может ничего не делать (арена освобождает всё разом при
/// собственном уничтожении). Аллокатор, который возвращает память сразу,
/// вытесняет узел из [`NodeStore`] в `deallocate`.
pub trait Allocator {
    fn allocate(
        &self,
        bytes: usize,
    ) -> Result<Slot, AllocError>;

    fn deallocate(
        &self,
        slot: Slot,
        bytes: usize,
    );

    /// Хранилище узлов, размещённых этим аллокатором.
    fn nodes(&self) -> &NodeStore;
}

/// Аллокатор фиксированной ёмкости, умеющий отчитаться о занятом месте.
pub trait BoundedAllocator: Allocator {
    fn capacity(&self) -> usize;

    fn used(&self) -> usize;

    fn available(&self) -> usize {
        self.capacity().saturating_sub(self.used())
    }
}

/// Участок, принадлежащий конкретному узлу, вместе с аллокатором, который
/// его выдал.
pub(crate) struct Lease {
    allocator: Rc<dyn Allocator>,
    slot: Slot,
    bytes: usize,
}

impl Lease {
    pub(crate) fn acquire(
        allocator: Rc<dyn Allocator>,
        bytes: usize,
    ) -> Result<Self, AllocError> {
        let slot = allocator.allocate(bytes)?;
        Ok(Self {
            allocator,
            slot,
            bytes,
        })
    }

    /// Передаёт узел во владение аллокатору.
    pub(crate) fn place(
        &self,
        node: Rc<dyn Contact>,
    ) {
        self.allocator.nodes().insert(self.slot, node);
    }

    /// Возвращает участок аллокатору. Потребляет `self`, поэтому повторный
    /// возврат невозможен.
    pub(crate) fn release(self) {
        trace!(offset = self.slot.offset, bytes = self.bytes, "slot released");
        self.allocator.deallocate(self.slot, self.bytes);
    }
}

/// Аллокатор «из кучи» с подсчётом выделений.
///
/// Узел хранится, пока не будет разрушен, и вытесняется сразу при
/// возврате участка. Такой аллокатор есть у каждого [`Registry`] для
/// подписок без явного аллокатора.
///
/// [`Registry`]: super::Registry
#[derive(Debug, Default)]
pub struct HeapAllocator {
    allocations: Cell<usize>,
    deallocations: Cell<usize>,
    bytes_in_use: Cell<usize>,
    next_offset: Cell<usize>,
    nodes: NodeStore,
}

impl HeapAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocations(&self) -> usize {
        self.allocations.get()
    }

    pub fn deallocations(&self) -> usize {
        self.deallocations.get()
    }

    /// Количество участков, которые ещё не возвращены.
    pub fn live(&self) -> usize {
        self.allocations() - self.deallocations()
    }

    pub fn bytes_in_use(&self) -> usize {
        self.bytes_in_use.get()
    }
}

impl Allocator for HeapAllocator {
    fn allocate(
        &self,
        bytes: usize,
    ) -> Result<Slot, AllocError> {
        let offset = self.next_offset.get();
        self.next_offset.set(offset + bytes);
        self.allocations.set(self.allocations.get() + 1);
        self.bytes_in_use.set(self.bytes_in_use.get() + bytes);
        Ok(Slot::new(offset, bytes))
    }

    fn deallocate(
        &self,
        slot: Slot,
        bytes: usize,
    ) {
        self.nodes.evict(slot);
        self.deallocations.set(self.deallocations.get() + 1);
        self.bytes_in_use
            .set(self.bytes_in_use.get().saturating_sub(bytes));
    }

    fn nodes(&self) -> &NodeStore {
        &self.nodes
    }
}

/// Сдвигает курсор арены на округлённый размер или сообщает о нехватке.
fn bump(
    cursor: &Cell<usize>,
    capacity: usize,
    bytes: usize,
) -> Result<Slot, AllocError> {
    let offset = cursor.get();
    let len = round_up(bytes);
    let available = capacity.saturating_sub(offset);
    if len > available {
        let err = AllocError::OutOfMemory {
            requested: len,
            available,
        };
        log_error(&err);
        return Err(err);
    }
    cursor.set(offset + len);
    Ok(Slot::new(offset, len))
}

/// Арена с ёмкостью, заданной во время выполнения.
///
/// Выделение сдвигает курсор; `deallocate` ничего не делает. Разрушенные
/// узлы остаются в арене и освобождаются только вместе с ней.
#[derive(Debug)]
pub struct ArenaAllocator {
    capacity: usize,
    cursor: Cell<usize>,
    nodes: NodeStore,
}

impl ArenaAllocator {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            cursor: Cell::new(0),
            nodes: NodeStore::new(),
        }
    }

    /// Арена с ёмкостью из настроек (`arena_capacity`).
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.arena_capacity)
    }
}

impl Allocator for ArenaAllocator {
    fn allocate(
        &self,
        bytes: usize,
    ) -> Result<Slot, AllocError> {
        bump(&self.cursor, self.capacity, bytes)
    }

    fn deallocate(
        &self,
        _slot: Slot,
        _bytes: usize,
    ) {
    }

    fn nodes(&self) -> &NodeStore {
        &self.nodes
    }
}

impl BoundedAllocator for ArenaAllocator {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn used(&self) -> usize {
        self.cursor.get()
    }
}

/// Арена с ёмкостью `N`, известной на этапе компиляции.
#[derive(Debug, Default)]
pub struct FixedArena<const N: usize> {
    cursor: Cell<usize>,
    nodes: NodeStore,
}

impl<const N: usize> FixedArena<N> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<const N: usize> Allocator for FixedArena<N> {
    fn allocate(
        &self,
        bytes: usize,
    ) -> Result<Slot, AllocError> {
        bump(&self.cursor, N, bytes)
    }

    fn deallocate(
        &self,
        _slot: Slot,
        _bytes: usize,
    ) {
    }

    fn nodes(&self) -> &NodeStore {
        &self.nodes
    }
}

impl<const N: usize> BoundedAllocator for FixedArena<N> {
    fn capacity(&self) -> usize {
        N
    }

    fn used(&self) -> usize {
        self.cursor.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubsub::{contact::ContactCore, sender::SenderNode};

    fn node() -> Rc<dyn Contact> {
        Rc::new(SenderNode::<(), ()>::new(
            ContactCore::new(None, None),
            Box::new(|_| ()),
        ))
    }

    /// Тест проверяет округление до выравнивания.
    #[test]
    fn test_round_up() {
        assert_eq!(round_up(0), 0);
        assert_eq!(round_up(1), MIN_ALIGNMENT);
        assert_eq!(round_up(MIN_ALIGNMENT), MIN_ALIGNMENT);
        assert_eq!(round_up(MIN_ALIGNMENT + 1), 2 * MIN_ALIGNMENT);
    }

    /// Тест проверяет учёт арены и отказ при исчерпании без порчи курсора.
    #[test]
    fn test_arena_accounting_and_exhaustion() {
        let slot = round_up(20);
        let arena = ArenaAllocator::new(2 * slot);
        assert_eq!(arena.available(), 2 * slot);

        let first = arena.allocate(20).unwrap();
        assert_eq!(first.offset(), 0);
        assert_eq!(first.len(), slot);
        let second = arena.allocate(20).unwrap();
        assert_eq!(second.offset(), slot);
        assert_eq!(arena.available(), 0);

        let err = arena.allocate(20).unwrap_err();
        assert_eq!(
            err,
            AllocError::OutOfMemory {
                requested: slot,
                available: 0
            }
        );
        assert_eq!(arena.used(), 2 * slot);

        // no-op deallocate: место не возвращается
        arena.deallocate(first, 20);
        assert_eq!(arena.used(), 2 * slot);
    }

    /// Тест проверяет арену с ёмкостью времени компиляции.
    #[test]
    fn test_fixed_arena() {
        let arena = FixedArena::<100>::new();
        assert_eq!(arena.capacity(), 100);
        assert_eq!(arena.available(), 100);

        arena.allocate(24).unwrap();
        assert_eq!(arena.used(), round_up(24));
        assert!(arena.allocate(1000).is_err());
        assert_eq!(arena.used(), round_up(24));
    }

    /// Тест проверяет счётчики кучи.
    #[test]
    fn test_heap_counters() {
        let heap = HeapAllocator::new();
        let a = heap.allocate(32).unwrap();
        let _b = heap.allocate(16).unwrap();
        assert_eq!(heap.allocations(), 2);
        assert_eq!(heap.bytes_in_use(), 48);

        heap.deallocate(a, 32);
        assert_eq!(heap.deallocations(), 1);
        assert_eq!(heap.live(), 1);
        assert_eq!(heap.bytes_in_use(), 16);
    }

    /// Тест проверяет, что аренда возвращает участок ровно один раз.
    #[test]
    fn test_lease_release() {
        let heap = Rc::new(HeapAllocator::new());
        let lease = Lease::acquire(heap.clone(), 40).unwrap();
        assert_eq!(heap.live(), 1);
        lease.release();
        assert_eq!(heap.live(), 0);
        assert_eq!(heap.deallocations(), 1);
    }

    /// Тест проверяет, что куча вытесняет узел при возврате участка, а
    /// арена оставляет его у себя до собственного уничтожения.
    #[test]
    fn test_node_store_eviction() {
        let heap = HeapAllocator::new();
        let slot = heap.allocate(16).unwrap();
        heap.nodes().insert(slot, node());
        assert_eq!(heap.nodes().len(), 1);
        assert_eq!(heap.nodes().live(), 1);

        heap.deallocate(slot, 16);
        assert!(heap.nodes().is_empty());
        assert!(!heap.nodes().evict(slot));

        let arena = ArenaAllocator::new(64);
        let slot = arena.allocate(16).unwrap();
        let stored = node();
        arena.nodes().insert(slot, stored.clone());
        arena.deallocate(slot, 16);
        assert_eq!(arena.nodes().len(), 1);
        assert_eq!(Rc::strong_count(&stored), 2);

        drop(arena);
        assert_eq!(Rc::strong_count(&stored), 1);
    }
}
