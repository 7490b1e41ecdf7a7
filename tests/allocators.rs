//! Учёт памяти узлов подписок.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use dovecote::{
    pubsub::round_up, AllocError, Allocator, AllocatorRegistry, ArenaAllocator,
    BoundedAllocator, ContactToken, DeliveryError, FixedArena, HeapAllocator, Message, Registry,
    Settings,
};

/// Тест проверяет учёт арены фиксированной ёмкости и отказ при её
/// исчерпании.
#[test]
fn test_fixed_arena_accounting() {
    const N: usize = 1024;
    let slot = round_up(Message::<i32>::node_size());
    let registry = AllocatorRegistry::new(FixedArena::<N>::new());
    let message: Message<i32> = Message::new();

    assert_eq!(registry.total_memory(), N);
    assert_eq!(registry.available_memory(), N);

    registry.subscribe(&message, |_| ()).unwrap();
    assert_eq!(registry.used_memory(), slot);
    registry.subscribe(&message, |_| ()).unwrap();
    assert_eq!(registry.used_memory(), 2 * slot);
    assert_eq!(registry.available_memory(), N - 2 * slot);

    let mut subscribed = 2;
    let err = loop {
        match registry.subscribe(&message, |_| ()) {
            Ok(_) => subscribed += 1,
            Err(err) => break err,
        }
    };

    assert_eq!(subscribed, N / slot);
    assert_eq!(
        err,
        DeliveryError::OutOfMemory(AllocError::OutOfMemory {
            requested: slot,
            available: N - subscribed * slot,
        })
    );
    assert_eq!(message.size(), subscribed);
    assert_eq!(registry.size(), Ok(subscribed));
}

/// Тест проверяет, что арена не возвращает место при удалении подписок.
#[test]
fn test_arena_never_reclaims() {
    let slot = round_up(Message::<()>::node_size());
    let registry = AllocatorRegistry::new(ArenaAllocator::new(4 * slot));
    let message: Message<()> = Message::new();

    let token = registry.subscribe(&message, |_| ()).unwrap();
    assert_eq!(registry.drop_by_token(token), Ok(true));
    assert_eq!(message.size(), 0);
    assert_eq!(registry.used_memory(), slot);

    registry.subscribe(&message, |_| ()).unwrap();
    assert_eq!(registry.used_memory(), 2 * slot);
}

/// Тест проверяет немедленный возврат памяти для каждого порядка
/// удаления в реестре со своим аллокатором.
#[test]
fn test_allocator_registry_releases_eagerly() {
    let registry = AllocatorRegistry::new(HeapAllocator::new());
    let first: Message<u8> = Message::new();
    let second: Message<u8> = Message::new();

    let token = registry.subscribe(&first, |_| ()).unwrap();
    registry.subscribe(&first, |_| ()).unwrap();
    registry.subscribe(&second, |_| ()).unwrap();
    assert_eq!(registry.allocator().live(), 3);

    // удаление со стороны реестра
    registry.drop_by_token(token).unwrap();
    assert_eq!(registry.allocator().live(), 2);

    // удаление со стороны сообщения
    drop(first);
    assert_eq!(registry.allocator().live(), 1);
    assert_eq!(registry.size(), Ok(1));

    registry.clear();
    assert_eq!(registry.allocator().live(), 0);
    assert_eq!(second.size(), 0);
    assert_eq!(registry.allocator().allocations(), 3);
    assert_eq!(registry.allocator().deallocations(), 3);
}

/// Тест проверяет, что аллокатор переживает все узлы, даже если реестр
/// уничтожен раньше сообщения.
#[test]
fn test_allocator_outlives_nodes() {
    let heap = Rc::new(HeapAllocator::new());
    let message: Message<()> = Message::new();
    {
        let registry = Registry::new();
        registry
            .deliver(&message)
            .with_allocator(heap.clone())
            .to(|_| ())
            .unwrap();
    }
    // узел ещё в списке сообщения и держит аллокатор
    assert_eq!(Rc::strong_count(&heap), 2);
    assert_eq!(heap.live(), 1);

    message.send(());
    assert_eq!(heap.live(), 0);
    assert_eq!(Rc::strong_count(&heap), 1);
}

/// Тест проверяет колбэк удаления в реестре со своим аллокатором.
#[test]
fn test_on_drop_in_allocator_registry() {
    let registry = AllocatorRegistry::new(HeapAllocator::new());
    let message: Message<()> = Message::new();
    let dropped = Rc::new(Cell::new(0));
    let counter = dropped.clone();

    registry
        .deliver(&message)
        .on_drop(move |_, _| counter.set(counter.get() + 1))
        .to(|_| ())
        .unwrap();

    message.clear().unwrap();
    assert_eq!(dropped.get(), 1);
    assert_eq!(registry.allocator().live(), 0);
    assert_eq!(registry.size(), Ok(0));
}

/// Тест проверяет арену с ёмкостью из настроек.
#[test]
fn test_arena_from_settings() {
    let settings = Settings {
        arena_capacity: 256,
        ..Default::default()
    };
    let arena = ArenaAllocator::from_settings(&settings);
    assert_eq!(arena.capacity(), 256);
    assert_eq!(arena.available(), 256);
}

/// Тест проверяет, что узел хранится в том аллокаторе, который его
/// разместил, и возвращается именно ему.
#[test]
fn test_nodes_live_in_their_allocator() {
    let left = Rc::new(HeapAllocator::new());
    let right = Rc::new(HeapAllocator::new());
    let message: Message<u16> = Message::new();
    let registry = Registry::new();

    let token = registry
        .deliver(&message)
        .with_allocator(left.clone())
        .eager()
        .to(|_| ())
        .unwrap();
    registry
        .deliver(&message)
        .with_allocator(right.clone())
        .to(|_| ())
        .unwrap();

    assert_eq!(left.nodes().len(), 1);
    assert_eq!(right.nodes().len(), 1);
    assert!(registry.heap().nodes().is_empty());

    registry.drop_by_token(token).unwrap();
    assert!(left.nodes().is_empty());
    assert_eq!(right.nodes().len(), 1);

    drop(message);
    assert_eq!(right.nodes().len(), 1, "реестр ещё держит свою половину");
    drop(registry);
    assert!(right.nodes().is_empty());
    assert_eq!(Rc::strong_count(&right), 1);
}

/// Тест проверяет, что арена хранит разрушенные узлы до собственного
/// уничтожения.
#[test]
fn test_arena_keeps_destroyed_nodes() {
    let registry = AllocatorRegistry::new(ArenaAllocator::new(1024));
    let message: Message<()> = Message::new();

    let token = registry.subscribe(&message, |_| ()).unwrap();
    registry.subscribe(&message, |_| ()).unwrap();
    assert_eq!(registry.allocator().nodes().live(), 2);

    registry.drop_by_token(token).unwrap();
    assert_eq!(registry.allocator().nodes().len(), 2);
    assert_eq!(registry.allocator().nodes().live(), 1);
}

/// Тест проверяет, что подписка, удалённая реестром во время рассылки
/// уже после вызова её обработчика, возвращает память сразу по окончании
/// рассылки.
#[test]
fn test_drop_during_dispatch_released_after_send() {
    let registry = Rc::new(AllocatorRegistry::new(HeapAllocator::new()));
    let message: Message<()> = Message::new();
    let passed: Rc<Cell<Option<ContactToken>>> = Rc::default();

    let (inner, target) = (Rc::downgrade(&registry), passed.clone());
    registry
        .subscribe(&message, move |_| {
            if let (Some(registry), Some(token)) = (inner.upgrade(), target.take()) {
                registry.drop_by_token(token).unwrap();
            }
        })
        .unwrap();
    let calls = Rc::new(RefCell::new(0));
    let counter = calls.clone();
    let token = registry
        .subscribe(&message, move |_| *counter.borrow_mut() += 1)
        .unwrap();
    passed.set(Some(token));
    assert_eq!(registry.allocator().live(), 2);

    message.send(());
    assert_eq!(*calls.borrow(), 1);
    assert_eq!(message.size(), 1);
    assert_eq!(registry.size(), Ok(1));
    assert_eq!(registry.allocator().live(), 1);
    assert_eq!(registry.allocator().nodes().len(), 1);
}
