use std::{cell::Cell, hint::black_box, rc::Rc};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use dovecote::{AllocatorRegistry, ArenaAllocator, Decision, Message, Registry, Tagged};

fn bench_subscribe_drop(c: &mut Criterion) {
    let message: Message<u64> = Message::new();
    let registry = Registry::new();
    c.bench_function("subscribe_drop_by_token", |b| {
        b.iter(|| {
            let token = registry
                .subscribe(&message, |value| {
                    black_box(*value);
                })
                .unwrap();
            black_box(registry.drop_by_token(token).unwrap());
            // вторая половина удаления
            message.send(0);
        })
    });
}

fn bench_send(c: &mut Criterion) {
    let mut group = c.benchmark_group("send");
    for subscribers in [1usize, 10, 100] {
        let message: Message<u64> = Message::new();
        let registry = Registry::new();
        let sum = Rc::new(Cell::new(0u64));
        for _ in 0..subscribers {
            let sum = sum.clone();
            registry
                .subscribe(&message, move |value| sum.set(sum.get().wrapping_add(*value)))
                .unwrap();
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| b.iter(|| message.send(black_box(1u64))),
        );
    }
    group.finish();
}

fn bench_respond_repeat(c: &mut Criterion) {
    let message: Message<Tagged<u64>> = Message::new();
    let registry = Registry::new();
    for write in 0..10u64 {
        registry
            .subscribe(&message, move |value: &Tagged<u64>| {
                if value.is_original() {
                    value.set(write);
                }
            })
            .unwrap();
    }

    c.bench_function("respond_repeat_10", |b| {
        b.iter(|| {
            let value = Tagged::new(0u64);
            message.respond(&value, |()| value.settle());
            black_box(value.get())
        })
    });
}

fn bench_arena_registry(c: &mut Criterion) {
    c.bench_function("arena_registry_100_subscriptions", |b| {
        b.iter(|| {
            let message: Message<u64> = Message::new();
            let registry = AllocatorRegistry::new(ArenaAllocator::new(1 << 16));
            for _ in 0..100 {
                registry.subscribe(&message, |_| ()).unwrap();
            }
            message.respond(1, |()| Decision::Progress);
            black_box(registry.used_memory())
        })
    });
}

criterion_group!(
    benches,
    bench_subscribe_drop,
    bench_send,
    bench_respond_repeat,
    bench_arena_registry
);
criterion_main!(benches);
