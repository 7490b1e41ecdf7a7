#![no_main]

use std::{cell::Cell, rc::Rc};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use dovecote::{ContactToken, Decision, FixedArena, HeapAllocator, Message, Registry};

#[derive(Debug, Arbitrary)]
enum FuzzOp {
    Subscribe { message: u8, eager: bool, arena: bool },
    Send { message: u8 },
    RespondFinish { message: u8 },
    RespondDead { message: u8 },
    DropViaRegistry { pick: u8 },
    DropViaMessage { pick: u8 },
    ClearMessage { message: u8 },
    ClearRegistry,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    ops: Vec<FuzzOp>,
    registry_first: bool,
}

const MESSAGES: usize = 3;

fuzz_target!(|input: FuzzInput| {
    let heap = Rc::new(HeapAllocator::new());
    let arena = Rc::new(FixedArena::<2048>::new());
    let messages: Vec<Message<u8>> = (0..MESSAGES).map(|_| Message::new()).collect();
    let registry = Registry::new();
    let calls = Rc::new(Cell::new(0usize));
    let mut tokens: Vec<(ContactToken, usize)> = Vec::new();

    for op in input.ops {
        match op {
            FuzzOp::Subscribe {
                message,
                eager,
                arena: use_arena,
            } => {
                let index = usize::from(message) % MESSAGES;
                let counter = calls.clone();
                let mut delivery = registry.deliver(&messages[index]);
                delivery = if use_arena {
                    delivery.with_allocator(arena.clone())
                } else {
                    delivery.with_allocator(heap.clone())
                };
                if eager {
                    delivery = delivery.eager();
                }
                // исчерпание арены - допустимый исход
                if let Ok(token) = delivery.to(move |_| counter.set(counter.get() + 1)) {
                    tokens.push((token, index));
                }
            }
            FuzzOp::Send { message } => {
                messages[usize::from(message) % MESSAGES].send(message);
            }
            FuzzOp::RespondFinish { message } => {
                messages[usize::from(message) % MESSAGES].respond(message, |()| Decision::Finish);
            }
            FuzzOp::RespondDead { message } => {
                messages[usize::from(message) % MESSAGES].respond(message, |()| Decision::Dead);
            }
            FuzzOp::DropViaRegistry { pick } if !tokens.is_empty() => {
                let (token, _) = tokens[usize::from(pick) % tokens.len()];
                registry.drop_by_token(token).unwrap();
            }
            FuzzOp::DropViaMessage { pick } if !tokens.is_empty() => {
                let (token, index) = tokens[usize::from(pick) % tokens.len()];
                messages[index].drop_by_token(token).unwrap();
            }
            FuzzOp::ClearMessage { message } => {
                messages[usize::from(message) % MESSAGES].clear().unwrap();
            }
            FuzzOp::ClearRegistry => registry.clear(),
            FuzzOp::DropViaRegistry { .. } | FuzzOp::DropViaMessage { .. } => {}
        }

        let linked: usize = messages.iter().map(|message| message.size()).sum();
        assert_eq!(registry.size().unwrap(), linked);
    }

    if input.registry_first {
        drop(registry);
        drop(messages);
    } else {
        drop(messages);
        drop(registry);
    }

    // каждый узел из кучи возвращён ровно один раз
    assert_eq!(heap.live(), 0);
    assert_eq!(heap.allocations(), heap.deallocations());
    assert_eq!(Rc::strong_count(&heap), 1);
    assert_eq!(Rc::strong_count(&arena), 1);
    assert_eq!(Rc::strong_count(&calls), 1);
});
