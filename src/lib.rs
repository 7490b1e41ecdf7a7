//! In-process, single-threaded message delivery.
//!
//! A [`Message`] is a typed channel; a [`Registry`] holds every subscription
//! made by one subscriber. A subscription belongs to exactly one of each and
//! is destroyed only after both sides have dropped it, in any order. Neither
//! side ever observes a dangling handler, and nobody has to unsubscribe by
//! hand on teardown.
//!
//! ```
//! use dovecote::{Message, Registry, Tagged};
//!
//! let message: Message<Tagged<i32>> = Message::new();
//! let registry = Registry::new();
//!
//! registry
//!     .subscribe(&message, |value: &Tagged<i32>| {
//!         if value.is_original() {
//!             value.set(42);
//!         }
//!     })
//!     .unwrap();
//!
//! let value = Tagged::new(0);
//! message.respond(&value, |()| value.settle());
//! assert_eq!(value.get(), 42);
//!
//! drop(registry);
//! assert_eq!(message.size(), 0);
//! ```

/// Settings loaded from defaults and `DOVECOTE_*` environment variables.
pub mod config;
/// Error types shared with the `dovecote-error` crate.
pub mod error;
/// `tracing` subscriber setup.
pub mod logging;
/// Messages, registries, subscriptions and allocators.
pub mod pubsub;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Settings.
pub use config::Settings;
/// Operation errors and result types.
pub use error::{AllocError, DeliveryError, DeliveryResult, ErrorExt, StatusCode};
/// Logging setup.
pub use logging::{init_logging, LogFormat, LoggingConfig, LoggingHandle};
/// Delivery API.
pub use pubsub::{
    Access, Allocator, AllocatorRegistry, ArenaAllocator, Arguments, BoundedAllocator, ContactId,
    ContactToken, Decision, Delivery, FixedArena, HeapAllocator, IntoDecision, Message, Open,
    Outlet, Registry, Sealed, Tagged, ValueState, Who,
};
