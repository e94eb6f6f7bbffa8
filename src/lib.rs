//! # observable
//!
//! In-process publish/subscribe registry safe to use from many threads.
//!
//! Subscribers register per topic key. Publishing copies the topic's
//! subscriber list under a single lock and notifies outside of it, so slow
//! subscribers never block registration or publishers on other topics, and
//! callbacks may re-enter the registry.

pub mod error;
pub mod observable;

pub use error::{ErrorCode, ObservableError, PublishError, RegistryError, SubscriberFailure};
pub use observable::config::{Config, DispatchConfig, DuplicatePolicy, EmptyTopicPolicy, FailurePolicy, RegistryConfig};
pub use observable::dispatch::{Dispatcher, PublishTask};
pub use observable::event::Event;
pub use observable::observers::ExpenseObserver;
pub use observable::registry::Registry;
pub use observable::snapshot::Snapshot;
pub use observable::subscriber::{AsSubscriber, FnSubscriber, Subscriber, SubscriberError};
pub use observable::types::Topic;
