use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::observable::event::Event;

/// Error returned by a subscriber callback
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SubscriberError(String);

impl SubscriberError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<String> for SubscriberError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for SubscriberError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// Trait for anything that wants to be notified about a topic.
///
/// Identity is the shared allocation: two subscribers with identical state
/// are still distinct registrations. `update` runs on the publishing thread,
/// outside the registry lock, so it may block or call back into the registry.
/// State shared across topics or threads must be synchronised by the
/// subscriber itself.
pub trait Subscriber: Send + Sync {
    fn update(&self, event: &Event, key: &str) -> Result<(), SubscriberError>;

    /// Label used in logs and failure reports
    fn name(&self) -> &str {
        "subscriber"
    }
}

/// Conversion into the shared handle the registry works with.
///
/// Implemented for `Arc<S>` of any concrete subscriber and for
/// `Arc<dyn Subscriber>`, so callers keep their concrete type.
pub trait AsSubscriber {
    fn to_subscriber(&self) -> Arc<dyn Subscriber>;
}

impl<S: Subscriber + 'static> AsSubscriber for Arc<S> {
    fn to_subscriber(&self) -> Arc<dyn Subscriber> {
        self.clone()
    }
}

impl AsSubscriber for Arc<dyn Subscriber> {
    fn to_subscriber(&self) -> Arc<dyn Subscriber> {
        Arc::clone(self)
    }
}

/// Subscriber backed by a closure
pub struct FnSubscriber<F> {
    name: String,
    callback: F,
}

impl<F> FnSubscriber<F>
where
    F: Fn(&Event, &str) -> Result<(), SubscriberError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

impl<F> Subscriber for FnSubscriber<F>
where
    F: Fn(&Event, &str) -> Result<(), SubscriberError> + Send + Sync,
{
    fn update(&self, event: &Event, key: &str) -> Result<(), SubscriberError> {
        (self.callback)(event, key)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnSubscriber<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSubscriber").field("name", &self.name).finish()
    }
}
