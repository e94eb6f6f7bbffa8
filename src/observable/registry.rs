//! Topic registry with snapshot dispatch.
//!
//! A single mutex guards the topic → subscriber mapping. Every operation
//! holds it only while reading or mutating the mapping; `publish` copies the
//! subscriber list under the lock and invokes callbacks after releasing it.
//! Consequences:
//! - a slow subscriber never stalls registration or other publishers
//! - a callback may subscribe/unsubscribe reentrantly without deadlocking
//! - an unsubscribe that lands after the copy does not cancel the in-flight
//!   delivery, and a subscribe that lands after it is not part of it

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use log::{debug, info, warn};
use smallvec::SmallVec;

use crate::error::{PublishError, RegistryError};
use crate::observable::config::{DuplicatePolicy, EmptyTopicPolicy, RegistryConfig};
use crate::observable::event::Event;
use crate::observable::snapshot::Snapshot;
use crate::observable::subscriber::{AsSubscriber, Subscriber};
use crate::observable::types::{SubscriberRef, Subscriptions, Topic};

/// Thread-safe publish/subscribe registry keyed by topic
#[derive(Default)]
pub struct Registry {
    topics: Mutex<Subscriptions>,
    config: RegistryConfig,
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        info!("Creating registry with {:?}", config);
        Self {
            topics: Mutex::new(Subscriptions::new()),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Adds a subscriber to `key`, creating the topic on first use.
    ///
    /// Under [`DuplicatePolicy::Reject`] a second registration of the same
    /// subscriber fails and leaves the topic untouched.
    pub fn subscribe(&self, subscriber: &impl AsSubscriber, key: &str) -> Result<(), RegistryError> {
        let subscriber = subscriber.to_subscriber();
        let handle: SubscriberRef = Arc::downgrade(&subscriber);

        let mut topics = self.lock();
        let entry = topics.entry(key.to_string()).or_default();
        entry.retain(is_alive);

        if self.config.duplicate_subscribe_policy == DuplicatePolicy::Reject
            && entry.iter().any(|s| Weak::ptr_eq(s, &handle))
        {
            drop(topics);
            warn!("Rejected duplicate subscription of '{}' to topic '{}'", subscriber.name(), key);
            return Err(RegistryError::DuplicateSubscription {
                subscriber: subscriber.name().to_string(),
                topic: key.to_string(),
            });
        }

        entry.push(handle);
        let count = entry.len();
        drop(topics);

        debug!("Added '{}' to topic '{}' ({} subscriber(s))", subscriber.name(), key, count);
        Ok(())
    }

    /// Removes the first registration of `subscriber` from `key`.
    ///
    /// Returns whether anything was removed. Unknown topics and absent
    /// subscribers are a no-op.
    pub fn unsubscribe(&self, subscriber: &impl AsSubscriber, key: &str) -> bool {
        let subscriber = subscriber.to_subscriber();
        let handle: SubscriberRef = Arc::downgrade(&subscriber);

        let mut topics = self.lock();
        let Some(entry) = topics.get_mut(key) else {
            debug!("Topic '{}' not found for unsubscribe", key);
            return false;
        };

        let removed = match entry.iter().position(|s| Weak::ptr_eq(s, &handle)) {
            Some(pos) => {
                entry.remove(pos);
                true
            }
            None => false,
        };
        entry.retain(is_alive);
        let pruned = self.prune_if_empty(&mut topics, key);
        drop(topics);

        if removed {
            debug!("Removed '{}' from topic '{}'", subscriber.name(), key);
        }
        if pruned {
            debug!("Removed empty topic '{}'", key);
        }
        removed
    }

    /// Removes every registration of `subscriber` across all topics.
    ///
    /// Returns the number of registrations removed.
    pub fn unsubscribe_all(&self, subscriber: &impl AsSubscriber) -> usize {
        let subscriber = subscriber.to_subscriber();
        let handle: SubscriberRef = Arc::downgrade(&subscriber);

        let mut topics = self.lock();
        let mut removed = 0;
        for entry in topics.values_mut() {
            let before = entry.len();
            entry.retain(|s| !Weak::ptr_eq(s, &handle) && is_alive(s));
            removed += before - entry.len();
        }
        if self.config.empty_topic_policy == EmptyTopicPolicy::Prune {
            topics.retain(|_, entry| !entry.is_empty());
        }
        drop(topics);

        info!("Unsubscribed '{}' from all topics ({} registration(s))", subscriber.name(), removed);
        removed
    }

    /// Copies the live subscribers of `key` under the lock.
    ///
    /// Handles whose subscriber has been dropped are cleaned up on the way.
    pub fn snapshot(&self, key: &str) -> Snapshot {
        let mut topics = self.lock();
        let Some(entry) = topics.get_mut(key) else {
            return Snapshot::empty(key.to_string());
        };

        let mut live: SmallVec<[Arc<dyn Subscriber>; 8]> = SmallVec::with_capacity(entry.len());
        let mut stale = false;
        for handle in entry.iter() {
            match handle.upgrade() {
                Some(subscriber) => live.push(subscriber),
                None => stale = true,
            }
        }
        if stale {
            entry.retain(is_alive);
            self.prune_if_empty(&mut topics, key);
        }

        Snapshot::new(key.to_string(), live)
    }

    /// Notifies every subscriber of `key` that was registered when the call
    /// took its snapshot.
    ///
    /// Runs synchronously on the calling thread, in subscription order.
    /// Failures are handled according to the configured failure policy.
    pub fn publish(&self, event: &Event, key: &str) -> Result<(), PublishError> {
        let snapshot = self.snapshot(key);
        if snapshot.is_empty() {
            debug!("No subscribers for topic '{}', dropping event '{}'", key, event.name());
            return Ok(());
        }

        snapshot.deliver(event, self.config.failure_policy)
    }

    /// Number of live registrations for `key`
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.lock()
            .get(key)
            .map_or(0, |entry| entry.iter().filter(|s| is_alive(s)).count())
    }

    pub fn contains(&self, subscriber: &impl AsSubscriber, key: &str) -> bool {
        let handle: SubscriberRef = Arc::downgrade(&subscriber.to_subscriber());
        self.lock()
            .get(key)
            .is_some_and(|entry| entry.iter().any(|s| Weak::ptr_eq(s, &handle)))
    }

    /// All topic keys currently present
    pub fn topics(&self) -> Vec<Topic> {
        self.lock().keys().cloned().collect()
    }

    pub fn topic_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Subscriptions> {
        // Callbacks never run under this lock, so poisoning means a bug in the registry itself.
        self.topics.lock().expect("subscription map lock poisoned")
    }

    fn prune_if_empty(&self, topics: &mut Subscriptions, key: &str) -> bool {
        if self.config.empty_topic_policy == EmptyTopicPolicy::Prune
            && topics.get(key).is_some_and(Vec::is_empty)
        {
            topics.remove(key);
            return true;
        }
        false
    }
}

fn is_alive(handle: &SubscriberRef) -> bool {
    handle.strong_count() > 0
}
