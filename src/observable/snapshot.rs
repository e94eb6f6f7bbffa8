use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, error, warn};
use smallvec::SmallVec;
use tokio_util::sync::CancellationToken;

use crate::error::{FailureKind, PublishError, SubscriberFailure};
use crate::observable::config::FailurePolicy;
use crate::observable::event::Event;
use crate::observable::subscriber::Subscriber;
use crate::observable::types::Topic;

/// Point-in-time copy of the live subscribers of one topic.
///
/// Holds strong references, so a subscriber removed or dropped after the
/// copy was taken still receives the in-flight event. Taking the copy is
/// the only part of a publish that runs under the registry lock.
pub struct Snapshot {
    topic: Topic,
    subscribers: SmallVec<[Arc<dyn Subscriber>; 8]>,
}

impl Snapshot {
    pub(crate) fn new(topic: Topic, subscribers: SmallVec<[Arc<dyn Subscriber>; 8]>) -> Self {
        Self { topic, subscribers }
    }

    pub(crate) fn empty(topic: Topic) -> Self {
        Self::new(topic, SmallVec::new())
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Subscriber names in delivery order
    pub fn names(&self) -> Vec<String> {
        self.subscribers.iter().map(|s| s.name().to_string()).collect()
    }

    /// Notifies every captured subscriber in insertion order on the calling thread
    pub fn deliver(&self, event: &Event, policy: FailurePolicy) -> Result<(), PublishError> {
        self.run(event, policy, None)
    }

    /// Like [`Snapshot::deliver`], but stops before the next subscriber once `token` fires
    pub fn deliver_until(
        &self,
        event: &Event,
        policy: FailurePolicy,
        token: &CancellationToken,
    ) -> Result<(), PublishError> {
        self.run(event, policy, Some(token))
    }

    fn run(
        &self,
        event: &Event,
        policy: FailurePolicy,
        token: Option<&CancellationToken>,
    ) -> Result<(), PublishError> {
        let total = self.subscribers.len();
        debug!("Delivering event '{}' to {} subscriber(s) of topic '{}'", event.name(), total, self.topic);

        let mut failures = Vec::new();
        for (position, subscriber) in self.subscribers.iter().enumerate() {
            if token.is_some_and(CancellationToken::is_cancelled) {
                debug!("Delivery on topic '{}' cancelled after {}/{} subscribers", self.topic, position, total);
                return Err(PublishError::Cancelled {
                    topic: self.topic.clone(),
                    delivered: position,
                    skipped: total - position,
                    failures,
                });
            }

            let kind = match invoke(subscriber.as_ref(), event, &self.topic) {
                Ok(()) => continue,
                Err(kind) => kind,
            };
            let failure = SubscriberFailure {
                subscriber: subscriber.name().to_string(),
                topic: self.topic.clone(),
                position,
                kind,
            };

            match policy {
                FailurePolicy::Abort => {
                    warn!("Aborting delivery: {}", failure);
                    return Err(PublishError::Aborted {
                        failure,
                        skipped: total - position - 1,
                    });
                }
                FailurePolicy::ContinueAndCollect => {
                    warn!("{}", failure);
                    failures.push(failure);
                }
                FailurePolicy::LogAndContinue => {
                    error!("{}", failure);
                }
            }
        }

        if failures.is_empty() {
            debug!("Event '{}' delivered to all {} subscriber(s)", event.name(), total);
            Ok(())
        } else {
            Err(PublishError::Aggregate {
                topic: self.topic.clone(),
                attempted: total,
                failures,
            })
        }
    }
}

/// Runs one callback, turning a panic into a failure instead of unwinding
fn invoke(subscriber: &dyn Subscriber, event: &Event, key: &str) -> Result<(), FailureKind> {
    match panic::catch_unwind(AssertUnwindSafe(|| subscriber.update(event, key))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(FailureKind::Returned(e)),
        Err(payload) => Err(FailureKind::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
