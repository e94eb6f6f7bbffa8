use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use log::debug;
use rand::Rng;

use crate::observable::event::Event;
use crate::observable::subscriber::{Subscriber, SubscriberError};

/// Accumulates the integer payload stored under the delivered key.
///
/// The running total is atomic because the same observer may be notified
/// from several publishing threads at once.
#[derive(Debug)]
pub struct ExpenseObserver {
    name: String,
    total: AtomicI64,
    notifications: AtomicUsize,
    max_delay: Option<Duration>,
}

impl ExpenseObserver {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            total: AtomicI64::new(0),
            notifications: AtomicUsize::new(0),
            max_delay: None,
        }
    }

    /// Sleeps a random duration up to `max_delay` after every update
    pub fn with_random_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    pub fn total(&self) -> i64 {
        self.total.load(Ordering::SeqCst)
    }

    /// Number of events received, whatever their payload
    pub fn notifications(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }
}

impl Subscriber for ExpenseObserver {
    fn update(&self, event: &Event, key: &str) -> Result<(), SubscriberError> {
        let amount = event.get_i64(key).unwrap_or(0);
        let total = self.total.fetch_add(amount, Ordering::SeqCst) + amount;
        self.notifications.fetch_add(1, Ordering::SeqCst);
        debug!("{} received event '{}' for key '{}', total: {}", self.name, event.name(), key, total);

        if let Some(max) = self.max_delay {
            let millis = max.as_millis() as u64;
            if millis > 0 {
                thread::sleep(Duration::from_millis(rand::rng().random_range(0..=millis)));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
