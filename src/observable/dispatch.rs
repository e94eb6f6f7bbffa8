//! Asynchronous publishing on top of the registry.
//!
//! A publish becomes a task: [`Dispatcher::submit`] captures the snapshot
//! right away, then hands delivery to a blocking worker of the tokio
//! runtime. The returned [`PublishTask`] can be awaited or cancelled.
//!
//! Completion semantics: [`PublishTask::wait`] resolves after every
//! subscriber of the snapshot has been called (or the task was cancelled).
//! Within one task, subscribers are called sequentially in snapshot order.
//! Separate tasks run concurrently, bounded by `max_in_flight`.
//!
//! The semaphore only bounds how many deliveries run at once. The registry
//! mapping itself stays protected by the registry mutex.

use std::sync::Arc;

use log::{debug, info};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{ErrorCode, ObservableError, PublishError};
use crate::observable::config::DispatchConfig;
use crate::observable::event::Event;
use crate::observable::registry::Registry;
use crate::observable::types::Topic;

pub struct Dispatcher {
    registry: Arc<Registry>,
    runtime: Handle,
    permits: Arc<Semaphore>,
    max_in_flight: usize,
    shutdown: CancellationToken,
}

impl Dispatcher {
    /// Creates a dispatcher bound to the current tokio runtime
    pub fn new(registry: Arc<Registry>, config: &DispatchConfig) -> Result<Self, ObservableError> {
        let runtime = Handle::try_current().map_err(|e| {
            ObservableError::new(ErrorCode::InternalError, format!("Dispatcher needs a tokio runtime: {}", e))
        })?;
        let max_in_flight = config.max_in_flight.max(1);

        info!("Dispatcher started (max {} deliveries in flight)", max_in_flight);
        Ok(Self {
            registry,
            runtime,
            permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Snapshots `key` now and schedules delivery of `event`
    pub fn submit(&self, event: Event, key: &str) -> PublishTask {
        let id = Uuid::new_v4();
        let snapshot = self.registry.snapshot(key);
        let policy = self.registry.config().failure_policy;
        let cancel = self.shutdown.child_token();
        let token = cancel.clone();
        let permits = Arc::clone(&self.permits);

        debug!("Submitting publish {} of '{}' to topic '{}' ({} subscriber(s))", id, event.name(), key, snapshot.len());

        let handle: JoinHandle<Result<(), PublishError>> = self.runtime.spawn(async move {
            if snapshot.is_empty() {
                return Ok(());
            }

            let _permit = tokio::select! {
                permit = permits.acquire_owned() => permit.map_err(|e| PublishError::Internal(e.to_string()))?,
                _ = token.cancelled() => {
                    return Err(PublishError::Cancelled {
                        topic: snapshot.topic().to_string(),
                        delivered: 0,
                        skipped: snapshot.len(),
                        failures: Vec::new(),
                    });
                }
            };

            tokio::task::spawn_blocking(move || snapshot.deliver_until(&event, policy, &token))
                .await
                .map_err(|e| PublishError::Internal(format!("delivery worker failed: {}", e)))?
        });

        PublishTask {
            id,
            topic: key.to_string(),
            cancel,
            handle,
        }
    }

    /// Submits and waits for completion
    pub async fn publish(&self, event: Event, key: &str) -> Result<(), PublishError> {
        self.submit(event, key).wait().await
    }

    /// Deliveries currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.permits.available_permits()
    }

    /// Cancels every outstanding task; subscribers not yet called are skipped
    pub fn shutdown(&self) {
        info!("Dispatcher shutting down");
        self.shutdown.cancel();
    }
}

/// Handle to one submitted publish
#[must_use = "a PublishTask should be awaited or explicitly cancelled"]
pub struct PublishTask {
    id: Uuid,
    topic: Topic,
    cancel: CancellationToken,
    handle: JoinHandle<Result<(), PublishError>>,
}

impl PublishTask {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Skips the subscribers that have not been called yet.
    ///
    /// A callback already running is allowed to finish.
    pub fn cancel(&self) {
        debug!("Cancelling publish {}", self.id);
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits until every subscriber of the snapshot has been handled
    pub async fn wait(self) -> Result<(), PublishError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(PublishError::Internal(format!("publish task {} failed: {}", self.id, e))),
        }
    }
}
