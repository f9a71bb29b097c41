//! Fan-out of one save action to the task store.
//!
//! # Responsibility
//! - Issue the gap create, the bulk rank write and the per-item patch of a
//!   [`SaveBatch`] concurrently and collect every error.
//! - Serialize actions touching the same container (single flight per
//!   container) so two drops cannot interleave their writes.
//! - Report failures to subscribers and to the [`SaveTracker`].
//!
//! # Invariants
//! - Container locks are always taken in ascending id order.
//! - A batch with no writes never reaches the store or the tracker.

use super::batch::SaveBatch;
use super::tracker::SaveTracker;
use crate::model::item::{ContainerId, Item, ItemId};
use crate::store::{StoreError, TaskStore};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::future::OptionFuture;
use futures::lock::Mutex as AsyncMutex;
use log::{error, info};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Result of a successful save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReceipt {
    /// Stored record of the synthesized gap, when one was created.
    pub created_gap: Option<Item>,
    pub writes: usize,
}

/// Failure notice broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFailure {
    pub item_id: ItemId,
    pub containers: Vec<ContainerId>,
    pub messages: Vec<String>,
}

/// A save action where at least one store call failed.
///
/// Writes that succeeded are not rolled back.
#[derive(Debug)]
pub struct SaveError {
    pub item_id: ItemId,
    pub containers: Vec<ContainerId>,
    /// Partial result of the calls that did land.
    pub partial: SaveReceipt,
    pub errors: Vec<StoreError>,
}

impl SaveError {
    pub fn to_failure(&self) -> SaveFailure {
        SaveFailure {
            item_id: self.item_id,
            containers: self.containers.clone(),
            messages: self.errors.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Display for SaveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "save for {} failed with {} error(s)",
            self.item_id,
            self.errors.len()
        )?;
        if let Some(first) = self.errors.first() {
            write!(f, ": {first}")?;
        }
        Ok(())
    }
}

impl Error for SaveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.errors.first().map(|err| err as &(dyn Error + 'static))
    }
}

/// Store writer shared by every save action of one board.
pub struct PersistenceBatcher {
    store: Arc<dyn TaskStore>,
    tracker: SaveTracker,
    flights: Mutex<HashMap<ContainerId, Arc<AsyncMutex<()>>>>,
    failure_sinks: Mutex<Vec<UnboundedSender<SaveFailure>>>,
}

impl PersistenceBatcher {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self::with_tracker(store, SaveTracker::new())
    }

    pub fn with_tracker(store: Arc<dyn TaskStore>, tracker: SaveTracker) -> Self {
        Self {
            store,
            tracker,
            flights: Mutex::new(HashMap::new()),
            failure_sinks: Mutex::new(Vec::new()),
        }
    }

    pub fn tracker(&self) -> &SaveTracker {
        &self.tracker
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Receives one [`SaveFailure`] per failed action.
    pub fn subscribe_failures(&self) -> UnboundedReceiver<SaveFailure> {
        let (sender, receiver) = mpsc::unbounded();
        lock(&self.failure_sinks).push(sender);
        receiver
    }

    /// Runs every write of `batch` and waits for all of them.
    ///
    /// # Errors
    /// - `SaveError` listing each failed call; successful calls stay applied.
    pub async fn persist(&self, batch: SaveBatch) -> Result<SaveReceipt, SaveError> {
        if batch.is_empty() {
            return Ok(SaveReceipt::default());
        }

        let lanes = self.flight_lanes(&batch.containers);
        let mut held = Vec::with_capacity(lanes.len());
        for lane in &lanes {
            held.push(lane.lock().await);
        }

        let started_at = Instant::now();
        let action = self.tracker.begin();
        let writes = batch.write_count();
        let SaveBatch {
            item_id,
            containers,
            new_gap,
            order_updates,
            item_patch,
        } = batch;

        let store = &self.store;
        let create: OptionFuture<_> = new_gap.map(|gap| store.create_item(gap)).into();
        let bulk: OptionFuture<_> = (!order_updates.is_empty())
            .then(|| store.update_item_order(order_updates))
            .into();
        let patch: OptionFuture<_> = item_patch
            .map(|patch| store.update_item(item_id, patch))
            .into();
        let (created, bulk, patched) = futures::join!(create, bulk, patch);

        let mut errors = Vec::new();
        let created_gap = match created {
            Some(Ok(item)) => Some(item),
            Some(Err(err)) => {
                errors.push(err);
                None
            }
            None => None,
        };
        errors.extend(bulk.and_then(Result::err));
        errors.extend(patched.and_then(Result::err));

        let duration_ms = started_at.elapsed().as_millis();
        if errors.is_empty() {
            action.succeed();
            info!(
                "event=save_action module=persist status=ok item_id={} containers={} writes={} duration_ms={}",
                item_id,
                containers.len(),
                writes,
                duration_ms
            );
            return Ok(SaveReceipt {
                created_gap,
                writes,
            });
        }

        let err = SaveError {
            item_id,
            containers,
            partial: SaveReceipt {
                created_gap,
                writes: writes - errors.len(),
            },
            errors,
        };
        action.fail(err.to_string());
        error!(
            "event=save_action module=persist status=error item_id={} containers={} writes={} failed={} duration_ms={} error={}",
            err.item_id,
            err.containers.len(),
            writes,
            err.errors.len(),
            duration_ms,
            err
        );
        self.notify(err.to_failure());
        Err(err)
    }

    fn flight_lanes(&self, containers: &[ContainerId]) -> Vec<Arc<AsyncMutex<()>>> {
        let mut ids = containers.to_vec();
        ids.sort();
        ids.dedup();
        let mut flights = lock(&self.flights);
        ids.into_iter()
            .map(|id| Arc::clone(flights.entry(id).or_default()))
            .collect()
    }

    fn notify(&self, failure: SaveFailure) {
        lock(&self.failure_sinks)
            .retain(|sink| sink.unbounded_send(failure.clone()).is_ok());
    }
}

impl std::fmt::Debug for PersistenceBatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceBatcher")
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
