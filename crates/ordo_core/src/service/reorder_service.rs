//! Reordering use-case service.
//!
//! # Responsibility
//! - Front the drag machine with the working set, a clock and a batcher.
//! - Turn committed drops into non-blocking save actions.
//! - Recover from failed saves by re-fetching the touched containers.
//!
//! # Invariants
//! - Local state is updated before any store call is issued.
//! - Save futures own everything they need; the board is only touched again
//!   in [`ReorderService::settle`].

use crate::board::Board;
use crate::config::EngineConfig;
use crate::drag::clock::Clock;
use crate::drag::collision::Collision;
use crate::drag::geometry::DragPointer;
use crate::drag::machine::{DragError, DragMachine, DragOutcome, DragPhase, DragUpdate};
use crate::model::item::{ContainerId, Item, ItemId};
use crate::ordering::groups::reconcile_container;
use crate::ordering::normalize::{normalize_orders, sort_visual};
use crate::persist::{
    PersistenceBatcher, SaveBatch, SaveError, SaveFailure, SaveReceipt, SaveStatus,
};
use crate::store::{ItemPatch, StoreResult, TaskStore};
use futures::channel::mpsc::UnboundedReceiver;
use futures::future::{BoxFuture, FutureExt};
use log::{info, warn};
use std::collections::HashMap;
use std::fmt::Formatter;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A save action handed back to the caller.
///
/// Nothing is written until it is polled; callers await it, spawn it, or
/// pass it to [`ReorderService::settle`].
pub struct PendingSave {
    pub item_id: ItemId,
    pub containers: Vec<ContainerId>,
    /// Client id of a separator created by this save.
    pub temp_gap: Option<ItemId>,
    future: BoxFuture<'static, Result<SaveReceipt, SaveError>>,
}

impl Future for PendingSave {
    type Output = Result<SaveReceipt, SaveError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for PendingSave {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingSave")
            .field("item_id", &self.item_id)
            .field("containers", &self.containers)
            .field("temp_gap", &self.temp_gap)
            .finish_non_exhaustive()
    }
}

/// What a drop produced.
#[derive(Debug)]
pub enum DropResult {
    NotDragging,
    Cancelled { item_id: ItemId },
    NoOp { item_id: ItemId },
    Saving(PendingSave),
}

impl DropResult {
    pub fn into_pending(self) -> Option<PendingSave> {
        match self {
            Self::Saving(save) => Some(save),
            Self::NotDragging | Self::Cancelled { .. } | Self::NoOp { .. } => None,
        }
    }
}

/// Settled save action.
#[derive(Debug)]
pub enum SaveOutcome {
    Saved(SaveReceipt),
    /// The save failed; `resynced` lists containers reloaded from the store.
    Failed {
        error: SaveError,
        resynced: Vec<ContainerId>,
    },
}

/// Reordering service over one working set.
pub struct ReorderService {
    board: Board,
    machine: DragMachine,
    clock: Arc<dyn Clock>,
    batcher: Arc<PersistenceBatcher>,
}

impl ReorderService {
    pub fn new(store: Arc<dyn TaskStore>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self::with_batcher(Arc::new(PersistenceBatcher::new(store)), clock, config)
    }

    /// Shares `batcher` (and its single-flight lanes) with other services.
    pub fn with_batcher(
        batcher: Arc<PersistenceBatcher>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            board: Board::new(),
            machine: DragMachine::new(config),
            clock,
            batcher,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn phase(&self) -> DragPhase {
        self.machine.phase()
    }

    /// Adds items to the working set without touching the store.
    pub fn insert_items(&mut self, items: impl IntoIterator<Item = Item>) {
        self.board.upsert_all(items);
    }

    /// Loads one container from the store into the working set.
    ///
    /// Returns the number of items loaded.
    pub async fn load_container(&mut self, container_id: ContainerId) -> StoreResult<usize> {
        self.pull_container(container_id, "load").await
    }

    /// Discards local state of one container and reloads it.
    pub async fn refetch_container(&mut self, container_id: ContainerId) -> StoreResult<usize> {
        self.pull_container(container_id, "resync").await
    }

    pub fn active_id(&self) -> Option<ItemId> {
        self.machine.active_id()
    }

    /// Whether the pointer currently rests on another container's selector.
    pub fn is_over_container(&self) -> bool {
        self.hovered_container_id().is_some()
    }

    pub fn hovered_container_id(&self) -> Option<ContainerId> {
        match self.machine.over() {
            Some(Collision::Container(container_id)) => Some(container_id),
            _ => None,
        }
    }

    pub fn on_drag_start(&mut self, item_id: ItemId) -> Result<(), DragError> {
        self.machine.start(&self.board, item_id)
    }

    pub fn on_drag_over(&mut self, pointer: &DragPointer) -> DragUpdate {
        let now = self.clock.now();
        self.machine.drag_over(&mut self.board, pointer, now)
    }

    /// Drives the dwell timer; call on a host timer or after advancing a
    /// manual clock.
    pub fn on_timer_tick(&mut self) -> DragUpdate {
        let now = self.clock.now();
        self.machine.tick(&mut self.board, now)
    }

    /// The pointer left every droppable area; a drop now is a no-target drop.
    pub fn on_drag_leave(&mut self) -> DragUpdate {
        self.machine.leave()
    }

    pub fn on_drag_cancel(&mut self) -> Option<ItemId> {
        self.machine.cancel()
    }

    /// Drops the dragged row. Local state is final when this returns.
    pub fn on_drag_end(&mut self) -> DropResult {
        match self.machine.end(&mut self.board) {
            DragOutcome::NotDragging => DropResult::NotDragging,
            DragOutcome::Cancelled { item_id } => DropResult::Cancelled { item_id },
            DragOutcome::NoOp { item_id } => DropResult::NoOp { item_id },
            DragOutcome::Committed(commit) => {
                let temp_gap = commit.new_gap.as_ref().map(|gap| gap.id);
                DropResult::Saving(self.pending_save(SaveBatch::from_commit(&commit), temp_gap))
            }
        }
    }

    /// Collapse-aware rendered sequence of one container.
    pub fn visible_items(&self, container_id: ContainerId) -> Vec<Item> {
        self.board.visible_items(container_id)
    }

    /// Full sequence of one container, hidden children included.
    pub fn items(&self, container_id: ContainerId) -> Vec<Item> {
        self.board.container_items(container_id)
    }

    /// Collapses or expands a group locally and returns its save.
    ///
    /// Group membership of the container is re-derived first so the rows
    /// hidden by a collapse are exactly the group's current children.
    /// Returns `None` for non-groups and when nothing changes.
    pub fn set_collapsed(&mut self, group_id: ItemId, is_collapsed: bool) -> Option<PendingSave> {
        let group = self.board.get(group_id)?;
        if !group.is_group() || group.is_collapsed == is_collapsed {
            return None;
        }
        let container_id = group.container_id;

        let before = self.board.container_items(container_id);
        let baseline: HashMap<_, _> = before
            .iter()
            .map(|item| (item.id, item.snapshot()))
            .collect();
        let mut reconciled = reconcile_container(before, None);
        normalize_orders(&mut reconciled.items);
        for item in &mut reconciled.items {
            if item.id == group_id {
                item.is_collapsed = is_collapsed;
            }
        }
        let batch = SaveBatch::patch(
            group_id,
            container_id,
            ItemPatch::collapse(is_collapsed),
            &baseline,
            &reconciled.items,
        );
        self.board.upsert_all(reconciled.items);

        info!(
            "event=group_toggle module=service status=ok group_id={} collapsed={} writes={}",
            group_id,
            is_collapsed,
            batch.write_count()
        );
        Some(self.pending_save(batch, None))
    }

    /// Awaits a save and folds its result back into the working set.
    ///
    /// On failure every touched container is reloaded from the store, so the
    /// board converges to what was actually persisted.
    pub async fn settle(&mut self, save: PendingSave) -> SaveOutcome {
        let temp_gap = save.temp_gap;
        match save.await {
            Ok(receipt) => {
                if let (Some(temp), Some(created)) = (temp_gap, &receipt.created_gap) {
                    if created.id != temp {
                        self.board.rekey(temp, created.id);
                    }
                }
                SaveOutcome::Saved(receipt)
            }
            Err(error) => {
                let mut resynced = Vec::with_capacity(error.containers.len());
                for container_id in error.containers.clone() {
                    match self.refetch_container(container_id).await {
                        Ok(_) => resynced.push(container_id),
                        Err(err) => warn!(
                            "event=refetch module=service status=error container_id={} error={}",
                            container_id, err
                        ),
                    }
                }
                SaveOutcome::Failed { error, resynced }
            }
        }
    }

    pub fn save_status(&self) -> SaveStatus {
        self.batcher.tracker().status()
    }

    pub fn subscribe_failures(&self) -> UnboundedReceiver<SaveFailure> {
        self.batcher.subscribe_failures()
    }

    fn pending_save(&self, batch: SaveBatch, temp_gap: Option<ItemId>) -> PendingSave {
        let batcher = Arc::clone(&self.batcher);
        let item_id = batch.item_id;
        let containers = batch.containers.clone();
        PendingSave {
            item_id,
            containers,
            temp_gap,
            future: async move { batcher.persist(batch).await }.boxed(),
        }
    }

    async fn pull_container(
        &mut self,
        container_id: ContainerId,
        reason: &'static str,
    ) -> StoreResult<usize> {
        let mut items = self.batcher.store().list_container(container_id).await?;
        sort_visual(&mut items);
        let count = items.len();
        self.board.replace_container(container_id, items);
        info!(
            "event=refetch module=service status=ok reason={} container_id={} items={}",
            reason, container_id, count
        );
        Ok(count)
    }
}

impl std::fmt::Debug for ReorderService {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReorderService")
            .field("board_len", &self.board.len())
            .field("phase", &self.machine.phase())
            .finish_non_exhaustive()
    }
}
