//! Map-backed task store.
//!
//! # Responsibility
//! - Serve as an offline/in-process `TaskStore` and as a deterministic fake.
//! - Record every call so callers can assert exactly what was written.
//! - Inject failures per operation.
//!
//! # Invariants
//! - Failed calls are recorded but do not change stored items.
//! - Events are published only for successful writes.

use super::events::{TaskEvent, TaskEventBus};
use super::{ItemPatch, NewItem, OrderUpdate, StoreError, StoreResult, TaskStore};
use crate::model::item::{visual_cmp, ContainerId, Item, ItemId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One recorded store invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    CreateItem(NewItem),
    UpdateItem { id: ItemId, patch: ItemPatch },
    UpdateItemOrder(Vec<OrderUpdate>),
    ListContainer(ContainerId),
}

impl StoreCall {
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::ListContainer(_))
    }
}

/// Operation selector for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    CreateItem,
    UpdateItem,
    UpdateItemOrder,
    ListContainer,
}

#[derive(Debug, Default)]
struct MemoryState {
    items: HashMap<ItemId, Item>,
    calls: Vec<StoreCall>,
    fail_next: Vec<StoreOp>,
    reject_writes: bool,
    next_created_at: i64,
}

impl MemoryState {
    fn take_failure(&mut self, op: StoreOp) -> StoreResult<()> {
        if let Some(index) = self.fail_next.iter().position(|pending| *pending == op) {
            self.fail_next.remove(index);
            return Err(StoreError::Unavailable(format!("injected {op:?} failure")));
        }
        if self.reject_writes && op != StoreOp::ListContainer {
            return Err(StoreError::Unavailable("store is rejecting writes".to_string()));
        }
        Ok(())
    }
}

/// In-memory `TaskStore` with call recording.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    state: Mutex<MemoryState>,
    events: Option<TaskEventBus>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `items` (no calls recorded).
    pub fn with_items(items: impl IntoIterator<Item = Item>) -> Self {
        let store = Self::new();
        store.seed(items);
        store
    }

    /// Publishes successful writes to `bus`.
    pub fn with_event_bus(mut self, bus: TaskEventBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// Inserts items directly, bypassing call recording.
    pub fn seed(&self, items: impl IntoIterator<Item = Item>) {
        let mut state = self.state();
        for item in items {
            state.items.insert(item.id, item);
        }
    }

    pub fn item(&self, id: ItemId) -> Option<Item> {
        self.state().items.get(&id).cloned()
    }

    /// Stored items of one container in visual order.
    pub fn container(&self, container_id: ContainerId) -> Vec<Item> {
        let state = self.state();
        let mut items: Vec<Item> = state
            .items
            .values()
            .filter(|item| item.container_id == container_id)
            .cloned()
            .collect();
        items.sort_by(visual_cmp);
        items
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().calls.clone()
    }

    /// Recorded write calls only.
    pub fn write_calls(&self) -> Vec<StoreCall> {
        self.state()
            .calls
            .iter()
            .filter(|call| call.is_write())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Makes the next call of `op` fail once.
    pub fn fail_next(&self, op: StoreOp) {
        self.state().fail_next.push(op);
    }

    /// Makes every write fail until switched off. Reads keep working.
    pub fn reject_writes(&self, reject: bool) {
        self.state().reject_writes = reject;
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: TaskEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }

    fn create_sync(&self, request: NewItem) -> StoreResult<Item> {
        let mut state = self.state();
        state.calls.push(StoreCall::CreateItem(request.clone()));
        state.take_failure(StoreOp::CreateItem)?;

        state.next_created_at += 1;
        let item = Item {
            id: request.id,
            container_id: request.container_id,
            order: request.order,
            item_type: request.item_type,
            group_id: request.group_id,
            is_collapsed: false,
            content: request.content,
            created_at: state.next_created_at,
        };
        state.items.insert(item.id, item.clone());
        Ok(item)
    }

    fn update_sync(&self, id: ItemId, patch: &ItemPatch) -> StoreResult<()> {
        let mut state = self.state();
        state.calls.push(StoreCall::UpdateItem {
            id,
            patch: patch.clone(),
        });
        state.take_failure(StoreOp::UpdateItem)?;

        let item = state.items.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        patch.apply_to(item);
        Ok(())
    }

    fn update_order_sync(&self, updates: &[OrderUpdate]) -> StoreResult<()> {
        let mut state = self.state();
        state.calls.push(StoreCall::UpdateItemOrder(updates.to_vec()));
        state.take_failure(StoreOp::UpdateItemOrder)?;

        if let Some(missing) = updates
            .iter()
            .find(|update| !state.items.contains_key(&update.id))
        {
            return Err(StoreError::NotFound(missing.id));
        }
        for update in updates {
            if let Some(item) = state.items.get_mut(&update.id) {
                item.order = update.order;
                if let Some(group_id) = update.group_id {
                    item.group_id = group_id;
                }
            }
        }
        Ok(())
    }

    fn list_sync(&self, container_id: ContainerId) -> StoreResult<Vec<Item>> {
        {
            let mut state = self.state();
            state.calls.push(StoreCall::ListContainer(container_id));
            state.take_failure(StoreOp::ListContainer)?;
        }
        Ok(self.container(container_id))
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create_item(&self, item: NewItem) -> StoreResult<Item> {
        let created = self.create_sync(item)?;
        self.publish(TaskEvent::Created(created.clone()));
        Ok(created)
    }

    async fn update_item(&self, id: ItemId, patch: ItemPatch) -> StoreResult<()> {
        self.update_sync(id, &patch)?;
        self.publish(TaskEvent::Updated { id, patch });
        Ok(())
    }

    async fn update_item_order(&self, updates: Vec<OrderUpdate>) -> StoreResult<()> {
        self.update_order_sync(&updates)?;
        self.publish(TaskEvent::OrderUpdated(updates));
        Ok(())
    }

    async fn list_container(&self, container_id: ContainerId) -> StoreResult<Vec<Item>> {
        self.list_sync(container_id)
    }
}
