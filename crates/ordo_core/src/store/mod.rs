//! Task-store collaborator contract and implementations.
//!
//! # Responsibility
//! - Define the async persistence interface the ordering core writes through.
//! - Provide an in-memory store (tests, offline callers) and a SQLite store.
//! - Publish store-side changes on an injected [`events::TaskEventBus`].
//!
//! # Invariants
//! - The core only ever asks the store to persist field changes or fetch
//!   records; it never depends on store-side ordering logic.
//! - Bulk order writes are not assumed atomic by callers.

use crate::db::DbError;
use crate::model::item::{ContainerId, Item, ItemId, ItemType};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod events;
pub mod memory;
pub mod sqlite;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from task-store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target item does not exist.
    NotFound(ItemId),
    /// Persisted data cannot be converted to a valid item.
    InvalidData(String),
    /// Backend refused or could not complete the write.
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
            Self::Unavailable(message) => write!(f, "task store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Create request for one item.
///
/// `id` is client-generated; stores may keep it or assign their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub id: ItemId,
    pub container_id: ContainerId,
    pub item_type: ItemType,
    pub content: String,
    pub order: i64,
    pub group_id: Option<ItemId>,
}

impl From<&Item> for NewItem {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            container_id: item.container_id,
            item_type: item.item_type,
            content: item.content.clone(),
            order: item.order,
            group_id: item.group_id,
        }
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub content: Option<String>,
    pub container_id: Option<ContainerId>,
    pub order: Option<i64>,
    /// `Some(None)` clears the group reference.
    pub group_id: Option<Option<ItemId>>,
    pub is_collapsed: Option<bool>,
}

impl ItemPatch {
    pub fn move_to(container_id: ContainerId) -> Self {
        Self {
            container_id: Some(container_id),
            ..Self::default()
        }
    }

    pub fn collapse(is_collapsed: bool) -> Self {
        Self {
            is_collapsed: Some(is_collapsed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Applies the set fields to `item`.
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(content) = &self.content {
            item.content = content.clone();
        }
        if let Some(container_id) = self.container_id {
            item.container_id = container_id;
        }
        if let Some(order) = self.order {
            item.order = order;
        }
        if let Some(group_id) = self.group_id {
            item.group_id = group_id;
        }
        if let Some(is_collapsed) = self.is_collapsed {
            item.is_collapsed = is_collapsed;
        }
    }
}

/// One entry of a bulk rank write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderUpdate {
    pub id: ItemId,
    pub order: i64,
    /// `None` leaves the stored group untouched.
    pub group_id: Option<Option<ItemId>>,
}

/// Persistence collaborator used by the ordering core.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persists a new item and returns the stored record.
    async fn create_item(&self, item: NewItem) -> StoreResult<Item>;

    /// Applies a partial update to one item.
    async fn update_item(&self, id: ItemId, patch: ItemPatch) -> StoreResult<()>;

    /// Writes ranks (and optionally groups) for many items.
    async fn update_item_order(&self, updates: Vec<OrderUpdate>) -> StoreResult<()>;

    /// Loads every item of one container in stored order.
    async fn list_container(&self, container_id: ContainerId) -> StoreResult<Vec<Item>>;
}
