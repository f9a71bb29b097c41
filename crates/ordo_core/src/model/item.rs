//! Ordered item domain model.
//!
//! # Responsibility
//! - Define the record shared by task/note/group/gap rows in one container.
//! - Provide the canonical visual sort key used by every ordering path.
//!
//! # Invariants
//! - `id` is stable and never reused for another item.
//! - `group` items always carry `group_id = None`.
//! - `is_collapsed` is meaningful only when `item_type == ItemType::Group`.
//!
//! # See also
//! - crate::ordering::groups for how `group_id` is derived.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for one ordered item.
pub type ItemId = Uuid;

/// Stable identifier for the container (folder) that encloses items.
pub type ContainerId = Uuid;

/// Kind of row inside one container list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Actionable task row.
    Task,
    /// Free-form note row.
    Note,
    /// Header that owns the following run of tasks/notes.
    Group,
    /// Visual separator that terminates group ownership.
    Gap,
}

impl ItemType {
    /// Returns whether this row can be owned by a group.
    pub fn is_groupable(self) -> bool {
        matches!(self, Self::Task | Self::Note)
    }

    /// Stable lowercase name used for storage and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Note => "note",
            Self::Group => "group",
            Self::Gap => "gap",
        }
    }

    /// Parses the stable storage name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "task" => Some(Self::Task),
            "note" => Some(Self::Note),
            "group" => Some(Self::Group),
            "gap" => Some(Self::Gap),
            _ => None,
        }
    }
}

impl Display for ItemType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical record for one ordered row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub container_id: ContainerId,
    /// Rank inside the container. Dense `0..n-1` after normalization.
    pub order: i64,
    pub item_type: ItemType,
    /// Owning group, derived by reconciliation. Never trusted as a cache.
    pub group_id: Option<ItemId>,
    pub is_collapsed: bool,
    /// Opaque payload, never interpreted by the ordering engine.
    pub content: String,
    /// Unix epoch milliseconds. Tie-breaker for equal `order` values.
    pub created_at: i64,
}

impl Item {
    /// Creates a new item with a generated stable ID.
    pub fn new(container_id: ContainerId, item_type: ItemType, order: i64) -> Self {
        Self::with_id(Uuid::new_v4(), container_id, item_type, order)
    }

    /// Creates a new item with a caller-provided stable ID.
    ///
    /// Used by load paths where identity already exists in storage.
    pub fn with_id(
        id: ItemId,
        container_id: ContainerId,
        item_type: ItemType,
        order: i64,
    ) -> Self {
        Self {
            id,
            container_id,
            order,
            item_type,
            group_id: None,
            is_collapsed: false,
            content: String::new(),
            created_at: 0,
        }
    }

    /// Builder-style content setter.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Builder-style group setter.
    pub fn in_group(mut self, group_id: Option<ItemId>) -> Self {
        self.group_id = group_id;
        self
    }

    /// Builder-style collapse setter. Ignored for non-group items.
    pub fn collapsed(mut self, is_collapsed: bool) -> Self {
        self.is_collapsed = is_collapsed && self.item_type == ItemType::Group;
        self
    }

    /// Builder-style creation timestamp setter.
    pub fn created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn is_group(&self) -> bool {
        self.item_type == ItemType::Group
    }

    pub fn is_gap(&self) -> bool {
        self.item_type == ItemType::Gap
    }

    /// Returns whether this is a group header currently collapsed.
    pub fn is_collapsed_group(&self) -> bool {
        self.is_group() && self.is_collapsed
    }

    /// Captures the fields a drag may rewrite.
    pub fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            container_id: self.container_id,
            order: self.order,
            group_id: self.group_id,
        }
    }

    /// Restores the fields captured by [`Item::snapshot`].
    pub fn restore(&mut self, snapshot: ItemSnapshot) {
        self.container_id = snapshot.container_id;
        self.order = snapshot.order;
        self.group_id = snapshot.group_id;
    }
}

/// Placement fields of one item as last persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemSnapshot {
    pub container_id: ContainerId,
    pub order: i64,
    pub group_id: Option<ItemId>,
}

/// Total visual ordering: `order`, then creation time, then id.
pub fn visual_cmp(left: &Item, right: &Item) -> Ordering {
    left.order
        .cmp(&right.order)
        .then(left.created_at.cmp(&right.created_at))
        .then(left.id.cmp(&right.id))
}

/// Current wall-clock time as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}
