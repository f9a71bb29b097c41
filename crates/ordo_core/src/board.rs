//! In-memory working set of loaded items.
//!
//! # Responsibility
//! - Hold every loaded item keyed by id (flat arena, no nested tree).
//! - Answer per-container queries in visual order, collapse-aware or full.
//!
//! # Invariants
//! - The board is the rendering source of truth; remote writes are applied to
//!   it optimistically before they resolve.
//! - Queries always return items sorted by `visual_cmp`.

use crate::model::item::{visual_cmp, ContainerId, Item, ItemId};
use crate::ordering::groups::{collapsed_group_ids, is_hidden};
use std::collections::HashMap;

/// Flat item arena indexed by id.
#[derive(Debug, Clone, Default)]
pub struct Board {
    items: HashMap<ItemId, Item>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a board from already-loaded items.
    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Self {
        let mut board = Self::new();
        board.upsert_all(items);
        board
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    /// Inserts or replaces one item.
    pub fn upsert(&mut self, item: Item) {
        self.items.insert(item.id, item);
    }

    /// Inserts or replaces many items.
    pub fn upsert_all(&mut self, items: impl IntoIterator<Item = Item>) {
        for item in items {
            self.upsert(item);
        }
    }

    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        self.items.remove(&id)
    }

    /// Replaces the whole content of one container.
    pub fn replace_container(&mut self, container_id: ContainerId, items: Vec<Item>) {
        self.items
            .retain(|_, item| item.container_id != container_id);
        self.upsert_all(items);
    }

    /// Re-keys one item after the store confirmed a different id.
    ///
    /// Returns `false` when `from` is unknown.
    pub fn rekey(&mut self, from: ItemId, to: ItemId) -> bool {
        let Some(mut item) = self.items.remove(&from) else {
            return false;
        };
        item.id = to;
        self.items.insert(to, item);
        for other in self.items.values_mut() {
            if other.group_id == Some(from) {
                other.group_id = Some(to);
            }
        }
        true
    }

    /// Every item of one container in visual order, hidden children included.
    pub fn container_items(&self, container_id: ContainerId) -> Vec<Item> {
        let mut items: Vec<Item> = self
            .items
            .values()
            .filter(|item| item.container_id == container_id)
            .cloned()
            .collect();
        items.sort_by(visual_cmp);
        items
    }

    /// Collapse-aware sequence of one container, as rendered.
    pub fn visible_items(&self, container_id: ContainerId) -> Vec<Item> {
        let items = self.container_items(container_id);
        let collapsed = collapsed_group_ids(items.iter());
        items
            .into_iter()
            .filter(|item| !is_hidden(item, &collapsed))
            .collect()
    }

    /// Smallest stored order in one container, if it has items.
    pub fn min_order(&self, container_id: ContainerId) -> Option<i64> {
        self.items
            .values()
            .filter(|item| item.container_id == container_id)
            .map(|item| item.order)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::Board;
    use crate::model::item::{Item, ItemType};
    use uuid::Uuid;

    #[test]
    fn visible_items_hide_collapsed_children_only() {
        let container = Uuid::new_v4();
        let group = Item::new(container, ItemType::Group, 0).collapsed(true);
        let child = Item::new(container, ItemType::Task, 1).in_group(Some(group.id));
        let gap = Item::new(container, ItemType::Gap, 2).in_group(Some(group.id));
        let tail = Item::new(container, ItemType::Note, 3);
        let board = Board::from_items([tail.clone(), gap.clone(), child.clone(), group.clone()]);

        let visible: Vec<_> = board
            .visible_items(container)
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(visible, vec![group.id, gap.id, tail.id]);
        assert_eq!(board.container_items(container).len(), 4);
    }

    #[test]
    fn rekey_moves_item_and_back_references() {
        let container = Uuid::new_v4();
        let group = Item::new(container, ItemType::Group, 0);
        let child = Item::new(container, ItemType::Task, 1).in_group(Some(group.id));
        let mut board = Board::from_items([group.clone(), child.clone()]);

        let confirmed = Uuid::new_v4();
        assert!(board.rekey(group.id, confirmed));
        assert!(board.get(group.id).is_none());
        assert_eq!(board.get(confirmed).unwrap().id, confirmed);
        assert_eq!(board.get(child.id).unwrap().group_id, Some(confirmed));
        assert!(!board.rekey(Uuid::new_v4(), Uuid::new_v4()));
    }
}
