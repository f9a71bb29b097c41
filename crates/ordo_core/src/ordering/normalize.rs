//! Dense rank assignment and array-move helpers.
//!
//! # Invariants
//! - After `normalize_orders`, ranks are exactly `0..n-1` in sequence position.
//! - None of these helpers can fail.

use crate::model::item::{visual_cmp, Item, ItemId};

/// Rewrites `order` to the item's position in `items`.
///
/// Returns the ids whose rank actually changed.
pub fn normalize_orders(items: &mut [Item]) -> Vec<ItemId> {
    let mut changed = Vec::new();
    for (index, item) in items.iter_mut().enumerate() {
        let rank = index as i64;
        if item.order != rank {
            item.order = rank;
            changed.push(item.id);
        }
    }
    changed
}

/// Owned variant of [`normalize_orders`].
pub fn normalized(mut items: Vec<Item>) -> Vec<Item> {
    normalize_orders(&mut items);
    items
}

/// Sorts items into visual order.
pub fn sort_visual(items: &mut [Item]) {
    items.sort_by(visual_cmp);
}

/// Moves the element at `from` so that it ends up at index `to`.
///
/// Out-of-range `to` is clamped to the last slot; an out-of-range `from` is a
/// no-op.
pub fn array_move<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from >= items.len() {
        return;
    }
    let moved = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, moved);
}

/// Places `active` directly before or after `target` inside `ids`.
///
/// Returns `false` when either id is missing or they are the same.
pub fn place_relative(ids: &mut Vec<ItemId>, active: ItemId, target: ItemId, after: bool) -> bool {
    if active == target {
        return false;
    }
    let Some(from) = ids.iter().position(|id| *id == active) else {
        return false;
    };
    if !ids.contains(&target) {
        return false;
    }
    ids.remove(from);
    let Some(target_index) = ids.iter().position(|id| *id == target) else {
        return false;
    };
    let insert_at = if after { target_index + 1 } else { target_index };
    ids.insert(insert_at, active);
    true
}
