//! Minimal write set derived from one committed drop.

use crate::drag::machine::Commit;
use crate::model::item::{ContainerId, Item, ItemId, ItemSnapshot};
use crate::store::{ItemPatch, NewItem, OrderUpdate};
use std::collections::HashMap;

/// Writes for one logical save action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveBatch {
    /// Row the action is about (the dragged row, or the toggled group).
    pub item_id: ItemId,
    /// Containers whose single-flight lane this action occupies.
    pub containers: Vec<ContainerId>,
    /// Separator to create before anything else lands.
    pub new_gap: Option<NewItem>,
    /// Rank/group rewrites of existing rows whose values changed.
    pub order_updates: Vec<OrderUpdate>,
    /// Field update for `item_id` (container move, collapse toggle).
    pub item_patch: Option<ItemPatch>,
}

impl SaveBatch {
    /// Diffs a commit's final items against the placement captured at
    /// drag start. Unchanged rows produce no write.
    pub fn from_commit(commit: &Commit) -> Self {
        let gap_id = commit.new_gap.as_ref().map(|gap| gap.id);
        let order_updates = order_diff(&commit.baseline, &commit.items, gap_id);

        let item_patch = commit
            .container_changed()
            .then(|| ItemPatch::move_to(commit.destination_container));

        Self {
            item_id: commit.item_id,
            containers: commit.containers(),
            new_gap: commit.new_gap.as_ref().map(NewItem::from),
            order_updates,
            item_patch,
        }
    }

    /// Field update of one row plus whatever rank/group drift a local
    /// reconcile of its container produced.
    pub fn patch(
        item_id: ItemId,
        container_id: ContainerId,
        patch: ItemPatch,
        baseline: &HashMap<ItemId, ItemSnapshot>,
        items: &[Item],
    ) -> Self {
        Self {
            item_id,
            containers: vec![container_id],
            new_gap: None,
            order_updates: order_diff(baseline, items, None),
            item_patch: (!patch.is_empty()).then_some(patch),
        }
    }

    /// Number of store calls this batch issues.
    pub fn write_count(&self) -> usize {
        usize::from(self.new_gap.is_some())
            + usize::from(!self.order_updates.is_empty())
            + usize::from(self.item_patch.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.write_count() == 0
    }
}

/// Rank/group writes for every item that differs from `baseline`.
/// Items missing from the baseline are always written.
fn order_diff(
    baseline: &HashMap<ItemId, ItemSnapshot>,
    items: &[Item],
    skip: Option<ItemId>,
) -> Vec<OrderUpdate> {
    items
        .iter()
        .filter(|item| Some(item.id) != skip)
        .filter(|item| {
            baseline.get(&item.id).map_or(true, |before| {
                before.order != item.order || before.group_id != item.group_id
            })
        })
        .map(|item| OrderUpdate {
            id: item.id,
            order: item.order,
            group_id: Some(item.group_id),
        })
        .collect()
}
