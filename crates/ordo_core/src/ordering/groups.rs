//! Group ownership reconciliation over a flat ordered list.
//!
//! # Responsibility
//! - Derive every item's `group_id` from its position (single linear pass).
//! - Rebuild the full container sequence from the visible (collapse-aware)
//!   sequence produced by a drag.
//! - Keep a relocated collapsed group from silently absorbing its new
//!   neighbours (trailing gap carry / synthesis).
//!
//! # Invariants
//! - A task/note is owned by the nearest preceding group unless a gap or the
//!   container start intervenes.
//! - Groups own nothing themselves: `group.group_id` is always `None`.
//! - A gap carries the group it closes, for styling only.
//! - Running [`assign_groups`] on its own output reports no changes.

use crate::model::item::{visual_cmp, Item, ItemId, ItemType};
use std::collections::{HashMap, HashSet};

/// One `group_id` rewrite produced by [`assign_groups`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupChange {
    pub id: ItemId,
    pub previous: Option<ItemId>,
    pub current: Option<ItemId>,
}

/// Recomputes `group_id` for every item of one container sequence.
///
/// `items` must already be in the desired visual order. Returns only the
/// items whose stored value differed.
pub fn assign_groups(items: &mut [Item]) -> Vec<GroupChange> {
    let mut changes = Vec::new();
    let mut current_group: Option<ItemId> = None;

    for item in items.iter_mut() {
        let computed = match item.item_type {
            ItemType::Group => {
                current_group = Some(item.id);
                None
            }
            ItemType::Gap => current_group.take(),
            ItemType::Task | ItemType::Note => current_group,
        };
        if item.group_id != computed {
            changes.push(GroupChange {
                id: item.id,
                previous: item.group_id,
                current: computed,
            });
            item.group_id = computed;
        }
    }

    changes
}

/// Ids of collapsed group headers among `items`.
pub fn collapsed_group_ids<'a>(items: impl IntoIterator<Item = &'a Item>) -> HashSet<ItemId> {
    items
        .into_iter()
        .filter(|item| item.is_collapsed_group())
        .map(|item| item.id)
        .collect()
}

/// Returns whether `item` is hidden behind one of `collapsed` groups.
pub fn is_hidden(item: &Item, collapsed: &HashSet<ItemId>) -> bool {
    item.item_type.is_groupable()
        && item
            .group_id
            .is_some_and(|group_id| collapsed.contains(&group_id))
}

/// One container split into what a drag can see and what it cannot.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Items a user can see and drag, in no particular order.
    pub visible: Vec<Item>,
    /// Children of collapsed groups keyed by group id, in stored order.
    pub hidden: HashMap<ItemId, Vec<Item>>,
}

impl Partition {
    /// Number of hidden children owned by `group_id`.
    pub fn hidden_len(&self, group_id: ItemId) -> usize {
        self.hidden.get(&group_id).map_or(0, Vec::len)
    }
}

/// Splits one container's items into visible and hidden sets.
pub fn partition_visible(items: Vec<Item>) -> Partition {
    let collapsed = collapsed_group_ids(items.iter());
    let mut partition = Partition::default();

    for item in items {
        if is_hidden(&item, &collapsed) {
            if let Some(group_id) = item.group_id {
                partition.hidden.entry(group_id).or_default().push(item);
            }
        } else {
            partition.visible.push(item);
        }
    }

    for children in partition.hidden.values_mut() {
        children.sort_by(visual_cmp);
    }
    partition
}

/// Rebuilds the full sequence: visible items by current order, each collapsed
/// group immediately followed by its hidden children.
pub fn rehydrate(partition: Partition) -> Vec<Item> {
    let Partition {
        mut visible,
        mut hidden,
    } = partition;
    visible.sort_by(visual_cmp);

    let hidden_len = hidden.values().map(Vec::len).sum::<usize>();
    let mut sequence = Vec::with_capacity(visible.len() + hidden_len);
    for item in visible {
        let spliced = if item.is_collapsed_group() {
            hidden.remove(&item.id)
        } else {
            None
        };
        sequence.push(item);
        if let Some(children) = spliced {
            sequence.extend(children);
        }
    }

    // Orphans whose collapsed header is gone keep their relative order at the end.
    let mut orphans: Vec<Item> = hidden.into_values().flatten().collect();
    orphans.sort_by(visual_cmp);
    sequence.extend(orphans);
    sequence
}

/// Exclusive end index of the `[group, ...owned children]` block starting at
/// `group_index` in a sequence where the group's children are contiguous.
pub fn owned_block_end(sequence: &[Item], group_index: usize) -> usize {
    let Some(group) = sequence.get(group_index) else {
        return group_index;
    };
    let mut end = group_index + 1;
    while let Some(next) = sequence.get(end) {
        if next.item_type.is_groupable() && next.group_id == Some(group.id) {
            end += 1;
        } else {
            break;
        }
    }
    end
}

/// Gap directly following a collapsed group's owned block, if any.
///
/// `sequence` is one container's full stored sequence in visual order.
pub fn trailing_gap(sequence: &[Item], group_id: ItemId) -> Option<ItemId> {
    let group_index = sequence.iter().position(|item| item.id == group_id)?;
    let end = owned_block_end(sequence, group_index);
    sequence
        .get(end)
        .filter(|item| item.is_gap())
        .map(|item| item.id)
}

/// What happened to the separator after a relocated collapsed group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GapPlacement {
    /// No separator work was needed.
    Untouched,
    /// The gap recorded at drag start now follows the block again.
    Carried(ItemId),
    /// A new gap was inserted after the block; it is not yet persisted.
    Synthesized(Item),
}

/// A collapsed group relocated by the drag being committed.
#[derive(Debug, Clone)]
pub struct Relocation {
    pub group_id: ItemId,
    /// Gap that followed the block when the drag started.
    pub trailing_gap: Option<ItemId>,
    /// Separator inserted when no gap exists and a task/note would be absorbed.
    pub spare_gap: Item,
}

/// Carries or synthesizes the separator after a relocated collapsed group.
///
/// `hidden_len` is the number of children spliced after the group by
/// [`rehydrate`].
pub fn place_trailing_gap(
    sequence: &mut Vec<Item>,
    relocation: Relocation,
    hidden_len: usize,
) -> GapPlacement {
    let Relocation {
        group_id,
        trailing_gap,
        spare_gap,
    } = relocation;

    if let Some(gap_id) = trailing_gap {
        if let Some(gap_index) = sequence.iter().position(|item| item.id == gap_id) {
            let gap = sequence.remove(gap_index);
            let Some(group_index) = sequence.iter().position(|item| item.id == group_id) else {
                sequence.insert(gap_index, gap);
                return GapPlacement::Untouched;
            };
            let block_end = (group_index + 1 + hidden_len).min(sequence.len());
            sequence.insert(block_end, gap);
            return GapPlacement::Carried(gap_id);
        }
    }

    let Some(group_index) = sequence.iter().position(|item| item.id == group_id) else {
        return GapPlacement::Untouched;
    };
    let block_end = (group_index + 1 + hidden_len).min(sequence.len());
    let absorbs_neighbour = sequence
        .get(block_end)
        .is_some_and(|item| item.item_type.is_groupable());
    if !absorbs_neighbour {
        return GapPlacement::Untouched;
    }

    sequence.insert(block_end, spare_gap.clone());
    GapPlacement::Synthesized(spare_gap)
}

/// Result of reconciling one container after a drag.
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// Full container sequence with derived groups, not yet normalized.
    pub items: Vec<Item>,
    pub group_changes: Vec<GroupChange>,
    pub gap: GapPlacement,
}

/// Rebuilds one container's full sequence and derives group ownership.
///
/// `items` is every item currently in the container, visible orders already
/// reflecting the drag result.
pub fn reconcile_container(items: Vec<Item>, relocation: Option<Relocation>) -> Reconciled {
    let partition = partition_visible(items);
    let hidden_len = relocation
        .as_ref()
        .map_or(0, |relocation| partition.hidden_len(relocation.group_id));
    let mut sequence = rehydrate(partition);

    let gap = match relocation {
        Some(relocation) => place_trailing_gap(&mut sequence, relocation, hidden_len),
        None => GapPlacement::Untouched,
    };

    let group_changes = assign_groups(&mut sequence);
    Reconciled {
        items: sequence,
        group_changes,
        gap,
    }
}

#[cfg(test)]
mod tests {
    use super::{owned_block_end, trailing_gap};
    use crate::model::item::{Item, ItemType};
    use uuid::Uuid;

    #[test]
    fn owned_block_stops_at_foreign_rows() {
        let container = Uuid::new_v4();
        let group = Item::new(container, ItemType::Group, 0).collapsed(true);
        let child = Item::new(container, ItemType::Task, 1).in_group(Some(group.id));
        let stranger = Item::new(container, ItemType::Note, 2);
        let sequence = vec![group.clone(), child, stranger];

        assert_eq!(owned_block_end(&sequence, 0), 2);
        assert_eq!(owned_block_end(&sequence, 5), 5);
        assert_eq!(trailing_gap(&sequence, group.id), None);
    }

    #[test]
    fn trailing_gap_found_after_children() {
        let container = Uuid::new_v4();
        let group = Item::new(container, ItemType::Group, 0).collapsed(true);
        let child = Item::new(container, ItemType::Task, 1).in_group(Some(group.id));
        let gap = Item::new(container, ItemType::Gap, 2).in_group(Some(group.id));
        let sequence = vec![group.clone(), child, gap.clone()];

        assert_eq!(trailing_gap(&sequence, group.id), Some(gap.id));
    }
}
