//! Drag targeting: which item or container the dragged row is over.
//!
//! # Responsibility
//! - Turn one pointer move into a single targeting decision.
//! - Give container selectors priority over item proximity.
//!
//! # Invariants
//! - Group drags never resolve to a container target.
//! - Missing or unmeasured geometry degrades to `Collision::None` for the
//!   tick; resolution never panics.
//! - Only items in the dragged row's current container are item candidates.

use super::geometry::{DragPointer, DroppableKind, Rect};
use crate::model::item::{ContainerId, ItemId, ItemType};
use log::debug;

/// The row being dragged, as seen by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveDrag {
    pub id: ItemId,
    pub item_type: ItemType,
    pub container_id: ContainerId,
}

impl ActiveDrag {
    /// Whether this drag may target other containers at all.
    pub fn can_switch_container(&self) -> bool {
        self.item_type != ItemType::Group
    }
}

/// Targeting decision for one pointer move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collision {
    /// Reorder relative to `id`; `below` means insert after it.
    Item { id: ItemId, below: bool },
    /// Pointer rests inside another container's selector.
    Container(ContainerId),
    /// Nothing decisive this tick.
    None,
}

impl Collision {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Resolves the current drag target.
///
/// `container_of` maps an item candidate to its container so candidates from
/// other lists rendered on screen are ignored.
pub fn resolve_collision(
    active: &ActiveDrag,
    pointer: &DragPointer,
    container_of: impl Fn(ItemId) -> Option<ContainerId>,
) -> Collision {
    if active.can_switch_container() {
        if let Some(container_id) = container_under_pointer(active, pointer) {
            return Collision::Container(container_id);
        }
    }

    let Some(active_rect) = pointer.active_rect.filter(Rect::is_measured) else {
        debug!(
            "event=collision module=drag status=skip reason=active_rect_missing item_id={}",
            active.id
        );
        return Collision::None;
    };

    match closest_item(active, active_rect, pointer, container_of) {
        Some((id, target_rect)) => Collision::Item {
            id,
            below: active_rect.center().y > target_rect.center().y,
        },
        None => Collision::None,
    }
}

fn container_under_pointer(active: &ActiveDrag, pointer: &DragPointer) -> Option<ContainerId> {
    let point = pointer.pointer?;
    pointer.droppables.iter().find_map(|droppable| {
        let DroppableKind::Container(container_id) = droppable.kind else {
            return None;
        };
        if container_id == active.container_id {
            return None;
        }
        droppable
            .measured_rect()
            .filter(|rect| rect.contains(point))
            .map(|_| container_id)
    })
}

fn closest_item(
    active: &ActiveDrag,
    active_rect: Rect,
    pointer: &DragPointer,
    container_of: impl Fn(ItemId) -> Option<ContainerId>,
) -> Option<(ItemId, Rect)> {
    let origin = active_rect.center();
    let mut best: Option<(ItemId, Rect, f64)> = None;

    for droppable in &pointer.droppables {
        let DroppableKind::Item(id) = droppable.kind else {
            continue;
        };
        if id == active.id || container_of(id) != Some(active.container_id) {
            continue;
        }
        let Some(rect) = droppable.measured_rect() else {
            continue;
        };
        let distance = origin.distance_to(rect.center());
        let closer = best
            .as_ref()
            .map_or(true, |(_, _, best_distance)| distance < *best_distance);
        if closer {
            best = Some((id, rect, distance));
        }
    }

    best.map(|(id, rect, _)| (id, rect))
}

#[cfg(test)]
mod tests {
    use super::{resolve_collision, ActiveDrag, Collision};
    use crate::drag::geometry::{DragPointer, Point, Rect};
    use crate::model::item::ItemType;
    use uuid::Uuid;

    #[test]
    fn unmeasured_active_rect_yields_none() {
        let container = Uuid::new_v4();
        let active = ActiveDrag {
            id: Uuid::new_v4(),
            item_type: ItemType::Task,
            container_id: container,
        };
        let target = Uuid::new_v4();
        let pointer = DragPointer::new(Some(Point::new(1.0, 1.0)), None)
            .with_item(target, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));

        assert_eq!(
            resolve_collision(&active, &pointer, |_| Some(container)),
            Collision::None
        );
    }
}
