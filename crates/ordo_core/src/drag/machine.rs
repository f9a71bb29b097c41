//! Drag gesture lifecycle.
//!
//! # Responsibility
//! - Own the single in-progress drag session (start/move/end/cancel).
//! - Apply optimistic placement on every move and the container-switch dwell.
//! - At drop, rebuild the touched containers (groups + dense ranks) and hand
//!   back a [`Commit`] describing old vs. new placement.
//!
//! # Invariants
//! - At most one session exists; `start` while dragging is rejected.
//! - The pending container switch is plain state with a deadline; it is
//!   cleared on leave, on commit, on end and on cancel.
//! - Group rows never change container here.
//! - `cancel` does not roll back moves already applied to the board.
//! - A tick without a decisive target never erases the last decisive one;
//!   only `leave` (or ending the session) does. The drop is judged on the
//!   last decisive target.

use super::collision::{resolve_collision, ActiveDrag, Collision};
use super::geometry::DragPointer;
use crate::board::Board;
use crate::config::EngineConfig;
use crate::model::item::{now_epoch_ms, ContainerId, Item, ItemId, ItemSnapshot, ItemType};
use crate::ordering::groups::{
    reconcile_container, trailing_gap, GapPlacement, GroupChange, Relocation,
};
use crate::ordering::normalize::{normalize_orders, place_relative};
use log::{debug, info};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Errors from starting a drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragError {
    /// Another drag session is still open.
    AlreadyDragging(ItemId),
    /// Item is not in the working set.
    ItemNotFound(ItemId),
    /// Item is hidden behind a collapsed group and cannot be grabbed.
    ItemHidden(ItemId),
}

impl Display for DragError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyDragging(id) => write!(f, "a drag is already in progress for {id}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::ItemHidden(id) => write!(f, "item is hidden by a collapsed group: {id}"),
        }
    }
}

impl Error for DragError {}

/// Public view of the machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Dragging,
    Committing,
}

/// A container switch waiting for its dwell deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSwitch {
    pub container_id: ContainerId,
    pub deadline: Duration,
}

/// Effect of one move or timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragUpdate {
    NotDragging,
    /// No decisive target this tick.
    NoTarget,
    /// Over an item; placement already matches.
    Hovering { over: ItemId, below: bool },
    /// Over an item; the dragged row was moved next to it.
    Reordered { over: ItemId, below: bool },
    /// Dwelling over another container's selector.
    SwitchPending(PendingSwitch),
    /// The dragged row now lives in `container_id`.
    Switched { container_id: ContainerId },
}

/// Everything the persistence layer needs about one committed drop.
#[derive(Debug, Clone)]
pub struct Commit {
    pub item_id: ItemId,
    pub origin_container: ContainerId,
    pub destination_container: ContainerId,
    /// Placement of every touched item before the drag started.
    pub baseline: HashMap<ItemId, ItemSnapshot>,
    /// Final state of every item in the touched containers.
    pub items: Vec<Item>,
    /// Separator synthesized after a relocated collapsed group.
    pub new_gap: Option<Item>,
    pub group_changes: Vec<GroupChange>,
}

impl Commit {
    pub fn container_changed(&self) -> bool {
        self.origin_container != self.destination_container
    }

    /// Touched containers, sorted and deduplicated.
    pub fn containers(&self) -> Vec<ContainerId> {
        let mut containers = vec![self.origin_container, self.destination_container];
        containers.sort();
        containers.dedup();
        containers
    }
}

/// Result of dropping.
#[derive(Debug, Clone)]
pub enum DragOutcome {
    NotDragging,
    /// Dropped with no valid target; optimistic moves stay as they are.
    Cancelled { item_id: ItemId },
    /// Dropped where it started; local state restored, nothing to persist.
    NoOp { item_id: ItemId },
    Committed(Box<Commit>),
}

#[derive(Debug)]
struct DragSession {
    item_id: ItemId,
    item_type: ItemType,
    origin_container: ContainerId,
    origin_position: usize,
    relocating_collapsed_group: bool,
    trailing_gap: Option<ItemId>,
    baseline: HashMap<ItemId, ItemSnapshot>,
    over: Collision,
    /// Last `Item`/`Container` decision; `None` frames leave it alone.
    last_target: Option<Collision>,
    pending: Option<PendingSwitch>,
}

impl DragSession {
    fn capture_container(&mut self, board: &Board, container_id: ContainerId) {
        for item in board.container_items(container_id) {
            self.baseline.entry(item.id).or_insert_with(|| item.snapshot());
        }
    }
}

#[derive(Debug)]
enum Phase {
    Idle,
    Dragging(Box<DragSession>),
    Committing,
}

/// Single-session drag state machine.
#[derive(Debug)]
pub struct DragMachine {
    phase: Phase,
    config: EngineConfig,
}

impl DragMachine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            phase: Phase::Idle,
            config,
        }
    }

    pub fn phase(&self) -> DragPhase {
        match self.phase {
            Phase::Idle => DragPhase::Idle,
            Phase::Dragging(_) => DragPhase::Dragging,
            Phase::Committing => DragPhase::Committing,
        }
    }

    /// Id of the row being dragged.
    pub fn active_id(&self) -> Option<ItemId> {
        self.session().map(|session| session.item_id)
    }

    pub fn pending_switch(&self) -> Option<PendingSwitch> {
        self.session().and_then(|session| session.pending)
    }

    /// Targeting decision of the latest tick of the open session.
    pub fn over(&self) -> Option<Collision> {
        self.session().map(|session| session.over)
    }

    /// Opens a session for `item_id`.
    ///
    /// # Errors
    /// - `AlreadyDragging` while another session is open.
    /// - `ItemNotFound` / `ItemHidden` when the row cannot be grabbed.
    pub fn start(&mut self, board: &Board, item_id: ItemId) -> Result<(), DragError> {
        if let Some(active) = self.active_id() {
            return Err(DragError::AlreadyDragging(active));
        }
        let item = board.get(item_id).ok_or(DragError::ItemNotFound(item_id))?;
        let container_id = item.container_id;
        let origin_position = board
            .visible_items(container_id)
            .iter()
            .position(|visible| visible.id == item_id)
            .ok_or(DragError::ItemHidden(item_id))?;

        let relocating_collapsed_group = item.is_collapsed_group();
        let full_sequence = board.container_items(container_id);
        let gap = if relocating_collapsed_group {
            trailing_gap(&full_sequence, item_id)
        } else {
            None
        };

        let mut session = DragSession {
            item_id,
            item_type: item.item_type,
            origin_container: container_id,
            origin_position,
            relocating_collapsed_group,
            trailing_gap: gap,
            baseline: HashMap::new(),
            over: Collision::None,
            last_target: None,
            pending: None,
        };
        session.capture_container(board, container_id);

        info!(
            "event=drag_start module=drag status=ok item_id={} item_type={} container_id={} position={} trailing_gap={}",
            item_id,
            session.item_type,
            container_id,
            origin_position,
            gap.is_some()
        );
        self.phase = Phase::Dragging(Box::new(session));
        Ok(())
    }

    /// Handles one pointer move at time `now`.
    pub fn drag_over(
        &mut self,
        board: &mut Board,
        pointer: &DragPointer,
        now: Duration,
    ) -> DragUpdate {
        let delay = self.config.container_switch_delay();
        let margin = self.config.first_slot_margin;
        let Phase::Dragging(session) = &mut self.phase else {
            return DragUpdate::NotDragging;
        };
        let Some(active) = active_drag(board, session) else {
            return DragUpdate::NoTarget;
        };

        let collision = resolve_collision(&active, pointer, |id| {
            board.get(id).map(|item| item.container_id)
        });
        session.over = collision;
        if !collision.is_none() {
            session.last_target = Some(collision);
        }

        match collision {
            Collision::Container(container_id) => {
                match session.pending {
                    Some(pending) if pending.container_id == container_id => {
                        if now >= pending.deadline {
                            return commit_switch(session, board, container_id, margin);
                        }
                        DragUpdate::SwitchPending(pending)
                    }
                    _ => {
                        let pending = PendingSwitch {
                            container_id,
                            deadline: now + delay,
                        };
                        debug!(
                            "event=drag_switch module=drag status=pending item_id={} container_id={}",
                            session.item_id, container_id
                        );
                        session.pending = Some(pending);
                        DragUpdate::SwitchPending(pending)
                    }
                }
            }
            Collision::Item { id, below } => {
                clear_pending(session);
                if reorder_visible(board, session.item_id, active.container_id, id, below) {
                    DragUpdate::Reordered { over: id, below }
                } else {
                    DragUpdate::Hovering { over: id, below }
                }
            }
            Collision::None => {
                clear_pending(session);
                DragUpdate::NoTarget
            }
        }
    }

    /// Fires the dwell timer when its deadline has passed.
    ///
    /// The pending switch only exists while the pointer is still inside the
    /// selector, so reaching the deadline commits the switch.
    pub fn tick(&mut self, board: &mut Board, now: Duration) -> DragUpdate {
        let margin = self.config.first_slot_margin;
        let Phase::Dragging(session) = &mut self.phase else {
            return DragUpdate::NotDragging;
        };
        match session.pending {
            Some(pending) if now >= pending.deadline => {
                commit_switch(session, board, pending.container_id, margin)
            }
            Some(pending) => DragUpdate::SwitchPending(pending),
            None => DragUpdate::NoTarget,
        }
    }

    /// Drops the dragged row.
    pub fn end(&mut self, board: &mut Board) -> DragOutcome {
        let session = match std::mem::replace(&mut self.phase, Phase::Committing) {
            Phase::Dragging(session) => session,
            other => {
                self.phase = other;
                return DragOutcome::NotDragging;
            }
        };
        let outcome = self.commit(*session, board);
        self.phase = Phase::Idle;
        outcome
    }

    /// The pointer left every droppable area. Forgets the last decisive
    /// target and any pending switch, so a drop right after is a no-target
    /// drop.
    pub fn leave(&mut self) -> DragUpdate {
        let Phase::Dragging(session) = &mut self.phase else {
            return DragUpdate::NotDragging;
        };
        session.over = Collision::None;
        session.last_target = None;
        clear_pending(session);
        debug!(
            "event=drag_leave module=drag status=ok item_id={}",
            session.item_id
        );
        DragUpdate::NoTarget
    }

    /// Abandons the session. Optimistic moves are left in place.
    pub fn cancel(&mut self) -> Option<ItemId> {
        let item_id = self.active_id()?;
        self.phase = Phase::Idle;
        info!(
            "event=drag_end module=drag status=cancelled item_id={}",
            item_id
        );
        Some(item_id)
    }

    fn commit(&self, session: DragSession, board: &mut Board) -> DragOutcome {
        let item_id = session.item_id;
        if session.last_target.is_none() {
            info!(
                "event=drag_end module=drag status=cancelled reason=no_target item_id={}",
                item_id
            );
            return DragOutcome::Cancelled { item_id };
        }
        let Some(destination) = board.get(item_id).map(|item| item.container_id) else {
            return DragOutcome::Cancelled { item_id };
        };

        let position = board
            .visible_items(destination)
            .iter()
            .position(|item| item.id == item_id);
        if destination == session.origin_container && position == Some(session.origin_position) {
            for (id, snapshot) in &session.baseline {
                if let Some(item) = board.get_mut(*id) {
                    item.restore(*snapshot);
                }
            }
            info!(
                "event=drag_end module=drag status=noop item_id={}",
                item_id
            );
            return DragOutcome::NoOp { item_id };
        }

        let relocation = session.relocating_collapsed_group.then(|| Relocation {
            group_id: item_id,
            trailing_gap: session.trailing_gap,
            spare_gap: Item::new(destination, ItemType::Gap, i64::MAX)
                .with_content(self.config.gap_content.clone())
                .created_at(now_epoch_ms()),
        });

        let mut reconciled = reconcile_container(board.container_items(destination), relocation);
        normalize_orders(&mut reconciled.items);
        let new_gap = match &reconciled.gap {
            GapPlacement::Synthesized(gap) => reconciled
                .items
                .iter()
                .find(|item| item.id == gap.id)
                .cloned(),
            GapPlacement::Carried(_) | GapPlacement::Untouched => None,
        };

        let mut items = reconciled.items;
        let mut group_changes = reconciled.group_changes;
        if destination != session.origin_container {
            let mut origin =
                reconcile_container(board.container_items(session.origin_container), None);
            normalize_orders(&mut origin.items);
            items.extend(origin.items);
            group_changes.extend(origin.group_changes);
        }
        board.upsert_all(items.iter().cloned());

        info!(
            "event=drag_end module=drag status=committed item_id={} origin={} destination={} items={} group_changes={} new_gap={}",
            item_id,
            session.origin_container,
            destination,
            items.len(),
            group_changes.len(),
            new_gap.is_some()
        );

        DragOutcome::Committed(Box::new(Commit {
            item_id,
            origin_container: session.origin_container,
            destination_container: destination,
            baseline: session.baseline,
            items,
            new_gap,
            group_changes,
        }))
    }

    fn session(&self) -> Option<&DragSession> {
        match &self.phase {
            Phase::Dragging(session) => Some(session),
            Phase::Idle | Phase::Committing => None,
        }
    }
}

fn active_drag(board: &Board, session: &DragSession) -> Option<ActiveDrag> {
    board.get(session.item_id).map(|item| ActiveDrag {
        id: item.id,
        item_type: item.item_type,
        container_id: item.container_id,
    })
}

fn clear_pending(session: &mut DragSession) {
    if let Some(pending) = session.pending.take() {
        debug!(
            "event=drag_switch module=drag status=cancelled item_id={} container_id={}",
            session.item_id, pending.container_id
        );
    }
}

fn commit_switch(
    session: &mut DragSession,
    board: &mut Board,
    container_id: ContainerId,
    margin: i64,
) -> DragUpdate {
    session.pending = None;
    // The selector now belongs to the row's own container.
    session.over = Collision::None;
    if session.item_type == ItemType::Group {
        return DragUpdate::NoTarget;
    }

    session.capture_container(board, container_id);
    let first_slot = board.min_order(container_id).unwrap_or(0).saturating_sub(margin);
    let Some(item) = board.get_mut(session.item_id) else {
        return DragUpdate::NoTarget;
    };
    item.container_id = container_id;
    item.order = first_slot;
    item.group_id = None;

    info!(
        "event=drag_switch module=drag status=ok item_id={} container_id={}",
        session.item_id, container_id
    );
    DragUpdate::Switched { container_id }
}

/// Moves `active` next to `target` in the visible list of `container_id` and
/// rewrites visible ranks to their positions. Returns `false` when nothing
/// moved.
fn reorder_visible(
    board: &mut Board,
    active: ItemId,
    container_id: ContainerId,
    target: ItemId,
    below: bool,
) -> bool {
    let before: Vec<ItemId> = board
        .visible_items(container_id)
        .iter()
        .map(|item| item.id)
        .collect();
    let mut after = before.clone();
    if !place_relative(&mut after, active, target, below) || after == before {
        return false;
    }
    for (index, id) in after.iter().enumerate() {
        if let Some(item) = board.get_mut(*id) {
            item.order = index as i64;
        }
    }
    true
}
