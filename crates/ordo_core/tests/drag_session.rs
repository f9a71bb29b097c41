use futures::executor::block_on;
use ordo_core::{
    DragError, DragPhase, DragPointer, DragUpdate, DropResult, EngineConfig, InMemoryTaskStore,
    Item, ItemId, ItemType, ManualClock, Point, Rect, ReorderService, SaveOutcome, StoreCall,
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const SWITCH_DELAY: Duration = Duration::from_millis(300);

struct Fixture {
    service: ReorderService,
    store: Arc<InMemoryTaskStore>,
    clock: Arc<ManualClock>,
}

fn fixture(items: Vec<Item>) -> Fixture {
    let store = Arc::new(InMemoryTaskStore::with_items(items.clone()));
    let clock = Arc::new(ManualClock::new());
    let mut service = ReorderService::new(store.clone(), clock.clone(), EngineConfig::default());
    service.insert_items(items);
    Fixture {
        service,
        store,
        clock,
    }
}

fn row(index: f64) -> Rect {
    Rect::new(0.0, index * 10.0, 100.0, 10.0)
}

/// Visible rows of `container` laid out top to bottom, with the dragged
/// overlay placed just above (`below = false`) or below the row at `index`.
fn over_row(service: &ReorderService, container: Uuid, index: usize, below: bool) -> DragPointer {
    let offset = if below { 0.2 } else { -0.2 };
    let mut pointer = DragPointer::new(None, Some(row(index as f64 + offset)));
    for (slot, item) in service.visible_items(container).iter().enumerate() {
        pointer = pointer.with_item(item.id, Some(row(slot as f64)));
    }
    pointer
}

fn over_selector(container: Uuid) -> DragPointer {
    DragPointer::new(Some(Point::new(210.0, 5.0)), None)
        .with_container(container, Some(Rect::new(200.0, 0.0, 80.0, 20.0)))
}

fn ids(items: &[Item]) -> Vec<ItemId> {
    items.iter().map(|item| item.id).collect()
}

fn orders(items: &[Item]) -> Vec<i64> {
    items.iter().map(|item| item.order).collect()
}

fn tasks(container: Uuid, count: usize) -> Vec<Item> {
    (0..count)
        .map(|order| Item::new(container, ItemType::Task, order as i64))
        .collect()
}

fn settle(fixture: &mut Fixture, result: DropResult) -> SaveOutcome {
    match result {
        DropResult::Saving(save) => block_on(fixture.service.settle(save)),
        other => panic!("expected a save, got {other:?}"),
    }
}

#[test]
fn dropping_at_original_position_issues_no_store_calls() {
    let container = Uuid::new_v4();
    let items = tasks(container, 3);
    let mut fx = fixture(items.clone());

    fx.service.on_drag_start(items[1].id).unwrap();
    let moved = fx
        .service
        .on_drag_over(&over_row(&fx.service, container, 0, false));
    assert_eq!(
        moved,
        DragUpdate::Reordered {
            over: items[0].id,
            below: false
        }
    );
    let back = fx
        .service
        .on_drag_over(&over_row(&fx.service, container, 1, true));
    assert!(matches!(back, DragUpdate::Reordered { .. }));

    let result = fx.service.on_drag_end();
    assert!(matches!(result, DropResult::NoOp { item_id } if item_id == items[1].id));
    assert!(fx.store.calls().is_empty());
    assert_eq!(ids(&fx.service.items(container)), ids(&items));
    assert_eq!(orders(&fx.service.items(container)), vec![0, 1, 2]);
}

#[test]
fn hovering_without_movement_reports_hover() {
    let container = Uuid::new_v4();
    let items = tasks(container, 3);
    let mut fx = fixture(items.clone());

    fx.service.on_drag_start(items[1].id).unwrap();
    let update = fx
        .service
        .on_drag_over(&over_row(&fx.service, container, 0, true));
    assert_eq!(
        update,
        DragUpdate::Hovering {
            over: items[0].id,
            below: true
        }
    );
    assert!(matches!(fx.service.on_drag_end(), DropResult::NoOp { .. }));
}

#[test]
fn reorder_within_container_persists_dense_ranks() {
    let container = Uuid::new_v4();
    let items = tasks(container, 4);
    let mut fx = fixture(items.clone());

    fx.service.on_drag_start(items[0].id).unwrap();
    fx.service
        .on_drag_over(&over_row(&fx.service, container, 2, true));
    let result = fx.service.on_drag_end();
    assert_eq!(fx.service.phase(), DragPhase::Idle);

    let outcome = settle(&mut fx, result);
    assert!(matches!(outcome, SaveOutcome::Saved(_)));

    let expected = vec![items[1].id, items[2].id, items[0].id, items[3].id];
    assert_eq!(ids(&fx.service.items(container)), expected);
    assert_eq!(ids(&fx.store.container(container)), expected);
    assert_eq!(orders(&fx.store.container(container)), vec![0, 1, 2, 3]);

    // items[3] kept rank 3 and is not rewritten.
    let writes = fx.store.write_calls();
    assert_eq!(writes.len(), 1);
    let StoreCall::UpdateItemOrder(updates) = &writes[0] else {
        panic!("expected bulk order write, got {writes:?}");
    };
    assert_eq!(updates.len(), 3);
    assert!(updates.iter().all(|update| update.id != items[3].id));
}

#[test]
fn collapsed_group_carries_its_trailing_gap() {
    let container = Uuid::new_v4();
    let group = Item::new(container, ItemType::Group, 0).collapsed(true);
    let x = Item::new(container, ItemType::Task, 1).in_group(Some(group.id));
    let y = Item::new(container, ItemType::Note, 2).in_group(Some(group.id));
    let gap = Item::new(container, ItemType::Gap, 3).in_group(Some(group.id));
    let t = Item::new(container, ItemType::Task, 4);
    let mut fx = fixture(vec![
        group.clone(),
        x.clone(),
        y.clone(),
        gap.clone(),
        t.clone(),
    ]);
    assert_eq!(
        ids(&fx.service.visible_items(container)),
        vec![group.id, gap.id, t.id]
    );

    fx.service.on_drag_start(group.id).unwrap();
    fx.service
        .on_drag_over(&over_row(&fx.service, container, 2, true));
    let result = fx.service.on_drag_end();
    assert!(matches!(settle(&mut fx, result), SaveOutcome::Saved(_)));

    let expected = vec![t.id, group.id, x.id, y.id, gap.id];
    let local = fx.service.items(container);
    assert_eq!(ids(&local), expected);
    assert_eq!(orders(&local), vec![0, 1, 2, 3, 4]);
    assert_eq!(local[2].group_id, Some(group.id));
    assert_eq!(local[3].group_id, Some(group.id));
    assert_eq!(local[0].group_id, None);
    assert_eq!(
        ids(&fx.service.visible_items(container)),
        vec![t.id, group.id, gap.id]
    );

    let stored = fx.store.container(container);
    assert_eq!(ids(&stored), expected);
    assert!(fx
        .store
        .write_calls()
        .iter()
        .all(|call| !matches!(call, StoreCall::CreateItem(_))));
}

#[test]
fn collapsed_group_synthesizes_gap_before_loose_task() {
    let container = Uuid::new_v4();
    let group = Item::new(container, ItemType::Group, 0).collapsed(true);
    let x = Item::new(container, ItemType::Task, 1).in_group(Some(group.id));
    let t1 = Item::new(container, ItemType::Task, 2);
    let t2 = Item::new(container, ItemType::Task, 3);
    let mut fx = fixture(vec![group.clone(), x.clone(), t1.clone(), t2.clone()]);

    fx.service.on_drag_start(group.id).unwrap();
    let update = fx
        .service
        .on_drag_over(&over_row(&fx.service, container, 2, false));
    assert_eq!(
        update,
        DragUpdate::Reordered {
            over: t2.id,
            below: false
        }
    );
    let result = fx.service.on_drag_end();
    let temp_gap = match &result {
        DropResult::Saving(save) => save.temp_gap,
        other => panic!("expected a save, got {other:?}"),
    };
    let temp_gap = temp_gap.unwrap();

    let SaveOutcome::Saved(receipt) = settle(&mut fx, result) else {
        panic!("save should succeed");
    };
    assert_eq!(receipt.created_gap.map(|gap| gap.id), Some(temp_gap));

    let local = fx.service.items(container);
    assert_eq!(ids(&local), vec![t1.id, group.id, x.id, temp_gap, t2.id]);
    assert_eq!(local[3].item_type, ItemType::Gap);
    assert_eq!(local[3].group_id, Some(group.id));
    assert_eq!(local[4].group_id, None);

    let stored = fx.store.container(container);
    assert_eq!(ids(&stored), ids(&local));
    assert_eq!(stored[4].group_id, None);
}

#[test]
fn task_switches_container_after_dwell_and_lands_above_target() {
    let source = Uuid::new_v4();
    let target = Uuid::new_v4();
    let left = tasks(source, 3);
    let right = tasks(target, 2);
    let mut fx = fixture(left.iter().chain(right.iter()).cloned().collect());
    let dragged = left[1].id;

    fx.service.on_drag_start(dragged).unwrap();
    let pending = fx.service.on_drag_over(&over_selector(target));
    assert!(matches!(pending, DragUpdate::SwitchPending(p) if p.container_id == target));
    assert!(fx.service.is_over_container());
    assert_eq!(fx.service.hovered_container_id(), Some(target));

    fx.clock.advance(SWITCH_DELAY - Duration::from_millis(1));
    assert!(matches!(fx.service.on_timer_tick(), DragUpdate::SwitchPending(_)));
    fx.clock.advance(Duration::from_millis(1));
    assert_eq!(
        fx.service.on_timer_tick(),
        DragUpdate::Switched { container_id: target }
    );
    // The selector now belongs to the row's own container.
    assert!(!fx.service.is_over_container());
    assert_eq!(fx.service.hovered_container_id(), None);
    let first = &fx.service.visible_items(target)[0];
    assert_eq!(first.id, dragged);
    assert_eq!(first.order, -1000);

    // Insert above right[1]: visible is [dragged, right0, right1].
    fx.service
        .on_drag_over(&over_row(&fx.service, target, 2, false));
    let result = fx.service.on_drag_end();
    assert!(matches!(settle(&mut fx, result), SaveOutcome::Saved(_)));

    let stored_target = fx.store.container(target);
    assert_eq!(ids(&stored_target), vec![right[0].id, dragged, right[1].id]);
    assert_eq!(orders(&stored_target), vec![0, 1, 2]);
    let stored_source = fx.store.container(source);
    assert_eq!(ids(&stored_source), vec![left[0].id, left[2].id]);
    assert_eq!(orders(&stored_source), vec![0, 1]);
    assert_eq!(fx.store.item(dragged).unwrap().container_id, target);
}

#[test]
fn leaving_selector_before_deadline_cancels_switch() {
    let source = Uuid::new_v4();
    let target = Uuid::new_v4();
    let items = tasks(source, 2);
    let mut fx = fixture(items.clone());

    fx.service.on_drag_start(items[0].id).unwrap();
    fx.service.on_drag_over(&over_selector(target));
    fx.clock.advance(Duration::from_millis(100));
    assert_eq!(
        fx.service.on_drag_over(&DragPointer::default()),
        DragUpdate::NoTarget
    );
    assert!(!fx.service.is_over_container());

    fx.clock.advance(SWITCH_DELAY);
    assert_eq!(fx.service.on_timer_tick(), DragUpdate::NoTarget);
    assert_eq!(fx.service.board().get(items[0].id).unwrap().container_id, source);
}

#[test]
fn dwell_completes_on_pointer_move_past_deadline() {
    let source = Uuid::new_v4();
    let target = Uuid::new_v4();
    let items = tasks(source, 1);
    let mut fx = fixture(items.clone());

    fx.service.on_drag_start(items[0].id).unwrap();
    fx.service.on_drag_over(&over_selector(target));
    fx.clock.advance(SWITCH_DELAY);
    assert_eq!(
        fx.service.on_drag_over(&over_selector(target)),
        DragUpdate::Switched { container_id: target }
    );
    assert_eq!(fx.service.hovered_container_id(), None);
    // Empty destination: the sentinel rank sits below zero.
    assert_eq!(fx.service.board().get(items[0].id).unwrap().order, -1000);
}

#[test]
fn group_never_changes_container() {
    let source = Uuid::new_v4();
    let target = Uuid::new_v4();
    let group = Item::new(source, ItemType::Group, 0);
    let child = Item::new(source, ItemType::Task, 1).in_group(Some(group.id));
    let mut fx = fixture(vec![group.clone(), child]);

    fx.service.on_drag_start(group.id).unwrap();
    assert_eq!(
        fx.service.on_drag_over(&over_selector(target)),
        DragUpdate::NoTarget
    );
    assert!(!fx.service.is_over_container());
    fx.clock.advance(SWITCH_DELAY * 2);
    assert_eq!(fx.service.on_timer_tick(), DragUpdate::NoTarget);

    assert!(matches!(fx.service.on_drag_end(), DropResult::Cancelled { .. }));
    assert_eq!(fx.service.board().get(group.id).unwrap().container_id, source);
    assert!(fx.store.write_calls().is_empty());
}

#[test]
fn drop_without_target_is_cancelled_without_writes() {
    let container = Uuid::new_v4();
    let items = tasks(container, 2);
    let mut fx = fixture(items.clone());

    fx.service.on_drag_start(items[0].id).unwrap();
    fx.service.on_drag_over(&DragPointer::default());
    assert!(matches!(
        fx.service.on_drag_end(),
        DropResult::Cancelled { item_id } if item_id == items[0].id
    ));
    assert!(fx.store.calls().is_empty());
}

#[test]
fn missing_geometry_only_skips_one_tick() {
    let container = Uuid::new_v4();
    let items = tasks(container, 3);
    let mut fx = fixture(items.clone());

    fx.service.on_drag_start(items[0].id).unwrap();
    let blind = over_row(&fx.service, container, 2, true);
    let blind = DragPointer {
        active_rect: None,
        ..blind
    };
    assert_eq!(fx.service.on_drag_over(&blind), DragUpdate::NoTarget);

    let update = fx
        .service
        .on_drag_over(&over_row(&fx.service, container, 2, true));
    assert!(matches!(update, DragUpdate::Reordered { .. }));
}

#[test]
fn blind_frame_before_release_still_commits_the_move() {
    let container = Uuid::new_v4();
    let items = tasks(container, 3);
    let mut fx = fixture(items.clone());

    fx.service.on_drag_start(items[0].id).unwrap();
    let update = fx
        .service
        .on_drag_over(&over_row(&fx.service, container, 2, true));
    assert!(matches!(update, DragUpdate::Reordered { .. }));

    let blind = DragPointer {
        active_rect: None,
        ..over_row(&fx.service, container, 2, true)
    };
    assert_eq!(fx.service.on_drag_over(&blind), DragUpdate::NoTarget);

    let result = fx.service.on_drag_end();
    assert!(matches!(settle(&mut fx, result), SaveOutcome::Saved(_)));
    let stored = fx.store.container(container);
    assert_eq!(ids(&stored), vec![items[1].id, items[2].id, items[0].id]);
    assert_eq!(orders(&stored), vec![0, 1, 2]);
}

#[test]
fn leave_forgets_the_last_target() {
    let container = Uuid::new_v4();
    let target = Uuid::new_v4();
    let items = tasks(container, 3);
    let mut fx = fixture(items.clone());

    fx.service.on_drag_start(items[0].id).unwrap();
    fx.service
        .on_drag_over(&over_row(&fx.service, container, 1, true));
    fx.service.on_drag_over(&over_selector(target));
    assert_eq!(fx.service.on_drag_leave(), DragUpdate::NoTarget);
    assert!(!fx.service.is_over_container());

    fx.clock.advance(SWITCH_DELAY);
    assert_eq!(fx.service.on_timer_tick(), DragUpdate::NoTarget);
    assert!(matches!(
        fx.service.on_drag_end(),
        DropResult::Cancelled { item_id } if item_id == items[0].id
    ));
    assert!(fx.store.calls().is_empty());
}

#[test]
fn start_rejects_second_session_and_unreachable_rows() {
    let container = Uuid::new_v4();
    let group = Item::new(container, ItemType::Group, 0).collapsed(true);
    let hidden = Item::new(container, ItemType::Task, 1).in_group(Some(group.id));
    let loose = Item::new(container, ItemType::Task, 2);
    let mut fx = fixture(vec![group.clone(), hidden.clone(), loose.clone()]);

    let unknown = Uuid::new_v4();
    assert_eq!(
        fx.service.on_drag_start(unknown),
        Err(DragError::ItemNotFound(unknown))
    );
    assert_eq!(
        fx.service.on_drag_start(hidden.id),
        Err(DragError::ItemHidden(hidden.id))
    );

    fx.service.on_drag_start(loose.id).unwrap();
    assert_eq!(fx.service.active_id(), Some(loose.id));
    assert_eq!(
        fx.service.on_drag_start(group.id),
        Err(DragError::AlreadyDragging(loose.id))
    );
}

#[test]
fn cancel_clears_session_and_keeps_optimistic_moves() {
    let container = Uuid::new_v4();
    let items = tasks(container, 3);
    let mut fx = fixture(items.clone());

    fx.service.on_drag_start(items[0].id).unwrap();
    fx.service
        .on_drag_over(&over_row(&fx.service, container, 1, true));
    assert_eq!(fx.service.on_drag_cancel(), Some(items[0].id));

    assert_eq!(fx.service.phase(), DragPhase::Idle);
    assert_eq!(fx.service.active_id(), None);
    assert_eq!(fx.service.on_drag_cancel(), None);
    assert!(matches!(fx.service.on_drag_end(), DropResult::NotDragging));
    assert_eq!(
        ids(&fx.service.visible_items(container))[..2],
        [items[1].id, items[0].id]
    );
    assert!(fx.store.calls().is_empty());
}

#[test]
fn moves_without_session_are_ignored() {
    let container = Uuid::new_v4();
    let mut fx = fixture(tasks(container, 2));

    assert_eq!(
        fx.service.on_drag_over(&DragPointer::default()),
        DragUpdate::NotDragging
    );
    assert_eq!(fx.service.on_timer_tick(), DragUpdate::NotDragging);
}
