use ordo_core::model::item::{Item, ItemType};
use ordo_core::ordering::normalize::{array_move, normalize_orders, normalized, sort_visual};
use proptest::prelude::*;
use uuid::Uuid;

fn items_with_orders(orders: &[i64]) -> Vec<Item> {
    let container = Uuid::new_v4();
    orders
        .iter()
        .enumerate()
        .map(|(index, order)| {
            Item::new(container, ItemType::Task, *order).created_at(index as i64)
        })
        .collect()
}

#[test]
fn normalize_reports_only_changed_ranks() {
    let mut items = items_with_orders(&[0, 5, 2, -4]);
    let changed = normalize_orders(&mut items);

    let orders: Vec<i64> = items.iter().map(|item| item.order).collect();
    assert_eq!(orders, vec![0, 1, 2, 3]);
    assert_eq!(changed, vec![items[1].id, items[3].id]);
}

#[test]
fn normalize_empty_sequence_is_noop() {
    let mut items: Vec<Item> = Vec::new();
    assert!(normalize_orders(&mut items).is_empty());
}

#[test]
fn duplicate_orders_break_ties_by_creation_time() {
    let container = Uuid::new_v4();
    let late = Item::new(container, ItemType::Note, 3).created_at(20);
    let early = Item::new(container, ItemType::Note, 3).created_at(10);
    let mut items = vec![late.clone(), early.clone()];

    sort_visual(&mut items);
    let items = normalized(items);

    assert_eq!(items[0].id, early.id);
    assert_eq!(items[1].id, late.id);
    assert_eq!(items[1].order, 1);
}

#[test]
fn array_move_then_normalize_reflects_new_position() {
    let mut items = items_with_orders(&[0, 1, 2, 3]);
    let moved = items[3].id;

    array_move(&mut items, 3, 1);
    normalize_orders(&mut items);

    assert_eq!(items[1].id, moved);
    assert_eq!(items[1].order, 1);
}

proptest! {
    #[test]
    fn sorted_then_normalized_ranks_are_dense(orders in prop::collection::vec(-50i64..50, 0..40)) {
        let mut items = items_with_orders(&orders);
        sort_visual(&mut items);
        let before: Vec<_> = items.iter().map(|item| item.id).collect();

        normalize_orders(&mut items);

        let ranks: Vec<i64> = items.iter().map(|item| item.order).collect();
        let expected: Vec<i64> = (0..items.len() as i64).collect();
        prop_assert_eq!(ranks, expected);
        let after: Vec<_> = items.iter().map(|item| item.id).collect();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn normalizing_twice_changes_nothing(orders in prop::collection::vec(any::<i64>(), 0..40)) {
        let mut items = items_with_orders(&orders);
        normalize_orders(&mut items);
        prop_assert!(normalize_orders(&mut items).is_empty());
    }
}
