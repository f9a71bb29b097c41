use ordo_core::{Item, ItemType};
use uuid::Uuid;

#[test]
fn item_serialization_uses_expected_wire_fields() {
    let id = Uuid::parse_str("11111111-2222-4333-8444-555555555555").unwrap();
    let container = Uuid::parse_str("66666666-7777-4888-9999-000000000000").unwrap();
    let group = Uuid::parse_str("aaaaaaaa-bbbb-4ccc-8ddd-eeeeeeeeeeee").unwrap();
    let item = Item::with_id(id, container, ItemType::Note, 3)
        .with_content("pack charger")
        .in_group(Some(group))
        .created_at(1_700_000_000_000);

    let json = serde_json::to_value(&item).unwrap();
    assert_eq!(json["id"], id.to_string());
    assert_eq!(json["containerId"], container.to_string());
    assert_eq!(json["itemType"], "note");
    assert_eq!(json["order"], 3);
    assert_eq!(json["groupId"], group.to_string());
    assert_eq!(json["isCollapsed"], false);
    assert_eq!(json["content"], "pack charger");
    assert_eq!(json["createdAt"], 1_700_000_000_000_i64);

    let decoded: Item = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, item);
}

#[test]
fn loose_rows_serialize_null_group() {
    let item = Item::new(Uuid::new_v4(), ItemType::Gap, 0);

    let json = serde_json::to_value(&item).unwrap();
    assert!(json["groupId"].is_null());
    assert_eq!(json["itemType"], "gap");
}

#[test]
fn item_type_wire_names_match_storage_names() {
    for item_type in [ItemType::Task, ItemType::Note, ItemType::Group, ItemType::Gap] {
        let json = serde_json::to_value(item_type).unwrap();
        assert_eq!(json, item_type.as_str());
        assert_eq!(ItemType::parse(item_type.as_str()), Some(item_type));
    }
    assert!(serde_json::from_str::<ItemType>("\"folder\"").is_err());
}

#[test]
fn collapsed_flag_only_sticks_to_groups() {
    let container = Uuid::new_v4();
    let group = Item::new(container, ItemType::Group, 0).collapsed(true);
    let task = Item::new(container, ItemType::Task, 1).collapsed(true);

    assert!(group.is_collapsed_group());
    assert!(!task.is_collapsed);
}

#[test]
fn restore_undoes_placement_changes() {
    let mut item = Item::new(Uuid::new_v4(), ItemType::Task, 4).in_group(Some(Uuid::new_v4()));
    let snapshot = item.snapshot();

    item.container_id = Uuid::new_v4();
    item.order = -1000;
    item.group_id = None;
    item.restore(snapshot);

    assert_eq!(item.snapshot(), snapshot);
}
