//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `ordo_core` linkage end to end: SQLite store, drag machine,
//!   batcher and service.
//! - Keep output deterministic apart from generated ids.

use futures::executor::block_on;
use ordo_core::{
    DragPointer, DropResult, EngineConfig, Item, ItemPatch, ItemType, ManualClock, NewItem,
    Rect, ReorderService, SaveOutcome, SqliteTaskStore, TaskStore,
};
use std::error::Error;
use std::sync::Arc;
use uuid::Uuid;

const ROW_HEIGHT: f64 = 10.0;

fn main() -> Result<(), Box<dyn Error>> {
    println!("ordo_core ping={}", ordo_core::ping());
    println!("ordo_core version={}", ordo_core::core_version());
    if let Ok(log_dir) = std::env::var("ORDO_LOG_DIR") {
        ordo_core::init_default_logging(&log_dir)?;
    }

    let store = Arc::new(SqliteTaskStore::open_in_memory()?);
    let container = Uuid::new_v4();
    let rows = [
        (ItemType::Group, "Errands"),
        (ItemType::Task, "post office"),
        (ItemType::Task, "pharmacy"),
        (ItemType::Gap, ""),
        (ItemType::Task, "call plumber"),
    ];

    block_on(async {
        let mut group_id = None;
        for (order, (item_type, content)) in rows.into_iter().enumerate() {
            let created = store
                .create_item(NewItem {
                    id: Uuid::new_v4(),
                    container_id: container,
                    item_type,
                    content: content.to_string(),
                    order: order as i64,
                    group_id: if item_type == ItemType::Group { None } else { group_id },
                })
                .await?;
            if item_type == ItemType::Group {
                group_id = Some(created.id);
            }
        }
        if let Some(group_id) = group_id {
            store.update_item(group_id, ItemPatch::collapse(true)).await?;
        }

        let clock = Arc::new(ManualClock::new());
        let mut service = ReorderService::new(store.clone(), clock, EngineConfig::default());
        service.load_container(container).await?;
        print_rows("before", &service.items(container));

        // Drag the collapsed group below the last visible row.
        let visible = service.visible_items(container);
        let (Some(first), Some(last)) = (visible.first(), visible.last()) else {
            return Ok(());
        };
        service.on_drag_start(first.id)?;
        let mut pointer = DragPointer::new(None, Some(row_rect(visible.len() as f64 - 0.6)));
        for (index, item) in visible.iter().enumerate() {
            pointer = pointer.with_item(item.id, Some(row_rect(index as f64)));
        }
        let update = service.on_drag_over(&pointer);
        println!("drag_over={update:?} over_last={}", last.id);

        match service.on_drag_end() {
            DropResult::Saving(save) => match service.settle(save).await {
                SaveOutcome::Saved(receipt) => println!("saved writes={}", receipt.writes),
                SaveOutcome::Failed { error, resynced } => {
                    println!("save failed: {error} resynced={}", resynced.len())
                }
            },
            other => println!("drop={other:?}"),
        }

        print_rows("persisted", &store.list_container(container).await?);
        Ok::<(), Box<dyn Error>>(())
    })
}

fn row_rect(index: f64) -> Rect {
    Rect::new(0.0, index * ROW_HEIGHT, 100.0, ROW_HEIGHT)
}

fn print_rows(label: &str, items: &[Item]) {
    println!("{label}:");
    for item in items {
        println!(
            "  order={} type={} grouped={} collapsed={} content={}",
            item.order,
            item.item_type,
            item.group_id.is_some(),
            item.is_collapsed,
            item.content
        );
    }
}
